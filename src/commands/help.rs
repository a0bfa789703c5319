//! Help text rendering.

use super::Command;

/// The usage line shown for `command`.
///
/// Top-level commands with a usage template render as
/// `{prefix}{name} {usage}`. Everything else is synthesized from the
/// command path, its sub-command names, and its parameter table.
pub fn usage_line(command: &Command, prefix: &str) -> String {
    if command.parent().is_none()
        && let Some(usage) = command.usage_template()
    {
        return format!("{prefix}{} {usage}", command.name()).trim_end().to_string();
    }

    let mut parts = vec![format!("{prefix}{}", command.path())];
    if !command.children().is_empty() {
        let names: Vec<&str> = command.children().iter().map(Command::name).collect();
        parts.push(format!("[{}]", names.join(" | ")));
    }
    parts.extend(command.params().iter().map(|p| p.usage()));
    parts.join(" ")
}

/// Usage and description block for one command.
pub fn describe(command: &Command, prefix: &str) -> String {
    let mut description = command.description_text().to_string();
    if command.is_owner_only() {
        description.push_str("\n*Only the bot owner can execute this command.*");
    }
    format!(
        "**Usage**: ```{}```**Description**: {}",
        usage_line(command, prefix),
        description
    )
}

/// The command listing sent for a bare `help`.
pub fn listing<S: AsRef<str>>(names: &[S], prefix: &str) -> String {
    let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    format!(
        "**Commands:**```{}```Use `{prefix}help <command>` for command specific help.",
        names.join(", ")
    )
}
