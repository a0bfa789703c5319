//! Per-plugin command tree.

use super::Command;
use crate::proto::Token;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a command named '{0}' is already registered here")]
    DuplicateName(String),
    #[error("no parent command '{0}'")]
    UnknownParent(String),
    #[error("invalid command name: {0:?}")]
    InvalidName(String),
}

/// The commands owned by one plugin.
#[derive(Debug, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `command` at top level, or under the command at `parent`
    /// (a space-separated path such as `"plugin"` or `"lambda add"`).
    ///
    /// Sibling names must be unique. A failed registration leaves the set
    /// unchanged.
    pub fn register(&mut self, mut command: Command, parent: Option<&str>) -> Result<(), RegistryError> {
        if command.name.is_empty() || command.name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(command.name));
        }

        let siblings = match parent {
            None => &mut self.commands,
            Some(path) => {
                let node = self
                    .node_mut(path)
                    .ok_or_else(|| RegistryError::UnknownParent(path.to_string()))?;
                command.parent = Some(node.path());
                // Sub-command usage is synthesized from the parameter table.
                command.usage = None;
                &mut node.children
            }
        };

        if siblings.iter().any(|c| c.name == command.name) {
            return Err(RegistryError::DuplicateName(command.name));
        }

        debug!(
            command = %command.path(),
            kind = if parent.is_some() { "subcommand" } else { "command" },
            "Registered"
        );
        siblings.push(command);
        Ok(())
    }

    /// Top-level command by name.
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Look up `name`, then descend through sub-commands named by the
    /// leading tokens of `rest`.
    ///
    /// Returns the deepest command reached and how many tokens of `rest`
    /// the walk consumed. The walk stops at the first token that does not
    /// name a child.
    pub fn resolve(&self, name: &str, rest: &[Token]) -> Option<(&Command, usize)> {
        let mut node = self.lookup(name)?;
        let mut consumed = 0;
        for token in rest {
            match node.child(&token.text) {
                Some(child) => {
                    node = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        Some((node, consumed))
    }

    /// Drop every command in the set.
    pub fn unregister_all(&mut self) {
        self.commands.clear();
    }

    /// Top-level commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every command path in the tree, depth first.
    pub fn paths(&self) -> Vec<String> {
        fn walk(command: &Command, out: &mut Vec<String>) {
            out.push(command.path());
            for child in &command.children {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        for command in &self.commands {
            walk(command, &mut out);
        }
        out
    }

    fn node_mut(&mut self, path: &str) -> Option<&mut Command> {
        let mut parts = path.split_whitespace();
        let first = parts.next()?;
        let mut node = self.commands.iter_mut().find(|c| c.name == first)?;
        for part in parts {
            node = node.children.iter_mut().find(|c| c.name == part)?;
        }
        Some(node)
    }
}
