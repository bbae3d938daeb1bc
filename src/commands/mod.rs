//! Command registry for REPL commands
//!
//! Commands are matched by prefix, longest first, so `bindings` never
//! swallows a more specific command registered later.

pub mod binding;
pub mod general;

use crate::engine::{MasterClock, SequencerHandle};
use crate::session::LiveSession;
use std::sync::Arc;

/// Result of executing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Command executed successfully, nothing to print
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Not a command
    NotACommand,
    Error(String),
    /// Load a script file and watch it for changes
    Watch(String),
}

/// Context passed to command handlers
pub struct CommandContext {
    pub session: LiveSession,
    pub clock: Option<Arc<MasterClock>>,
    pub sequencer: Option<SequencerHandle>,
}

impl CommandContext {
    pub fn new(session: LiveSession) -> Self {
        Self {
            session,
            clock: None,
            sequencer: None,
        }
    }

    /// Context with a running playback engine
    pub fn with_playback(
        session: LiveSession,
        clock: Arc<MasterClock>,
        sequencer: SequencerHandle,
    ) -> Self {
        Self {
            session,
            clock: Some(clock),
            sequencer: Some(sequencer),
        }
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Sorted by prefix length, longest first
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning `NotACommand` if no prefix matches
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        for (prefix, handler) in &self.commands {
            if input == prefix || input.starts_with(&format!("{} ", prefix)) {
                let args = input[prefix.len()..].trim();
                return handler(args, ctx);
            }
        }
        CommandResult::NotACommand
    }

    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every built-in command
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register("bindings", binding::cmd_bindings);
    registry.register("set", binding::cmd_set);
    registry.register("nudge", binding::cmd_nudge);
    registry.register("literals", binding::cmd_literals);
    registry.register("structure", binding::cmd_structure);
    registry.register("regions", binding::cmd_regions);
    registry.register("edit", binding::cmd_edit);

    registry.register("tempo", general::cmd_tempo);
    registry.register("start", general::cmd_start);
    registry.register("stop", general::cmd_stop);
    registry.register("watch", general::cmd_watch);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    fn context() -> CommandContext {
        CommandContext::new(LiveSession::new(SessionConfig::default(), None))
    }

    #[test]
    fn test_prefix_matching() {
        let registry = create_registry();
        let mut ctx = context();

        assert_eq!(registry.execute("quit", &mut ctx), CommandResult::Exit);
        assert_eq!(registry.execute("quitter", &mut ctx), CommandResult::NotACommand);
        assert_eq!(
            registry.execute("watch  live.cs", &mut ctx),
            CommandResult::Watch("live.cs".to_string())
        );
    }

    #[test]
    fn test_longest_prefix_first() {
        fn short(_: &str, _: &mut CommandContext) -> CommandResult {
            CommandResult::Message("short".to_string())
        }
        fn long(args: &str, _: &mut CommandContext) -> CommandResult {
            CommandResult::Message(format!("long {}", args))
        }

        let mut registry = CommandRegistry::new();
        registry.register("set", short);
        registry.register("set all", long);
        let mut ctx = context();

        assert_eq!(
            registry.execute("set all 5", &mut ctx),
            CommandResult::Message("long 5".to_string())
        );
        assert_eq!(
            registry.execute("set 1 5", &mut ctx),
            CommandResult::Message("short".to_string())
        );
        assert_eq!(registry.list_commands(), vec!["set all", "set"]);
    }
}
