//! Slash-command routing for chat input. The dispatcher decides whether a
//! line of input is a command or normal chat text; it does not implement
//! any command's behavior itself (dice rollers, frequency commands, etc.
//! are out of scope here).

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CommandResult {
    pub command: String,
    pub summary: String,
    pub details: HashMap<String, String>,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(command: impl Into<String>, summary: impl Into<String>) -> Self {
        Self { command: command.into(), summary: summary.into(), details: HashMap::new(), error: None }
    }

    pub fn err(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self { command: command.into(), summary: String::new(), details: HashMap::new(), error: Some(error.into()) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A registered slash-command handler.
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[&str] {
        &[]
    }
    fn help_text(&self) -> &str;
    fn execute(&self, args: &str) -> CommandResult;
}

#[derive(Debug)]
pub struct DispatcherError {
    pub message: String,
}

impl std::fmt::Display for DispatcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DispatcherError {}

#[derive(Default)]
pub struct CommandDispatcher {
    commands: HashMap<String, std::sync::Arc<dyn Command>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: std::sync::Arc<dyn Command>) -> Result<(), DispatcherError> {
        let mut keys: Vec<String> = vec![command.name().to_ascii_lowercase()];
        keys.extend(command.aliases().iter().map(|a| a.to_ascii_lowercase()));
        for key in &keys {
            if let Some(existing) = self.commands.get(key) {
                return Err(DispatcherError {
                    message: format!(
                        "command name collision: '{key}' is already registered to '{}'",
                        existing.name()
                    ),
                });
            }
        }
        for key in keys {
            self.commands.insert(key, command.clone());
        }
        Ok(())
    }

    /// Returns `None` for normal chat text (no `/` prefix, or an
    /// unrecognized command name) so the caller passes it through to
    /// the chat path unmodified.
    pub fn dispatch(&self, line: &str) -> Option<CommandResult> {
        let stripped = line.trim();
        let without_slash = stripped.strip_prefix('/')?;
        let mut parts = without_slash.splitn(2, char::is_whitespace);
        let cmd_name = parts.next()?.to_ascii_lowercase();
        if cmd_name.is_empty() {
            return None;
        }
        let args = parts.next().unwrap_or("").trim_start();

        if cmd_name == "help" {
            return Some(self.help_result());
        }

        let command = self.commands.get(&cmd_name)?;
        Some(command.execute(args))
    }

    pub fn list_commands(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for cmd in self.commands.values() {
            if seen.insert(cmd.name().to_string()) {
                result.push((cmd.name().to_string(), cmd.help_text().to_string()));
            }
        }
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    fn help_result(&self) -> CommandResult {
        let listing = self
            .list_commands()
            .into_iter()
            .map(|(name, help)| format!("/{name} — {help}"))
            .collect::<Vec<_>>()
            .join("\n");
        CommandResult::ok("help", listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PingCommand;
    impl Command for PingCommand {
        fn name(&self) -> &str {
            "ping"
        }
        fn aliases(&self) -> &[&str] {
            &["p"]
        }
        fn help_text(&self) -> &str {
            "/ping — replies with pong"
        }
        fn execute(&self, _args: &str) -> CommandResult {
            CommandResult::ok("ping", "pong")
        }
    }

    #[test]
    fn non_slash_lines_pass_through() {
        let dispatcher = CommandDispatcher::new();
        assert_eq!(dispatcher.dispatch("hello everyone"), None);
    }

    #[test]
    fn slash_in_the_middle_of_a_word_is_not_a_command() {
        let dispatcher = CommandDispatcher::new();
        assert_eq!(dispatcher.dispatch("signal/noise"), None);
    }

    #[test]
    fn unrecognized_command_passes_through_as_none() {
        let dispatcher = CommandDispatcher::new();
        assert_eq!(dispatcher.dispatch("/frequency 446"), None);
    }

    #[test]
    fn registered_command_and_alias_both_dispatch() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(std::sync::Arc::new(PingCommand)).unwrap();
        assert_eq!(dispatcher.dispatch("/ping").unwrap().summary, "pong");
        assert_eq!(dispatcher.dispatch("/P").unwrap().summary, "pong");
    }

    #[test]
    fn registration_is_case_insensitive_and_detects_collisions() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(std::sync::Arc::new(PingCommand)).unwrap();
        let err = dispatcher.register(std::sync::Arc::new(PingCommand)).unwrap_err();
        assert!(err.message.contains("collision"));
    }

    #[test]
    fn help_lists_registered_commands() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(std::sync::Arc::new(PingCommand)).unwrap();
        let result = dispatcher.dispatch("/help").unwrap();
        assert!(result.summary.contains("/ping"));
    }
}
