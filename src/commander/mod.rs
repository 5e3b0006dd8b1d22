/*!
Command dispatch engine.

Owns the command catalog (core list plus extension modules) and turns
operator-typed lines into either terminal output or a JSON tasking payload:

  input line -> tokenize -> resolve command -> bind arguments -> payload
                                     |
                                     +-> non-empty exec template: expand it
                                         into a new line and re-dispatch,
                                         carrying the outer message inward

`CommanderResult.handled` distinguishes the two outcomes: `true` means the
message is operator-facing text, `false` means it is the payload string for
the agent.

The engine is synchronous and single-threaded; catalog mutation versus
dispatch coordination is the caller's concern.
*/

pub mod binder;
pub mod catalog;
pub mod expand;
pub mod grammar;
pub mod help;
pub mod packer;
pub mod tokenize;

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::commander::catalog::{Command, CommandSpec, ExtModule, ExtModuleSpec};
use crate::commander::tokenize::tokenize as tokenize_line;

/// Exec chains deeper than this abort the dispatch; the catalog format has
/// no cycle detection, so a runaway chain must be cut somewhere.
const MAX_EXEC_DEPTH: usize = 32;

/// Metadata of the agent a payload is built for. Only `arch` is consumed
/// by template expansion; the rest travels along for display layers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentData {
    pub id: String,
    pub name: String,
    pub os: String,
    pub arch: String,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommanderResult {
    /// True: `message` is terminal output. False: `message` is the JSON
    /// payload destined for the agent.
    pub handled: bool,
    pub message: String,
    pub error: bool,
}

/// The catalog owner and dispatcher.
#[derive(Debug, Default)]
pub struct Commander {
    pub(crate) commands: Vec<Command>,
    pub(crate) ext_modules: Vec<ExtModule>,
    last_error: String,
}

impl Commander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the core command list wholesale from a JSON array.
    pub fn add_reg_commands(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let specs: Vec<CommandSpec> = serde_json::from_str(json)?;
        let mut error = std::mem::take(&mut self.last_error);
        self.commands = specs
            .into_iter()
            .map(|s| Command::from_spec(s, &mut error))
            .collect();
        self.last_error = error;
        Ok(())
    }

    /// Register an extension module under its file path; a module already
    /// loaded from the same path is replaced in place.
    pub fn add_ext_module(&mut self, file_path: &Path, spec: ExtModuleSpec) {
        let mut error = std::mem::take(&mut self.last_error);
        let module = ExtModule::from_spec(file_path, spec, &mut error);
        self.last_error = error;

        match self
            .ext_modules
            .iter_mut()
            .find(|m| m.file_path == module.file_path)
        {
            Some(slot) => *slot = module,
            None => self.ext_modules.push(module),
        }
    }

    pub fn remove_ext_module(&mut self, file_path: &Path) {
        let file_path =
            std::path::absolute(file_path).unwrap_or_else(|_| file_path.to_path_buf());
        self.ext_modules.retain(|m| m.file_path != file_path);
    }

    /// Last catalog-load parse error ("arguments not parsed", ...).
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Dispatch one operator-typed line.
    pub fn process_input(&self, agent: &AgentData, input: &str) -> CommanderResult {
        self.process_input_depth(agent, input, 0)
    }

    fn process_input_depth(&self, agent: &AgentData, input: &str, depth: usize) -> CommanderResult {
        let mut parts = tokenize_line(input);
        if parts.is_empty() {
            return CommanderResult {
                handled: true,
                message: String::new(),
                error: false,
            };
        }

        let command_name = parts.remove(0);
        if command_name == "help" {
            return help::process_help(self, &parts);
        }

        // Core list wins over extensions on a name collision.
        for command in &self.commands {
            if command.name == command_name {
                return self.process_command(agent, command, &parts, None, depth);
            }
        }

        for module in &self.ext_modules {
            for command in &module.commands {
                if command.name == command_name {
                    return self.process_command(agent, command, &parts, Some(module), depth);
                }
            }
        }

        CommanderResult {
            handled: true,
            message: "Command not found".to_string(),
            error: true,
        }
    }

    fn process_command(
        &self,
        agent: &AgentData,
        command: &Command,
        argv: &[String],
        ext: Option<&ExtModule>,
        depth: usize,
    ) -> CommanderResult {
        let bound = match binder::bind(command, argv) {
            Ok(bound) => bound,
            Err(e) => {
                return CommanderResult {
                    handled: true,
                    message: e.to_string(),
                    error: true,
                };
            }
        };

        if !bound.exec.is_empty() {
            if depth >= MAX_EXEC_DEPTH {
                return CommanderResult {
                    handled: true,
                    message: "Exec chain too deep".to_string(),
                    error: true,
                };
            }

            let line = expand::expand_exec(&bound.exec, agent, ext, &bound.payload);
            let mut inner = self.process_input_depth(agent, &line, depth + 1);

            // The chained payload carries the outer command's message.
            if !inner.error
                && let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(&inner.message)
            {
                let outer_message = bound
                    .payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                obj.insert("message".to_string(), Value::String(outer_message));
                inner.message =
                    serde_json::to_string(&Value::Object(obj)).unwrap_or(inner.message);
            }
            return inner;
        }

        let message = serde_json::to_string(&Value::Object(bound.payload))
            .unwrap_or_else(|_| "{}".to_string());
        CommanderResult {
            handled: false,
            message,
            error: false,
        }
    }

    /// Every dispatchable command line, for console completion: leaf names
    /// and `cmd sub` pairs, followed by the matching `help ...` lines.
    pub fn commands_list(&self) -> Vec<String> {
        let mut commands = Vec::new();
        let mut help_commands = Vec::new();

        let mut collect = |list: &[Command]| {
            for cmd in list {
                help_commands.push(format!("help {}", cmd.name));
                if cmd.subcommands().is_empty() {
                    commands.push(cmd.name.clone());
                }
                for sub in cmd.subcommands() {
                    commands.push(format!("{} {}", cmd.name, sub.name));
                    help_commands.push(format!("help {} {}", cmd.name, sub.name));
                }
            }
        };

        collect(&self.commands);
        for module in &self.ext_modules {
            collect(&module.commands);
        }

        commands.extend(help_commands);
        commands
    }
}
