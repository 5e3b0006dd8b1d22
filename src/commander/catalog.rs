/*!
Catalog data model and JSON loading.

A command is either a leaf carrying an argument list or a group of
subcommands; the two shapes are mutually exclusive, so `CommandBody` makes
the choice explicit. Groups are exactly one level deep.

The raw document shapes (`CommandSpec`, `ExtModuleSpec`, ...) mirror the
loose on-disk schema: every field but the name is optional. Argument DSL
lines that fail to parse are dropped and the error string is retained on
the owning `Commander`.
*/

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::commander::grammar::{self, Argument};

/// One node in the command catalog.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub message: String,
    pub description: String,
    pub example: String,
    pub exec: String,
    pub body: CommandBody,
}

/// Leaf-with-args or group-of-subcommands.
#[derive(Debug, Clone)]
pub enum CommandBody {
    Args(Vec<Argument>),
    Group(Vec<Subcommand>),
}

impl Command {
    pub fn subcommands(&self) -> &[Subcommand] {
        match &self.body {
            CommandBody::Group(subs) => subs,
            CommandBody::Args(_) => &[],
        }
    }

    pub fn args(&self) -> &[Argument] {
        match &self.body {
            CommandBody::Args(args) => args,
            CommandBody::Group(_) => &[],
        }
    }
}

/// Second-level node; carries no further nesting.
#[derive(Debug, Clone)]
pub struct Subcommand {
    pub name: String,
    pub message: String,
    pub description: String,
    pub example: String,
    pub exec: String,
    pub args: Vec<Argument>,
}

/// Named key -> value mapping consumed by `$MAP(name, key)`.
#[derive(Debug, Clone, Default)]
pub struct Constant {
    pub name: String,
    pub map: HashMap<String, String>,
}

/// An operator-loaded extension package, keyed by its source file path.
#[derive(Debug, Clone)]
pub struct ExtModule {
    pub name: String,
    pub file_path: PathBuf,
    pub commands: Vec<Command>,
    pub constants: HashMap<String, Constant>,
}

/* ---- Raw document shapes ---- */

#[derive(Debug, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub exec: String,
    #[serde(default)]
    pub subcommands: Option<Vec<SubcommandSpec>>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubcommandSpec {
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub exec: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConstantSpec {
    pub name: String,
    #[serde(default)]
    pub map: HashMap<String, String>,
}

/// On-disk shape of an extension module file.
#[derive(Debug, Deserialize)]
pub struct ExtModuleSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    #[serde(default)]
    pub constants: Vec<ConstantSpec>,
}

/* ---- Builders ---- */

/// Parse one DSL line list, dropping invalid entries into `error`.
fn build_args(specs: &[String], error: &mut String) -> Vec<Argument> {
    let mut args = Vec::with_capacity(specs.len());
    for spec in specs {
        match grammar::parse_argument(spec) {
            Ok(arg) => args.push(arg),
            Err(e) => *error = e.to_string(),
        }
    }
    args
}

impl Command {
    /// Build a catalog node from its raw document shape. A `subcommands`
    /// array wins over a sibling `args` list.
    pub fn from_spec(spec: CommandSpec, error: &mut String) -> Self {
        let body = match spec.subcommands {
            Some(subs) => CommandBody::Group(
                subs.into_iter()
                    .map(|s| Subcommand {
                        args: build_args(&s.args, error),
                        name: s.name,
                        message: s.message,
                        description: s.description,
                        example: s.example,
                        exec: s.exec,
                    })
                    .collect(),
            ),
            None => CommandBody::Args(build_args(&spec.args, error)),
        };

        Command {
            name: spec.command,
            message: spec.message,
            description: spec.description,
            example: spec.example,
            exec: spec.exec,
            body,
        }
    }
}

impl ExtModule {
    pub fn from_spec(file_path: &Path, spec: ExtModuleSpec, error: &mut String) -> Self {
        let commands = spec
            .commands
            .into_iter()
            .map(|c| Command::from_spec(c, error))
            .collect();

        let mut constants = HashMap::new();
        for c in spec.constants {
            constants.insert(
                c.name.clone(),
                Constant {
                    name: c.name,
                    map: c.map,
                },
            );
        }

        // Absolutize so $EXT_DIR() resolves independently of the cwd later.
        let file_path = std::path::absolute(file_path).unwrap_or_else(|_| file_path.to_path_buf());

        ExtModule {
            name: spec.name,
            file_path,
            commands,
            constants,
        }
    }
}
