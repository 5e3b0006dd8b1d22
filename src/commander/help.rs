/*!
Help rendering.

Three forms, all returning terminal output for the operator:

  help                  catalog table (core commands, then one labeled
                        section per extension; `*` marks grouped commands)
  help <cmd>            description/example plus subcommand or argument table
  help <cmd> <sub>      the same for one subcommand

Column layout is fixed: 24 characters for the command column, 20 for the
subcommand column; argument columns size to the longest entry in the set.
*/

use crate::commander::catalog::{Command, Subcommand};
use crate::commander::grammar::Argument;
use crate::commander::{Commander, CommanderResult};

const COMMAND_WIDTH: usize = 24;
const SUBCOMMAND_WIDTH: usize = 20;

pub(crate) fn process_help(commander: &Commander, parts: &[String]) -> CommanderResult {
    if parts.is_empty() {
        return CommanderResult {
            handled: true,
            message: render_overview(commander),
            error: false,
        };
    }

    let command_name = &parts[0];
    let found = commander
        .commands
        .iter()
        .find(|c| &c.name == command_name)
        .or_else(|| {
            commander
                .ext_modules
                .iter()
                .flat_map(|m| m.commands.iter())
                .find(|c| &c.name == command_name)
        });

    let Some(command) = found else {
        return CommanderResult {
            handled: true,
            message: format!("Unknown command: {command_name}"),
            error: true,
        };
    };

    match parts.len() {
        1 => CommanderResult {
            handled: true,
            message: render_command(command),
            error: false,
        },
        2 => {
            let sub_name = &parts[1];
            match command.subcommands().iter().find(|s| &s.name == sub_name) {
                Some(sub) => CommanderResult {
                    handled: true,
                    message: render_subcommand(command, sub),
                    error: false,
                },
                None => CommanderResult {
                    handled: true,
                    message: format!("Unknown subcommand: {sub_name}"),
                    error: true,
                },
            }
        }
        _ => CommanderResult {
            handled: true,
            message: "Error Help format: 'help [command [subcommand]]'".to_string(),
            error: true,
        },
    }
}

fn pad(width: usize, used: usize) -> String {
    " ".repeat(width.saturating_sub(used))
}

fn render_overview(commander: &Commander) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("  Command                       Description\n");
    out.push_str("  -------                       -----------\n");

    for command in &commander.commands {
        let mut name = command.name.clone();
        if !command.subcommands().is_empty() {
            name.push('*');
        }
        let tab = pad(COMMAND_WIDTH, name.chars().count());
        out.push_str(&format!("  {name}{tab}      {}\n", command.description));
    }

    for module in &commander.ext_modules {
        out.push('\n');
        out.push_str(&format!("  Extension - {}\n", module.name));
        out.push_str("  =====================================\n");

        for command in &module.commands {
            if command.subcommands().is_empty() {
                let tab = pad(COMMAND_WIDTH, command.name.chars().count());
                out.push_str(&format!(
                    "  {}{tab}      {}\n",
                    command.name, command.description
                ));
            } else {
                for sub in command.subcommands() {
                    let row = format!("{} {}", command.name, sub.name);
                    let tab = pad(COMMAND_WIDTH, row.chars().count());
                    out.push_str(&format!("  {row}{tab}      {}\n", sub.description));
                }
            }
        }
    }

    out
}

fn render_command(command: &Command) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("  Command               : {}\n", command.name));
    if !command.description.is_empty() {
        out.push_str(&format!("  Description           : {}\n", command.description));
    }
    if !command.example.is_empty() {
        out.push_str(&format!("  Example               : {}\n", command.example));
    }

    if !command.subcommands().is_empty() {
        out.push('\n');
        out.push_str("  SubCommand                Description\n");
        out.push_str("  ----------                -----------\n");
        for sub in command.subcommands() {
            let width = sub.name.chars().count().min(SUBCOMMAND_WIDTH);
            let tab = pad(SUBCOMMAND_WIDTH, width);
            out.push_str(&format!("  {}{tab}      {}\n", sub.name, sub.description));
        }
    } else if !command.args().is_empty() {
        out.push_str(&render_usage(&command.name, command.args()));
    }

    out
}

fn render_subcommand(command: &Command, sub: &Subcommand) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  Command               : {} {}\n",
        command.name, sub.name
    ));
    if !sub.description.is_empty() {
        out.push_str(&format!("  Description           : {}\n", sub.description));
    }
    if !sub.example.is_empty() {
        out.push_str(&format!("  Example               : {}\n", sub.example));
    }
    if !sub.args.is_empty() {
        let qualified = format!("{} {}", command.name, sub.name);
        out.push_str(&render_usage(&qualified, &sub.args));
    }
    out
}

/// `Usage:` line plus the argument table, column sized to the longest
/// argument in the displayed set.
fn render_usage(name: &str, args: &[Argument]) -> String {
    let mut usage = name.to_string();
    let mut max_len = 0;
    for arg in args {
        let full = full_arg(arg);
        max_len = max_len.max(full.chars().count());
        usage.push(' ');
        usage.push_str(&full);
    }

    let mut out = String::new();
    out.push_str(&format!("  Usage                 : {usage}\n\n"));
    out.push_str("  Arguments:\n");

    for arg in args {
        let full = full_arg(arg);
        let padding = pad(max_len, full.chars().count());
        let default_part = if arg.default_used {
            format!(" (default: '{}'). ", arg.default_value)
        } else {
            ". ".to_string()
        };
        out.push_str(&format!(
            "    {full}{padding}  : {}{default_part}{}\n",
            arg.kind, arg.description
        ));
    }

    out
}

/// Bracketed display form of one argument: `<-t target>`, `[path]`, `[-v]`.
fn full_arg(arg: &Argument) -> String {
    let (open, close) = if arg.required { ("<", ">") } else { ("[", "]") };
    let sep = if arg.mark.is_empty() || arg.name.is_empty() {
        ""
    } else {
        " "
    };
    format!("{open}{}{sep}{}{close}", arg.mark, arg.name)
}
