/*!
repl.rs - interactive dispatch loop.

Reads operator lines from stdin, dispatches each against the loaded
catalog, and prints results until `exit`/`quit` or EOF. Errors stay in the
loop; only setup failures abort.

Example:
  opcon repl -c demos/catalog.json -e demos/ext/seatbelt.json --arch x64
*/

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared::{agent_data, build_commander, print_outcome};
use crate::log_info;

#[derive(Args, Debug)]
pub struct ReplArgs {
    /// Core catalog JSON file
    #[arg(short = 'c', long = "catalog", value_name = "PATH")]
    pub catalog: String,

    /// Extension module JSON file (repeatable)
    #[arg(short = 'e', long = "ext", value_name = "PATH")]
    pub ext: Vec<String>,

    /// Agent metadata JSON file ({ id, name, os, arch })
    #[arg(long, value_name = "PATH")]
    pub agent: Option<String>,

    /// Agent architecture used by $ARCH() expansion (overrides --agent; default x64)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,
}

pub fn execute_repl(args: ReplArgs) -> Result<()> {
    let commander = build_commander(&args.catalog, &args.ext)?;
    let agent = agent_data(args.agent.as_deref(), args.arch.as_deref())?;
    let style = StyleOptions::detect();

    log_info!(
        "catalog ready: {} dispatchable lines",
        commander.commands_list().len()
    );
    println!(
        "{}",
        color(
            Role::Dim,
            "type 'help' for the catalog, 'exit' to quit",
            &style
        )
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", color(Role::Primary, "opcon>", &style));
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let result = commander.process_input(&agent, line);
        print_outcome(&result, &style);
    }

    Ok(())
}
