use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod commander;
mod utils;

use cmd::{ListArgs, ReplArgs, RunArgs, execute_list, execute_repl, execute_run};

/// opcon — operator console command engine
///
/// Dispatches shell-like operator command lines against a declaratively
/// loaded command catalog (core commands plus extension modules), expands
/// the exec template language ($ARCH, $MAP, $RAND, $HASH, $PACK_BOF, ...)
/// and emits the JSON tasking payload a remote agent would receive.
///
/// Examples:
///   opcon run "shell whoami" -c demos/catalog.json
///   opcon run "help token steal" -c demos/catalog.json
///   opcon run "seatbelt all" -c demos/catalog.json -e demos/ext/seatbelt.json --arch x64 --json
///   opcon repl -c demos/catalog.json -e demos/ext/seatbelt.json --agent demos/agent.json
///   opcon list -c demos/catalog.json --json
///
/// Catalogs:
///   - Core catalog (-c): JSON array of command objects
///   - Extension modules (-e, repeatable): { name, commands, constants };
///     $EXT_DIR() resolves to the extension file's directory
///
/// Global flags:
///   -v / -vv increase verbosity; -q quiet
///
/// Output:
///   Human-readable text or a machine envelope with --json.
#[derive(Parser, Debug)]
#[command(
    name = "opcon",
    version,
    author,
    about = "opcon - command dispatcher and template engine for agent tasking",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one command line against the catalog
    Run(RunArgs),

    /// Interactive dispatch loop
    Repl(ReplArgs),

    /// List every dispatchable command line (completion feed)
    List(ListArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match cli.command {
        Commands::Run(args) => execute_run(args),
        Commands::Repl(args) => execute_repl(args),
        Commands::List(args) => execute_list(args),
    }
}
