/*!
`list.rs`

Implements the `list` subcommand for the `opcon` CLI.

Behavior:
  - Loads the catalog (and extension modules) like `run` does.
  - Prints every dispatchable command line: leaf commands, `cmd sub`
    pairs for grouped commands, then the matching `help ...` lines.
    This is the feed for console completion.
  - Outputs a plain list or JSON with `--json`.

JSON Output Shape:
{
  "status": "ok",
  "count": 3,
  "commands": ["ls", "token steal", "help ls"]
}
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, color};
use crate::cmd::shared::build_commander;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Core catalog JSON file
    #[arg(short = 'c', long = "catalog", value_name = "PATH")]
    pub catalog: String,

    /// Extension module JSON file (repeatable)
    #[arg(short = 'e', long = "ext", value_name = "PATH")]
    pub ext: Vec<String>,

    /// Output JSON instead of one line per command
    #[arg(long)]
    pub json: bool,
}

pub fn execute_list(args: ListArgs) -> Result<()> {
    let commander = build_commander(&args.catalog, &args.ext)?;
    let commands = commander.commands_list();

    if args.json {
        let out = serde_json::json!({
            "status": "ok",
            "count": commands.len(),
            "commands": commands,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string())
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        color(Role::Accent, format!("Commands ({})", commands.len()), &style)
    );
    for line in commands {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        List(ListArgs),
    }

    #[test]
    fn clap_parses_list_args() {
        let cli = TestCli::try_parse_from(["t", "list", "-c", "core.json", "--json"]).unwrap();
        match cli.cmd {
            TestSub::List(a) => {
                assert_eq!(a.catalog, "core.json");
                assert!(a.json);
            }
        }
    }

    #[test]
    fn list_walks_catalog_and_extensions() {
        let catalog = std::env::temp_dir().join("opcon_list_catalog.json");
        std::fs::write(
            &catalog,
            r#"[
                { "command": "ls" },
                { "command": "token", "subcommands": [{ "name": "steal" }] }
            ]"#,
        )
        .unwrap();

        let args = ListArgs {
            catalog: catalog.to_string_lossy().into_owned(),
            ext: Vec::new(),
            json: true,
        };
        assert!(execute_list(args).is_ok());
    }
}
