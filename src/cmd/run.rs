/*!
`run.rs`

Implements the `run` subcommand for the `opcon` CLI: dispatch a single
operator command line against a loaded catalog and print the outcome.

Behavior:
  - Loads the core catalog (`-c`) and optional extension modules (`-e`).
  - Dispatches the line for the agent architecture given by `--arch`.
  - Terminal results (help text, errors) print as text; payload results
    print as the JSON tasking string.
  - `--json` wraps the outcome in a machine-readable envelope instead.

JSON Success Output:
{
  "status": "ok",
  "handled": false,
  "payload": { ...tasking object... }
}

JSON Error Output:
{
  "status": "error",
  "error": "message"
}
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::StyleOptions;
use crate::cmd::shared::{agent_data, build_commander, print_outcome};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command line to dispatch (quote it as one shell word)
    #[arg(value_name = "LINE")]
    pub line: String,

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

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_run(args: RunArgs) -> Result<()> {
    let commander = build_commander(&args.catalog, &args.ext)?;
    let agent = agent_data(args.agent.as_deref(), args.arch.as_deref())?;

    let result = commander.process_input(&agent, &args.line);

    if args.json {
        if result.error {
            let err = serde_json::json!({ "status": "error", "error": result.message });
            println!(
                "{}",
                serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
            );
            anyhow::bail!("dispatch failed: {}", args.line);
        }

        let payload: serde_json::Value = if result.handled {
            serde_json::Value::String(result.message.clone())
        } else {
            serde_json::from_str(&result.message)
                .unwrap_or(serde_json::Value::String(result.message.clone()))
        };
        let ok = serde_json::json!({
            "status": "ok",
            "handled": result.handled,
            "payload": payload,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&ok).unwrap_or_else(|_| ok.to_string())
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    if !print_outcome(&result, &style) {
        anyhow::bail!("dispatch failed: {}", args.line);
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
        Run(RunArgs),
    }

    #[test]
    fn clap_parses_run_line_and_catalog() {
        let cli =
            TestCli::try_parse_from(["t", "run", "shell whoami", "-c", "catalog.json"]).unwrap();
        match cli.cmd {
            TestSub::Run(a) => {
                assert_eq!(a.line, "shell whoami");
                assert_eq!(a.catalog, "catalog.json");
                assert!(a.arch.is_none());
                assert!(a.agent.is_none());
                assert!(a.ext.is_empty());
                assert!(!a.json);
            }
        }
    }

    #[test]
    fn clap_parses_repeated_ext() {
        let cli = TestCli::try_parse_from([
            "t", "run", "go", "-c", "core.json", "-e", "a.json", "-e", "b.json", "--json",
        ])
        .unwrap();
        match cli.cmd {
            TestSub::Run(a) => {
                assert_eq!(a.ext, vec!["a.json".to_string(), "b.json".to_string()]);
                assert!(a.json);
            }
        }
    }

    #[test]
    fn run_emits_payload_for_leaf_command() {
        let catalog = std::env::temp_dir().join("opcon_run_catalog.json");
        std::fs::write(
            &catalog,
            r#"[{ "command": "ls", "args": ["STRING [path]"] }]"#,
        )
        .unwrap();

        let args = RunArgs {
            line: "ls /tmp".to_string(),
            catalog: catalog.to_string_lossy().into_owned(),
            ext: Vec::new(),
            agent: None,
            arch: None,
            json: false,
        };
        assert!(execute_run(args).is_ok());
    }

    #[test]
    fn run_fails_on_unknown_command() {
        let catalog = std::env::temp_dir().join("opcon_run_catalog2.json");
        std::fs::write(&catalog, "[]").unwrap();

        let args = RunArgs {
            line: "nope".to_string(),
            catalog: catalog.to_string_lossy().into_owned(),
            ext: Vec::new(),
            agent: None,
            arch: None,
            json: false,
        };
        assert!(execute_run(args).is_err());
    }
}
