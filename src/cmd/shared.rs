/*!
shared.rs - shared helpers for subcommands.

Focus:
  - build_commander: load the core catalog file + extension module files
  - agent_data: AgentData from the --agent metadata file and/or --arch flag
  - print_outcome: route a CommanderResult to stdout/stderr (human mode)

Goal: keep reusable, minimal logic for run/repl/list. Transport to a live
agent stays out of scope; the payload string is the product.
*/

use std::path::Path;

use anyhow::{Context, Result};

use crate::commander::catalog::ExtModuleSpec;
use crate::commander::{AgentData, Commander, CommanderResult};
use crate::cmd::format::{Role, StyleOptions, color, emoji};
use crate::log_debug;

/// Load the core catalog plus any extension module files into a fresh
/// engine instance.
pub fn build_commander(catalog_path: &str, ext_paths: &[String]) -> Result<Commander> {
    let mut commander = Commander::new();

    let raw = std::fs::read_to_string(catalog_path)
        .with_context(|| format!("failed to read catalog file: {catalog_path}"))?;
    commander
        .add_reg_commands(&raw)
        .with_context(|| format!("failed to parse catalog file: {catalog_path}"))?;

    for path in ext_paths {
        load_ext_module(&mut commander, path)?;
    }

    if !commander.last_error().is_empty() {
        log_debug!("catalog load: {}", commander.last_error());
    }

    Ok(commander)
}

/// Load one extension module file and register it under its path.
pub fn load_ext_module(commander: &mut Commander, path: &str) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read extension file: {path}"))?;
    let spec: ExtModuleSpec = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse extension file: {path}"))?;
    commander.add_ext_module(Path::new(path), spec);
    Ok(())
}

/// Agent metadata for template expansion: an optional JSON metadata file,
/// with `--arch` taking precedence and "x64" as the final fallback.
pub fn agent_data(agent_path: Option<&str>, arch: Option<&str>) -> Result<AgentData> {
    let mut agent = match agent_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read agent file: {path}"))?;
            serde_json::from_str::<AgentData>(&raw)
                .with_context(|| format!("failed to parse agent file: {path}"))?
        }
        None => AgentData::default(),
    };

    if let Some(arch) = arch {
        agent.arch = arch.to_string();
    } else if agent.arch.is_empty() {
        agent.arch = "x64".to_string();
    }
    Ok(agent)
}

/// Human-mode printer for one dispatch outcome. Returns false when the
/// result was an error (callers decide whether that fails the process).
pub fn print_outcome(result: &CommanderResult, style: &StyleOptions) -> bool {
    if result.error {
        eprintln!(
            "{} {}",
            emoji("error", style),
            color(Role::Error, &result.message, style)
        );
        return false;
    }
    if result.handled {
        if !result.message.is_empty() {
            println!("{}", result.message);
        }
    } else {
        // Payload destined for the agent: print it verbatim.
        println!("{}", result.message);
    }
    true
}
