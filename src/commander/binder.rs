/*!
Token binding: match an argv slice against a command's argument list and
assemble the JSON payload destined for the agent.

Matching walks the input tokens left to right; for each token the argument
list is scanned in declared order and the first applicable rule wins:
bool flag (mark match), valued flag (mark match + following token), then
first unbound positional. A token matching nothing is "wide": it and every
remaining token are appended, space-joined, to the most recently bound slot
and binding stops. Trailing free text therefore lands in the last slot
without requiring quotes.

Coercion then walks the argument list once more, applying declared types
(with `~/` expansion and base64 wrapping for FILE), defaults for absent
required arguments, and the `<key>` substitutions of the command's message
template. No partial payload survives an error.
*/

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::commander::catalog::{Command, CommandBody};
use crate::commander::grammar::{ArgKind, Argument};
use crate::utils;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Missing required argument: {0}")]
    MissingArgument(String),
    #[error("Missing required argument for subcommand: {0}")]
    MissingSubArgument(String),
    #[error("Failed to open file: {0}")]
    FileOpen(String),
    #[error("Subcommand must be set")]
    SubcommandRequired,
    #[error("Unknown subcommand: {0}")]
    UnknownSubcommand(String),
}

/// Result of a successful bind: the payload object plus the exec template
/// of the selected command or subcommand.
#[derive(Debug)]
pub struct Bound {
    pub payload: Map<String, Value>,
    pub exec: String,
}

/// Bind `argv` (command name already stripped) against `command`.
pub fn bind(command: &Command, argv: &[String]) -> Result<Bound, BindError> {
    let mut payload = Map::new();
    payload.insert("command".into(), Value::String(command.name.clone()));

    match &command.body {
        CommandBody::Args(args) => {
            bind_args(args, argv, &command.message, false, &mut payload)?;
            Ok(Bound {
                payload,
                exec: command.exec.clone(),
            })
        }
        CommandBody::Group(subs) => {
            let Some(sub_name) = argv.first() else {
                return Err(BindError::SubcommandRequired);
            };
            let sub = subs
                .iter()
                .find(|s| &s.name == sub_name)
                .ok_or_else(|| BindError::UnknownSubcommand(sub_name.clone()))?;

            payload.insert("subcommand".into(), Value::String(sub.name.clone()));
            bind_args(&sub.args, &argv[1..], &sub.message, true, &mut payload)?;
            Ok(Bound {
                payload,
                exec: sub.exec.clone(),
            })
        }
    }
}

fn bind_args(
    args: &[Argument],
    argv: &[String],
    message: &str,
    for_subcommand: bool,
    payload: &mut Map<String, Value>,
) -> Result<(), BindError> {
    let parsed = match_tokens(args, argv);
    coerce(args, &parsed, for_subcommand, payload)?;

    if !message.is_empty() {
        let mut msg = message.to_string();
        for (key, value) in &parsed {
            let placeholder = format!("<{key}>");
            if msg.contains(&placeholder) {
                msg = msg.replace(&placeholder, value);
            }
        }
        payload.insert("message".into(), Value::String(msg));
    }
    Ok(())
}

/// First pass: raw token matching. Keys are argument names (or marks for
/// bool flags), values the raw strings as typed.
fn match_tokens(args: &[Argument], argv: &[String]) -> BTreeMap<String, String> {
    let mut parsed: BTreeMap<String, String> = BTreeMap::new();
    let mut wide_key = String::new();

    let mut i = 0;
    while i < argv.len() {
        let token = &argv[i];
        let mut matched = false;

        for arg in args {
            if arg.flag {
                if arg.kind == ArgKind::Bool && arg.mark == *token {
                    parsed.insert(arg.mark.clone(), "true".to_string());
                    wide_key = arg.mark.clone();
                    matched = true;
                    break;
                }
                if arg.mark == *token && i + 1 < argv.len() {
                    i += 1;
                    parsed.insert(arg.name.clone(), argv[i].clone());
                    wide_key = arg.name.clone();
                    matched = true;
                    break;
                }
            } else if !parsed.contains_key(&arg.name) {
                parsed.insert(arg.name.clone(), token.clone());
                wide_key = arg.name.clone();
                matched = true;
                break;
            }
        }

        if !matched {
            // Wide rule: absorb this and every remaining token into the
            // last-bound slot, space-joined.
            let mut wide = String::new();
            for t in &argv[i..] {
                wide.push(' ');
                wide.push_str(t);
            }
            parsed.entry(wide_key).or_default().push_str(&wide);
            break;
        }
        i += 1;
    }

    parsed
}

/// Second pass: typed coercion into the payload, defaults for absent
/// required arguments.
fn coerce(
    args: &[Argument],
    parsed: &BTreeMap<String, String>,
    for_subcommand: bool,
    payload: &mut Map<String, Value>,
) -> Result<(), BindError> {
    for arg in args {
        // Pure flags have an empty name (and positionals an empty mark);
        // never match those against the empty wide key stray text binds to.
        let present = (!arg.name.is_empty() && parsed.contains_key(&arg.name))
            || (!arg.mark.is_empty() && parsed.contains_key(&arg.mark));

        if present {
            match arg.kind {
                ArgKind::String => {
                    let value = parsed.get(&arg.name).cloned().unwrap_or_default();
                    payload.insert(arg.name.clone(), Value::String(value));
                }
                ArgKind::Int => {
                    let raw = parsed.get(&arg.name).map(String::as_str).unwrap_or("");
                    let num = raw.parse::<i64>().unwrap_or(0);
                    payload.insert(arg.name.clone(), Value::Number(num.into()));
                }
                ArgKind::Bool => {
                    let set = parsed.get(&arg.mark).map(String::as_str) == Some("true");
                    payload.insert(arg.mark.clone(), Value::Bool(set));
                }
                ArgKind::File => {
                    let raw = parsed.get(&arg.name).cloned().unwrap_or_default();
                    let encoded = read_file_b64(&raw)?;
                    payload.insert(arg.name.clone(), Value::String(encoded));
                }
            }
        } else if arg.required {
            if arg.default_value.is_empty() && !arg.default_used {
                return Err(if for_subcommand {
                    BindError::MissingSubArgument(arg.name.clone())
                } else {
                    BindError::MissingArgument(arg.name.clone())
                });
            }
            match arg.kind {
                ArgKind::String => {
                    payload.insert(arg.name.clone(), Value::String(arg.default_value.clone()));
                }
                ArgKind::Int => {
                    let num = arg.default_value.parse::<i64>().unwrap_or(0);
                    payload.insert(arg.name.clone(), Value::Number(num.into()));
                }
                ArgKind::Bool => {
                    payload.insert(arg.mark.clone(), Value::Bool(arg.default_value == "true"));
                }
                ArgKind::File => {
                    let encoded = read_file_b64(&arg.default_value)?;
                    payload.insert(arg.name.clone(), Value::String(encoded));
                }
            }
        }
    }
    Ok(())
}

/// Read a FILE argument (with leading `~/` expanded) into base64.
fn read_file_b64(raw: &str) -> Result<String, BindError> {
    let path = utils::expand_home(raw);
    match std::fs::read(&path) {
        Ok(bytes) => Ok(STANDARD.encode(bytes)),
        Err(_) => Err(BindError::FileOpen(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commander::catalog::CommandSpec;
    use serde_json::json;

    fn command(json: &str) -> Command {
        let spec: CommandSpec = serde_json::from_str(json).unwrap();
        let mut error = String::new();
        let cmd = Command::from_spec(spec, &mut error);
        assert!(error.is_empty(), "catalog error: {error}");
        cmd
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn wide_rule_absorbs_trailing_tokens() {
        let cmd = command(r#"{ "command": "shell", "args": ["STRING <cmd>"] }"#);
        let bound = bind(&cmd, &argv(&["a", "b", "c"])).unwrap();
        assert_eq!(bound.payload.get("cmd"), Some(&json!("a b c")));
        assert_eq!(bound.payload.get("command"), Some(&json!("shell")));
    }

    #[test]
    fn flags_bind_in_any_order() {
        let cmd = command(
            r#"{ "command": "scan", "args": ["STRING <-t target>", "BOOL [-v]"] }"#,
        );
        let bound = bind(&cmd, &argv(&["-v", "-t", "host1"])).unwrap();
        assert_eq!(bound.payload.get("-v"), Some(&json!(true)));
        assert_eq!(bound.payload.get("target"), Some(&json!("host1")));
    }

    #[test]
    fn missing_required_is_an_error() {
        let cmd = command(
            r#"{ "command": "scan", "args": ["STRING <-t target>", "BOOL [-v]"] }"#,
        );
        let err = bind(&cmd, &argv(&["-v"])).unwrap_err();
        assert_eq!(err, BindError::MissingArgument("target".to_string()));
        assert_eq!(err.to_string(), "Missing required argument: target");
    }

    #[test]
    fn required_bool_flag_without_default_errors_when_absent() {
        let cmd = command(r#"{ "command": "x", "args": ["BOOL <-v>"] }"#);
        let bound = bind(&cmd, &argv(&["-v"])).unwrap();
        assert_eq!(bound.payload.get("-v"), Some(&json!(true)));
        assert!(bind(&cmd, &[]).is_err());
    }

    #[test]
    fn defaults_apply_through_coercion() {
        let cmd = command(
            r#"{ "command": "listen", "args": ["INT <port> (4444)", "STRING <host> (0.0.0.0)"] }"#,
        );
        let bound = bind(&cmd, &[]).unwrap();
        assert_eq!(bound.payload.get("port"), Some(&json!(4444)));
        assert_eq!(bound.payload.get("host"), Some(&json!("0.0.0.0")));
    }

    #[test]
    fn optional_absent_is_omitted() {
        let cmd = command(r#"{ "command": "ls", "args": ["STRING [path]"] }"#);
        let bound = bind(&cmd, &[]).unwrap();
        assert!(!bound.payload.contains_key("path"));
        let bound = bind(&cmd, &argv(&["/tmp"])).unwrap();
        assert_eq!(bound.payload.get("path"), Some(&json!("/tmp")));
    }

    #[test]
    fn int_coercion_parses_decimal() {
        let cmd = command(r#"{ "command": "sleep", "args": ["INT <seconds>"] }"#);
        let bound = bind(&cmd, &argv(&["30"])).unwrap();
        assert_eq!(bound.payload.get("seconds"), Some(&json!(30)));
    }

    #[test]
    fn message_template_renders_bound_values() {
        let cmd = command(
            r#"{ "command": "sleep", "message": "Task: sleep <seconds>s", "args": ["INT <seconds>"] }"#,
        );
        let bound = bind(&cmd, &argv(&["30"])).unwrap();
        assert_eq!(bound.payload.get("message"), Some(&json!("Task: sleep 30s")));
    }

    #[test]
    fn subcommand_selection_and_errors() {
        let cmd = command(
            r#"{
                "command": "token",
                "subcommands": [
                    { "name": "steal", "args": ["INT <pid>"] },
                    { "name": "revert" }
                ]
            }"#,
        );

        let bound = bind(&cmd, &argv(&["steal", "1234"])).unwrap();
        assert_eq!(bound.payload.get("subcommand"), Some(&json!("steal")));
        assert_eq!(bound.payload.get("pid"), Some(&json!(1234)));

        assert_eq!(bind(&cmd, &[]).unwrap_err(), BindError::SubcommandRequired);
        assert_eq!(
            bind(&cmd, &argv(&["nope"])).unwrap_err(),
            BindError::UnknownSubcommand("nope".to_string())
        );
        assert_eq!(
            bind(&cmd, &argv(&["steal"])).unwrap_err().to_string(),
            "Missing required argument for subcommand: pid"
        );
    }

    #[test]
    fn file_argument_reads_and_encodes() {
        let path = std::env::temp_dir().join("opcon_bind_file_test.bin");
        std::fs::write(&path, b"payload").unwrap();

        let cmd = command(r#"{ "command": "upload", "args": ["FILE <data>"] }"#);
        let bound = bind(&cmd, &argv(&[path.to_str().unwrap()])).unwrap();
        assert_eq!(
            bound.payload.get("data"),
            Some(&json!(STANDARD.encode(b"payload")))
        );

        let err = bind(&cmd, &argv(&["/definitely/not/there.bin"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to open file: /definitely/not/there.bin"
        );
    }

    #[test]
    fn wide_text_before_any_bound_slot_is_dropped() {
        // Nothing matches the leading token, so it lands under the empty
        // wide key and never reaches the payload.
        let cmd = command(r#"{ "command": "x", "args": ["STRING [-t target]"] }"#);
        let bound = bind(&cmd, &argv(&["stray", "text"])).unwrap();
        assert_eq!(bound.payload.len(), 1);
        assert_eq!(bound.payload.get("command"), Some(&json!("x")));
    }

    #[test]
    fn stray_wide_text_does_not_count_as_a_pure_flag() {
        // A pure flag shares its empty name with the empty wide key; text
        // bound there must not make the flag look present.
        let cmd = command(r#"{ "command": "x", "args": ["BOOL [-v]"] }"#);
        let bound = bind(&cmd, &argv(&["stray"])).unwrap();
        assert_eq!(bound.payload.len(), 1);
        assert!(!bound.payload.contains_key("-v"));

        let required = command(r#"{ "command": "x", "args": ["BOOL <-v>"] }"#);
        assert!(bind(&required, &argv(&["stray"])).is_err());
    }

    #[test]
    fn valued_flag_as_last_token_does_not_consume() {
        let cmd = command(
            r#"{ "command": "x", "args": ["STRING [-t target]", "STRING [rest]"] }"#,
        );
        // "-t" with no following token falls through to the positional slot.
        let bound = bind(&cmd, &argv(&["-t"])).unwrap();
        assert_eq!(bound.payload.get("rest"), Some(&json!("-t")));
        assert!(!bound.payload.contains_key("target"));
    }
}
