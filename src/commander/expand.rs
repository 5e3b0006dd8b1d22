/*!
Exec-template expansion.

An `exec` string turns a bound payload into a brand-new command line that is
fed back through the dispatcher. Substitution passes run in a fixed order
(they do not commute: a `$MAP` result may itself contain `{name}` tokens the
final pass must resolve):

  1. $ARCH()                   agent architecture
  2. $EXT_DIR()                directory of the owning extension module
  3. $MAP(name, key)           extension constant lookup
  4. $RAND(n, set)             random string from a named character set
  5. $HASH(algo, n, input)     truncated hex digest; {param} inside the
                               input resolves from the payload first
  6. $PACK_BOF(items...)       packed + base64 BOF argument blob
  7. {param}                   residual payload interpolation, quoted via
                               serialize_param

A pass that cannot produce a value (unknown constant, unknown character
set, unknown algorithm, missing payload key) leaves the occurrence
untouched; fragments may legitimately survive into deeper dispatch layers.
*/

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::commander::AgentData;
use crate::commander::catalog::ExtModule;
use crate::commander::packer::{BofPacker, PackType};
use crate::commander::tokenize::serialize_param;
use crate::utils;

fn map_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$MAP\(\s*(\w+)\s*,\s*(\w+)\s*\)").unwrap())
}

fn rand_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$RAND\(\s*(\d+)\s*,\s*(\w+)\s*\)").unwrap())
}

fn hash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$HASH\(\s*(\w+)\s*,\s*(\d+)\s*,\s*([^)]+)\s*\)").unwrap())
}

fn pack_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$PACK_BOF\s*\(([^)]*)\)").unwrap())
}

fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\s*([^}]*)\s*\}").unwrap())
}

fn pack_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]+)\s+(.+)$").unwrap())
}

/// Run every substitution pass over `exec` for one bound payload.
pub fn expand_exec(
    exec: &str,
    agent: &AgentData,
    ext: Option<&ExtModule>,
    payload: &Map<String, Value>,
) -> String {
    let mut out = exec.replace("$ARCH()", &agent.arch);

    if let Some(module) = ext
        && let Some(dir) = module.file_path.parent()
    {
        out = out.replace("$EXT_DIR()", &dir.to_string_lossy());
    }

    out = expand_map(&out, ext);
    out = expand_rand(&out);
    out = expand_hash(&out, payload);
    out = expand_pack(&out, payload);
    expand_params(&out, payload)
}

fn expand_map(input: &str, ext: Option<&ExtModule>) -> String {
    let mut out = input.to_string();
    for caps in map_regex().captures_iter(input) {
        let whole = &caps[0];
        let value = ext
            .and_then(|m| m.constants.get(&caps[1]))
            .and_then(|c| c.map.get(&caps[2]));
        if let Some(value) = value
            && !value.is_empty()
        {
            out = out.replace(whole, value);
        }
    }
    out
}

fn expand_rand(input: &str) -> String {
    let mut out = input.to_string();
    for caps in rand_regex().captures_iter(input) {
        let length = caps[1].parse::<usize>().unwrap_or(0);
        if let Some(random) = utils::random_string(length, &caps[2]) {
            // Identical occurrences collapse to the same generated value.
            out = out.replace(&caps[0], &random);
        }
    }
    out
}

fn expand_hash(input: &str, payload: &Map<String, Value>) -> String {
    let mut out = input.to_string();
    for caps in hash_regex().captures_iter(input) {
        let length = caps[2].parse::<usize>().unwrap_or(0);
        let hash_input = expand_params(caps[3].trim(), payload);
        if let Some(digest) = utils::generate_hash(&caps[1], length, &hash_input) {
            out = out.replace(&caps[0], &digest);
        }
    }
    out
}

fn expand_pack(input: &str, payload: &Map<String, Value>) -> String {
    let mut out = input.to_string();
    for caps in pack_regex().captures_iter(input) {
        let blob = pack_items(&caps[1], payload);
        out = out.replace(&caps[0], &blob);
    }
    out
}

/// Parse the comma-separated `$PACK_BOF` item list and pack each entry.
/// An item is `[TYPE] {param}` or `[TYPE] literal`; the type defaults to
/// CSTR, and unknown type words pack nothing.
fn pack_items(content: &str, payload: &Map<String, Value>) -> String {
    let mut packer = BofPacker::new();

    for raw in content.split(',') {
        let item = raw.trim();
        if item.is_empty() {
            continue;
        }

        let (type_word, value_part) = match pack_item_regex().captures(item) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str()).unwrap_or(""),
                caps.get(2).map(|m| m.as_str().trim()).unwrap_or(""),
            ),
            None => ("", item),
        };

        let kind = if type_word.is_empty() {
            PackType::Cstr
        } else {
            match type_word.parse::<PackType>() {
                Ok(kind) => kind,
                Err(_) => continue,
            }
        };

        if value_part.starts_with('{') && value_part.ends_with('}') {
            let name = value_part[1..value_part.len() - 1].trim();
            if let Some(value) = payload.get(name) {
                packer.pack(kind, value);
            }
        } else {
            packer.pack(kind, &Value::String(value_part.to_string()));
        }
    }

    packer.build()
}

/// Residual `{param}` interpolation: string payload values are substituted
/// in serialize_param-quoted form; anything else stays as-is.
fn expand_params(input: &str, payload: &Map<String, Value>) -> String {
    let mut out = input.to_string();
    for caps in param_regex().captures_iter(input) {
        let name = caps[1].trim();
        if let Some(value) = payload.get(name).and_then(Value::as_str) {
            out = out.replace(&caps[0], &serialize_param(value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commander::catalog::{ExtModule, ExtModuleSpec};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;
    use std::path::Path;

    fn agent(arch: &str) -> AgentData {
        AgentData {
            arch: arch.to_string(),
            ..Default::default()
        }
    }

    fn payload(pairs: &[(&str, Value)]) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    fn demo_module() -> ExtModule {
        let spec: ExtModuleSpec = serde_json::from_str(
            r#"{
                "name": "demo",
                "constants": [
                    { "name": "bofs", "map": { "x64": "demo.x64.o", "empty": "" } }
                ]
            }"#,
        )
        .unwrap();
        let mut error = String::new();
        ExtModule::from_spec(Path::new("/opt/ext/demo.json"), spec, &mut error)
    }

    #[test]
    fn arch_and_ext_dir() {
        let module = demo_module();
        let out = expand_exec(
            "execute bof $EXT_DIR()/payload.$ARCH().o",
            &agent("x64"),
            Some(&module),
            &Map::new(),
        );
        assert_eq!(out, "execute bof /opt/ext/payload.x64.o");
    }

    #[test]
    fn ext_dir_without_module_is_left_alone() {
        let out = expand_exec("ls $EXT_DIR()", &agent("x64"), None, &Map::new());
        assert_eq!(out, "ls $EXT_DIR()");
    }

    #[test]
    fn map_hit_and_miss() {
        let module = demo_module();
        let out = expand_exec(
            "load $MAP(bofs, x64) and $MAP(bofs, arm64) and $MAP(bofs, empty)",
            &agent("x64"),
            Some(&module),
            &Map::new(),
        );
        // Misses and empty values keep the original occurrence.
        assert_eq!(
            out,
            "load demo.x64.o and $MAP(bofs, arm64) and $MAP(bofs, empty)"
        );
    }

    #[test]
    fn rand_respects_length_and_set() {
        let out = expand_rand("svc-$RAND(8, hex)");
        assert!(out.starts_with("svc-"));
        let suffix = &out[4..];
        assert_eq!(suffix.chars().count(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn rand_unknown_set_is_left_alone() {
        assert_eq!(expand_rand("x $RAND(8, klingon)"), "x $RAND(8, klingon)");
    }

    #[test]
    fn repeated_rand_occurrences_share_one_value() {
        let out = expand_rand("$RAND(6, digits)/$RAND(6, digits)");
        let parts: Vec<&str> = out.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], parts[1]);
    }

    #[test]
    fn hash_substitutes_params_before_digesting() {
        let p = payload(&[("user", json!("operator"))]);
        let direct = utils::generate_hash("sha256", 16, "operator").unwrap();
        let out = expand_hash("id-$HASH(sha256, 16, {user})", &p);
        assert_eq!(out, format!("id-{direct}"));
    }

    #[test]
    fn hash_unknown_algo_is_left_alone() {
        let out = expand_hash("$HASH(crc32, 8, abc)", &Map::new());
        assert_eq!(out, "$HASH(crc32, 8, abc)");
    }

    #[test]
    fn pack_bof_literals() {
        let out = expand_pack("go $PACK_BOF(INT 5, CSTR hello)", &Map::new());
        let blob = out.strip_prefix("go ").unwrap();
        // Body: 4 (INT) + 4 + 6 (CSTR length word + "hello\0") = 14 bytes.
        assert_eq!(
            STANDARD.decode(blob).unwrap(),
            vec![
                0x0E, 0x00, 0x00, 0x00, //
                0x05, 0x00, 0x00, 0x00, //
                0x06, 0x00, 0x00, 0x00, 0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x00,
            ]
        );
    }

    #[test]
    fn pack_bof_pulls_payload_params() {
        let p = payload(&[("pid", json!(7)), ("proc", json!("spoolsv"))]);
        let out = expand_pack("$PACK_BOF(INT {pid}, {proc}, {missing})", &p);
        assert_eq!(
            STANDARD.decode(out).unwrap(),
            vec![
                0x10, 0x00, 0x00, 0x00, //
                0x07, 0x00, 0x00, 0x00, //
                0x08, 0x00, 0x00, 0x00, 0x73, 0x70, 0x6F, 0x6F, 0x6C, 0x73, 0x76, 0x00,
            ]
        );
    }

    #[test]
    fn residual_params_are_quoted() {
        let p = payload(&[("path", json!(r"c:\tmp\a file"))]);
        let out = expand_params("run {path}", &p);
        assert_eq!(out, r#"run "c:\\tmp\\a file""#);
    }

    #[test]
    fn residual_non_string_params_are_left_alone() {
        let p = payload(&[("pid", json!(7))]);
        assert_eq!(expand_params("kill {pid}", &p), "kill {pid}");
        assert_eq!(expand_params("kill {gone}", &p), "kill {gone}");
    }
}
