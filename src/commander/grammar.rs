/*!
Argument-spec DSL parsing.

One argument per line, shaped as:

  TYPE <mark name>  (default)  {description}   required valued flag
  TYPE [name]                                  optional positional
  TYPE <-f>                                    pure flag (leading - or /)

`<...>` marks the argument required, `[...]` optional. A bracketed group
containing a space is a `mark name` pair (valued flag); a single word is a
pure mark when it starts with `-` or `/`, otherwise a positional name.
The parenthesized group is a default literal, the brace group free-form
help text.

Lines that do not fit the shape are rejected; the catalog loader drops
them and retains the error string for `Commander::last_error`.
*/

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Value type of a bindable argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Int,
    Bool,
    File,
}

impl FromStr for ArgKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(ArgKind::String),
            "INT" => Ok(ArgKind::Int),
            "BOOL" => Ok(ArgKind::Bool),
            "FILE" => Ok(ArgKind::File),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArgKind::String => "STRING",
            ArgKind::Int => "INT",
            ArgKind::Bool => "BOOL",
            ArgKind::File => "FILE",
        };
        f.write_str(s)
    }
}

/// One formal parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub kind: ArgKind,
    /// Positional identifier; the JSON key for non-pure-flag arguments.
    pub name: String,
    /// Flag token as typed by the operator (`-v`, `/f`); empty for positionals.
    pub mark: String,
    /// True iff the argument is introduced by a mark.
    pub flag: bool,
    /// True iff the declaration used `<...>` rather than `[...]`.
    pub required: bool,
    pub default_value: String,
    pub default_used: bool,
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("arguments not parsed")]
    NotParsed,
    #[error("argument must be in <> or []")]
    BadBrackets,
}

fn spec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\w+)\s+([\[<][^\s\]]+[\s\w-]*[>\]])(\s*\([^)]*\))?(?:\s+\{([\s\S]+)\})?")
            .unwrap()
    })
}

/// Parse a single DSL line into an [`Argument`].
pub fn parse_argument(spec: &str) -> Result<Argument, GrammarError> {
    let caps = spec_regex().captures(spec).ok_or(GrammarError::NotParsed)?;

    let kind: ArgKind = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse()
        .map_err(|_| GrammarError::NotParsed)?;

    let bracketed = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    let default_group = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
    let description = caps
        .get(4)
        .map(|m| m.as_str().trim())
        .unwrap_or_default()
        .to_string();

    let required = if bracketed.starts_with('<') && bracketed.ends_with('>') {
        true
    } else if bracketed.starts_with('[') && bracketed.ends_with(']') {
        false
    } else {
        return Err(GrammarError::BadBrackets);
    };

    let (default_value, default_used) = if default_group.is_empty() {
        (String::new(), false)
    } else {
        // Strip the surrounding parentheses, keep inner text trimmed.
        let inner = &default_group[1..default_group.len() - 1];
        (inner.trim().to_string(), true)
    };

    let inner = &bracketed[1..bracketed.len() - 1];
    let (name, mark, flag) = match inner.find(' ') {
        Some(space) => {
            let mark = inner[..space].trim().to_string();
            let name = inner[space + 1..].trim().to_string();
            (name, mark, true)
        }
        None => {
            let word = inner.trim();
            if word.starts_with('-') || word.starts_with('/') {
                (String::new(), word.to_string(), true)
            } else {
                (word.to_string(), String::new(), false)
            }
        }
    };

    Ok(Argument {
        kind,
        name,
        mark,
        flag,
        required,
        default_value,
        default_used,
        description,
    })
}
