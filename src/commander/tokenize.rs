//! Command-line tokenization (Windows CommandLineToArgv escaping rules).
//!
//! tokenize: line -> argv tokens; a run of N backslashes before `"` collapses
//! to N/2 literal backslashes, the quote is literal when N is odd and toggles
//! the quote state when N is even. Backslashes not followed by a quote are
//! copied verbatim.
//!
//! serialize_param is the inverse used when re-assembling expanded command
//! lines: doubles backslashes, escapes quotes, wraps in quotes on spaces.

/// Split an operator-typed line into argv-style tokens.
///
/// Operates on code points, not bytes. Whitespace outside quotes terminates
/// the current token; a lone `"` toggles quoting without emitting anything.
pub fn tokenize(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();

    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;

    let mut i = 0;
    while i < len {
        let c = chars[i];

        if c.is_whitespace() && !in_quotes {
            if !token.is_empty() {
                tokens.push(std::mem::take(&mut token));
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }

        if c == '\\' {
            let mut num_bs = 0;
            while i < len && chars[i] == '\\' {
                num_bs += 1;
                i += 1;
            }
            if i < len && chars[i] == '"' {
                for _ in 0..num_bs / 2 {
                    token.push('\\');
                }
                if num_bs % 2 == 0 {
                    in_quotes = !in_quotes;
                } else {
                    token.push('"');
                }
                i += 1;
            } else {
                // No quote after the run: every backslash is literal.
                for _ in 0..num_bs {
                    token.push('\\');
                }
            }
            continue;
        }

        token.push(c);
        i += 1;
    }

    if !token.is_empty() {
        tokens.push(token);
    }

    tokens
}

/// Quote a single token so that `tokenize` reproduces it.
pub fn serialize_param(token: &str) -> String {
    let mut out = token.replace('\\', "\\\\").replace('"', "\\\"");
    if out.contains(' ') {
        out = format!("\"{out}\"");
    }
    out
}
