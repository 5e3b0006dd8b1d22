//! Utilities: logging (dynamic level), random string generation, hex digests,
//! home-directory path expansion.
//!
//! Key items:
//!   init_logging / derive_level
//!   random_string (named character sets for $RAND)
//!   generate_hash (sha2-backed, for $HASH)
//!   expand_home (leading ~/ only)

use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha2::{Digest, Sha256, Sha512};

/// Logging helpers.
pub mod logging {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO",
                LogLevel::Debug => "DEBUG",
                LogLevel::Trace => "TRACE",
            }
        }
    }

    static GLOBAL_LEVEL: OnceLock<AtomicU8> = OnceLock::new();

    fn inner_cell() -> &'static AtomicU8 {
        GLOBAL_LEVEL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
    }

    pub fn init_logging(level: LogLevel) {
        set_log_level(level);
    }

    pub fn set_log_level(level: LogLevel) {
        inner_cell().store(level as u8, Ordering::Relaxed);
    }

    pub fn current_log_level() -> LogLevel {
        match inner_cell().load(Ordering::Relaxed) {
            0 => LogLevel::Error,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn timestamp() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    fn should_emit(level: LogLevel) -> bool {
        level <= current_log_level()
    }

    pub fn log(level: LogLevel, msg: impl AsRef<str>) {
        if should_emit(level) {
            println!("[{}][{}] {}", level.as_str(), timestamp(), msg.as_ref());
        }
    }

    pub fn error(msg: impl AsRef<str>) {
        log(LogLevel::Error, msg);
    }
    pub fn info(msg: impl AsRef<str>) {
        log(LogLevel::Info, msg);
    }
    pub fn debug(msg: impl AsRef<str>) {
        log(LogLevel::Debug, msg);
    }
    pub fn trace(msg: impl AsRef<str>) {
        log(LogLevel::Trace, msg);
    }

    #[macro_export]
    macro_rules! log_error {
        ($($t:tt)*) => { $crate::utils::logging::error(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_info {
        ($($t:tt)*) => { $crate::utils::logging::info(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_debug {
        ($($t:tt)*) => { $crate::utils::logging::debug(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_trace {
        ($($t:tt)*) => { $crate::utils::logging::trace(format!($($t)*)) };
    }
}

pub use logging::{derive_level, init_logging};

/// Resolve a `$RAND` character-set name to its alphabet.
fn charset(name: &str) -> Option<&'static [u8]> {
    match name {
        "alphanumeric" => {
            Some(b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789")
        }
        "alpha" => Some(b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        "digits" => Some(b"0123456789"),
        "hex" => Some(b"0123456789abcdef"),
        _ => None,
    }
}

/// Random string of `length` characters drawn from the named set.
/// Unknown set names and zero lengths yield `None`.
pub fn random_string(length: usize, set: &str) -> Option<String> {
    let alphabet = charset(set)?;
    if length == 0 {
        return None;
    }
    let mut rng = rand::rng();
    Some(
        (0..length)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
            .collect(),
    )
}

/// Lowercase hex digest of `input`, truncated to `length` characters.
/// A length of zero (or one past the digest size) keeps the full digest.
/// Unknown algorithm names yield `None`.
pub fn generate_hash(algorithm: &str, length: usize, input: &str) -> Option<String> {
    let digest = match algorithm {
        "sha256" => hex_encode(&Sha256::digest(input.as_bytes())),
        "sha512" => hex_encode(&Sha512::digest(input.as_bytes())),
        _ => return None,
    };

    if length == 0 || length >= digest.len() {
        Some(digest)
    } else {
        Some(digest[..length].to_string())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Expand a leading `~/` to the user's home directory. No other shell
/// expansion is performed.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_length_and_alphabet() {
        let s = random_string(16, "hex").unwrap();
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));

        let d = random_string(4, "digits").unwrap();
        assert!(d.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn random_string_unknown_set() {
        assert!(random_string(8, "base32").is_none());
        assert!(random_string(0, "hex").is_none());
    }

    #[test]
    fn sha256_digest_truncation() {
        let full = generate_hash("sha256", 0, "abc").unwrap();
        assert_eq!(
            full,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(generate_hash("sha256", 8, "abc").unwrap(), "ba7816bf");
        // Over-long requests keep the whole digest.
        assert_eq!(generate_hash("sha256", 4096, "abc").unwrap(), full);
    }

    #[test]
    fn unknown_algorithm_is_none() {
        assert!(generate_hash("md4", 8, "abc").is_none());
    }

    #[test]
    fn expand_home_leading_tilde_only() {
        let p = expand_home("~/notes.txt");
        assert!(!p.to_string_lossy().starts_with("~/"));
        assert_eq!(expand_home("/a/~/b"), PathBuf::from("/a/~/b"));
    }
}
