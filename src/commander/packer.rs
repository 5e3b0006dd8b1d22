/*!
Typed argument packing for beacon object files.

The consumer ABI is a little-endian, length-prefixed blob: `build` prepends
a 4-byte total length to the accumulated items and base64-wraps the result.

Item encodings:
  CSTR   4-byte length (incl. NUL) + UTF-8 bytes + NUL; empty -> zero length only
  WSTR   4-byte byte length + UTF-16LE units + NUL unit; empty -> zero length only
  INT    4-byte signed
  SHORT  2-byte signed
  BYTES  4-byte length + raw bytes (input is base64)

INT/SHORT accept JSON numbers, booleans (0/1) and decimal strings; values
that fail to coerce contribute nothing to the blob.
*/

use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

/// Serialization type of one packed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackType {
    Cstr,
    Wstr,
    Int,
    Short,
    Bytes,
}

impl FromStr for PackType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSTR" => Ok(PackType::Cstr),
            "WSTR" => Ok(PackType::Wstr),
            "INT" => Ok(PackType::Int),
            "SHORT" => Ok(PackType::Short),
            "BYTES" => Ok(PackType::Bytes),
            _ => Err(()),
        }
    }
}

/// Stateful accumulator for one `$PACK_BOF(...)` expansion.
#[derive(Debug, Default)]
pub struct BofPacker {
    data: Vec<u8>,
}

impl BofPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one typed value. Values of the wrong JSON shape are skipped.
    pub fn pack(&mut self, kind: PackType, value: &Value) {
        match kind {
            PackType::Cstr => {
                let Some(s) = value.as_str() else { return };
                if s.is_empty() {
                    self.data.extend_from_slice(&0i32.to_le_bytes());
                } else {
                    let mut bytes = s.as_bytes().to_vec();
                    bytes.push(0);
                    self.data
                        .extend_from_slice(&(bytes.len() as i32).to_le_bytes());
                    self.data.extend_from_slice(&bytes);
                }
            }
            PackType::Wstr => {
                let Some(s) = value.as_str() else { return };
                if s.is_empty() {
                    self.data.extend_from_slice(&0i32.to_le_bytes());
                } else {
                    let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
                    let byte_len = (units.len() * 2) as i32;
                    self.data.extend_from_slice(&byte_len.to_le_bytes());
                    for unit in units {
                        self.data.extend_from_slice(&unit.to_le_bytes());
                    }
                }
            }
            PackType::Int => {
                if let Some(num) = coerce_i64(value) {
                    self.data.extend_from_slice(&(num as i32).to_le_bytes());
                }
            }
            PackType::Short => {
                if let Some(num) = coerce_i64(value) {
                    self.data.extend_from_slice(&(num as i16).to_le_bytes());
                }
            }
            PackType::Bytes => {
                let Some(s) = value.as_str() else { return };
                let Ok(bytes) = STANDARD.decode(s) else { return };
                self.data
                    .extend_from_slice(&(bytes.len() as i32).to_le_bytes());
                self.data.extend_from_slice(&bytes);
            }
        }
    }

    /// Length-prefix the accumulated items and base64-wrap the whole blob.
    pub fn build(&self) -> String {
        let mut blob = Vec::with_capacity(self.data.len() + 4);
        blob.extend_from_slice(&(self.data.len() as i32).to_le_bytes());
        blob.extend_from_slice(&self.data);
        STANDARD.encode(blob)
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
