use super::lookup::{descend, ObjectLookup};
use pwtrace_core::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

pub const SNIP_MARKER: &str = "[...snip...]";
/// Characters kept on each side of the marker.
pub const KEEP_CHARS: usize = 40;

const CONTAINER_KEYS: [&str; 3] = ["metadata", "params", "arg"];
const VALUE_KEY: &str = "value";
const TEXT_KEY: &str = "s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShortenOutcome {
    Shortened,
    ParseFailed { reason: String },
    NoTargetField { path: FieldPath },
    TargetTooShort { chars: usize },
    ValueMissing,
    SerializeFailed { reason: String },
    StillTooLong { length: usize },
}

impl ShortenOutcome {
    /// Outcomes worth surfacing to the operator. The line is still written.
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            ShortenOutcome::ParseFailed { .. }
                | ShortenOutcome::SerializeFailed { .. }
                | ShortenOutcome::StillTooLong { .. }
        )
    }
}

impl Display for ShortenOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortenOutcome::Shortened => write!(f, "shortened"),
            ShortenOutcome::ParseFailed { reason } => write!(f, "not a JSON object: {reason}"),
            ShortenOutcome::NoTargetField { path } => write!(f, "no string field at {path}"),
            ShortenOutcome::TargetTooShort { chars } => {
                write!(f, "target string has only {chars} characters")
            }
            ShortenOutcome::ValueMissing => write!(f, "value had no `s` key and was reset"),
            ShortenOutcome::SerializeFailed { reason } => {
                write!(f, "re-serialization failed: {reason}")
            }
            ShortenOutcome::StillTooLong { length } => write!(
                f,
                "line is still {length} bytes after shortening; unknown large field shape"
            ),
        }
    }
}

/// A usable output line plus what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedLine<'a> {
    pub line: Cow<'a, [u8]>,
    pub outcome: ShortenOutcome,
}

/// Shrinks an oversized trace line by eliding the middle of
/// `metadata.params.arg.value.s`. Never fails: when the line cannot be
/// handled the input is returned as-is.
pub fn shorten_trace_line(line: &[u8], max_line_length: usize) -> ShortenedLine<'_> {
    let mut record = match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(record)) => record,
        Ok(_) => {
            return unchanged(
                line,
                ShortenOutcome::ParseFailed {
                    reason: "trace record is not a JSON object".to_string(),
                },
            )
        }
        Err(error) => {
            return unchanged(
                line,
                ShortenOutcome::ParseFailed {
                    reason: error.to_string(),
                },
            )
        }
    };

    let edit = shorten_record(&mut record);
    let encoded = match serde_json::to_vec(&record) {
        Ok(encoded) => encoded,
        Err(error) => {
            return unchanged(
                line,
                ShortenOutcome::SerializeFailed {
                    reason: error.to_string(),
                },
            )
        }
    };

    let outcome = if encoded.len() > max_line_length {
        ShortenOutcome::StillTooLong {
            length: encoded.len(),
        }
    } else {
        edit
    };
    ShortenedLine {
        line: Cow::Owned(encoded),
        outcome,
    }
}

fn unchanged(line: &[u8], outcome: ShortenOutcome) -> ShortenedLine<'_> {
    ShortenedLine {
        line: Cow::Borrowed(line),
        outcome,
    }
}

fn shorten_record(record: &mut Map<String, Value>) -> ShortenOutcome {
    let mut path = FieldPath::root();
    let mut current = record;
    for key in CONTAINER_KEYS {
        path.push_key(key);
        current = match descend(current, key) {
            ObjectLookup::Found(child) => child,
            ObjectLookup::Missing | ObjectLookup::WrongType => {
                return ShortenOutcome::NoTargetField { path }
            }
        };
    }

    let arg = current;
    path.push_key(VALUE_KEY);
    match descend(arg, VALUE_KEY) {
        ObjectLookup::Found(value) => match value.get_mut(TEXT_KEY) {
            Some(Value::String(text)) => {
                return match elide_middle(text) {
                    Ok(short) => {
                        *text = short;
                        ShortenOutcome::Shortened
                    }
                    Err(chars) => ShortenOutcome::TargetTooShort { chars },
                };
            }
            Some(_) => {
                return ShortenOutcome::NoTargetField {
                    path: path.child(TEXT_KEY),
                }
            }
            None => {}
        },
        ObjectLookup::Missing | ObjectLookup::WrongType => {
            return ShortenOutcome::NoTargetField { path }
        }
    }

    arg.insert(VALUE_KEY.to_string(), Value::Object(Map::new()));
    ShortenOutcome::ValueMissing
}

/// Keeps the first and last [`KEEP_CHARS`] characters around [`SNIP_MARKER`].
/// Strings under `2 * KEEP_CHARS` characters are left alone; the error
/// carries their character count.
fn elide_middle(text: &str) -> Result<String, usize> {
    let chars = text.chars().count();
    if chars < KEEP_CHARS * 2 {
        return Err(chars);
    }
    let head_end = byte_offset(text, KEEP_CHARS);
    let tail_start = byte_offset(text, chars - KEEP_CHARS);

    let mut short = String::with_capacity(head_end + SNIP_MARKER.len() + text.len() - tail_start);
    short.push_str(&text[..head_end]);
    short.push_str(SNIP_MARKER);
    short.push_str(&text[tail_start..]);
    Ok(short)
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}

#[cfg(test)]
#[path = "shorten_test.rs"]
mod tests;
