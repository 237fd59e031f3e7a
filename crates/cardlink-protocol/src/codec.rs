//! The text codec: lines ⇄ [`Command`]s.
//!
//! The wire format is deliberately flat:
//!
//! ```text
//! NAME key1=value1 key2=value2
//! ```
//!
//! There is no quoting and no escaping. A value that contains a space or an
//! `=` cannot be represented, so every producer of outbound values must
//! make sure they never do (see [`sanitize_value`]).
//!
//! Decoding is total: it never fails. Anything it can't make sense of is
//! simply dropped, and the worst case is a command with an empty field set.
//! Whether that command is *useful* is decided later, by the typed parsers
//! in [`Inbound`](crate::Inbound).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::Command;

/// Decodes one line into a [`Command`].
///
/// Rules:
/// - split on the first space into `name` and `rest`;
/// - split `rest` on spaces into tokens (runs of spaces yield no tokens);
/// - split each token on its first `=` into key and value;
/// - tokens without `=`, or with an empty key, are discarded;
/// - a key that appears twice keeps its later value.
///
/// ```rust
/// use cardlink_protocol::decode;
///
/// let cmd = decode("CAST_CHANGE_RULE roomId=r1 cols=4 rows=3");
/// assert_eq!(cmd.name(), "CAST_CHANGE_RULE");
/// assert_eq!(cmd.field("cols"), Some("4"));
/// ```
pub fn decode(line: &str) -> Command {
    let (name, rest) = match line.split_once(' ') {
        Some((name, rest)) => (name, rest),
        None => (line, ""),
    };

    let mut fields = BTreeMap::new();
    for token in rest.split(' ').filter(|t| !t.is_empty()) {
        // `split_once` splits on the FIRST `=`, so `a=b=c` → ("a", "b=c").
        if let Some((key, value)) = token.split_once('=') {
            if key.is_empty() {
                continue;
            }
            fields.insert(key.to_string(), value.to_string());
        }
    }

    Command::from_parts(name.to_string(), fields)
}

/// Encodes a command name and fields into a line (no trailing newline).
///
/// Fields are written in iteration order, so callers that care about a
/// human-friendly order (e.g. `roomId` first) pass a slice or array.
///
/// ```rust
/// use cardlink_protocol::encode;
///
/// let line = encode("REQ_CREATE_ROOM", [("title", "Foo"), ("rows", "4"), ("cols", "4")]);
/// assert_eq!(line, "REQ_CREATE_ROOM title=Foo rows=4 cols=4");
/// ```
pub fn encode<I, K, V>(name: &str, fields: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut line = String::from(name);
    for (k, v) in fields {
        // Writing into a String can't fail.
        let _ = write!(line, " {}={}", k.as_ref(), v.as_ref());
    }
    line
}

/// Makes arbitrary user text safe to use as a field value.
///
/// Whitespace and `=` are replaced with `_`; an empty result becomes `_`
/// so the field still round-trips as present.
pub fn sanitize_value(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '=' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
