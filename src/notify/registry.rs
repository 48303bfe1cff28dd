//! Text encoding of issued notification handles.
//!
//! A task record has a single text field for its reminder handles. Most
//! entries are one plain handle, but a native periodic weekly pattern yields
//! one handle per weekday and those travel together as a composite entry.
//!
//! Format `v1`:
//!
//! ```text
//! ""                          no handles
//! v1:c=h1,h2;p=h3             composite [h1, h2] followed by plain h3
//! ```
//!
//! Identifiers are percent-encoded, so `;`, `,` and `=` inside a handle are
//! safe. The pre-versioned format (a JSON array of strings, where a string
//! containing commas was a composite) is still accepted on decode.

use tracing::warn;

use super::scheduler::NotificationHandle;

const VERSION: &str = "v1";
const ENTRY_SEP: char = ';';
const ID_SEP: char = ',';
const PLAIN_TAG: &str = "p";
const COMPOSITE_TAG: &str = "c";

/// One persisted unit of issued handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleEntry {
    /// A single registration.
    Single(NotificationHandle),
    /// Several registrations that form one logical reminder.
    Composite(Vec<NotificationHandle>),
}

impl HandleEntry {
    /// Handles in this entry, in order.
    pub fn handles(&self) -> &[NotificationHandle] {
        match self {
            Self::Single(handle) => std::slice::from_ref(handle),
            Self::Composite(handles) => handles,
        }
    }
}

/// Why an encoded handle field could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The field carries a version tag this build does not know.
    #[error("unknown handle encoding version '{0}'")]
    UnknownVersion(String),
    /// An entry is not `p=<id>` or `c=<id>,…`.
    #[error("malformed handle entry '{0}'")]
    MalformedEntry(String),
    /// An identifier is not valid percent-encoded UTF-8.
    #[error("bad identifier encoding '{0}'")]
    BadEncoding(String),
}

/// Encode `entries` for the task record's handle field.
///
/// Empty composites carry nothing to cancel and are dropped.
pub fn encode(entries: &[HandleEntry]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .filter(|entry| !entry.handles().is_empty())
        .map(|entry| match entry {
            HandleEntry::Single(handle) => format!("{PLAIN_TAG}={}", encode_id(handle)),
            HandleEntry::Composite(handles) => {
                let ids: Vec<String> = handles.iter().map(encode_id).collect();
                format!("{COMPOSITE_TAG}={}", ids.join(&ID_SEP.to_string()))
            }
        })
        .collect();

    if parts.is_empty() {
        return String::new();
    }
    format!("{VERSION}:{}", parts.join(&ENTRY_SEP.to_string()))
}

/// Decode a handle field, treating anything unreadable as "no handles".
pub fn decode(encoded: &str) -> Vec<HandleEntry> {
    match try_decode(encoded) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("ignoring unreadable handle field: {e}");
            Vec::new()
        }
    }
}

/// Decode a handle field, reporting why it is unreadable.
///
/// # Errors
///
/// Returns a [`RegistryError`] for unknown versions, malformed entries or
/// undecodable identifiers.
pub fn try_decode(encoded: &str) -> Result<Vec<HandleEntry>, RegistryError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    if encoded.starts_with('[') {
        return decode_legacy(encoded);
    }

    let Some((version, body)) = encoded.split_once(':') else {
        return Err(RegistryError::MalformedEntry(encoded.to_owned()));
    };
    if version != VERSION {
        return Err(RegistryError::UnknownVersion(version.to_owned()));
    }
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split(ENTRY_SEP).map(decode_entry).collect()
}

/// Expand composites into a flat list of handles.
pub fn flatten(entries: &[HandleEntry]) -> Vec<NotificationHandle> {
    entries
        .iter()
        .flat_map(|entry| entry.handles().iter().cloned())
        .collect()
}

fn encode_id(handle: &NotificationHandle) -> String {
    urlencoding::encode(handle.as_str()).into_owned()
}

fn decode_id(raw: &str, entry: &str) -> Result<NotificationHandle, RegistryError> {
    if raw.is_empty() {
        return Err(RegistryError::MalformedEntry(entry.to_owned()));
    }
    urlencoding::decode(raw)
        .map(|id| NotificationHandle::new(id.into_owned()))
        .map_err(|_| RegistryError::BadEncoding(raw.to_owned()))
}

fn decode_entry(entry: &str) -> Result<HandleEntry, RegistryError> {
    let malformed = || RegistryError::MalformedEntry(entry.to_owned());
    let (tag, ids) = entry.split_once('=').ok_or_else(malformed)?;

    match tag {
        PLAIN_TAG if !ids.contains(ID_SEP) => Ok(HandleEntry::Single(decode_id(ids, entry)?)),
        COMPOSITE_TAG => {
            let handles = ids
                .split(ID_SEP)
                .map(|raw| decode_id(raw, entry))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(HandleEntry::Composite(handles))
        }
        _ => Err(malformed()),
    }
}

fn decode_legacy(encoded: &str) -> Result<Vec<HandleEntry>, RegistryError> {
    let raw: Vec<String> = serde_json::from_str(encoded)
        .map_err(|_| RegistryError::MalformedEntry(encoded.to_owned()))?;

    Ok(raw
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.contains(ID_SEP) {
                HandleEntry::Composite(
                    s.split(ID_SEP)
                        .filter(|id| !id.is_empty())
                        .map(NotificationHandle::from)
                        .collect(),
                )
            } else {
                HandleEntry::Single(NotificationHandle::new(s))
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn h(id: &str) -> NotificationHandle {
        NotificationHandle::new(id)
    }

    fn mixed() -> Vec<HandleEntry> {
        vec![
            HandleEntry::Composite(vec![h("h1"), h("h2")]),
            HandleEntry::Single(h("h3")),
        ]
    }

    #[test]
    fn encode_mixed_entries() {
        assert_eq!(encode(&mixed()), "v1:c=h1,h2;p=h3");
    }

    #[test]
    fn mixed_entries_survive_encode_decode_encode() {
        let first = encode(&mixed());
        let decoded = decode(&first);
        assert_eq!(decoded, mixed());
        assert_eq!(encode(&decoded), first);
    }

    #[test]
    fn empty_list_is_empty_string() {
        assert_eq!(encode(&[]), "");
        assert!(decode("").is_empty());
        assert!(decode("   ").is_empty());
        assert_eq!(encode(&[HandleEntry::Composite(Vec::new())]), "");
    }

    #[test]
    fn delimiters_inside_identifiers_are_escaped() {
        let entries = vec![
            HandleEntry::Single(h("a;b=c")),
            HandleEntry::Composite(vec![h("x,y"), h("z:1")]),
        ];
        let encoded = encode(&entries);
        assert_eq!(encoded.matches(';').count(), 1);
        assert_eq!(decode(&encoded), entries);
    }

    #[test]
    fn malformed_input_decodes_to_nothing() {
        for bad in ["garbage", "v1:x=1", "v1:p=", "v1:p=a,b", "v1:c=a,,b", "v1:p=%FF", "[1, 2"] {
            assert!(decode(bad).is_empty(), "{bad} should decode to nothing");
        }
    }

    #[test]
    fn try_decode_reports_the_reason() {
        assert_eq!(
            try_decode("v9:p=a"),
            Err(RegistryError::UnknownVersion("v9".to_owned()))
        );
        assert_eq!(
            try_decode("v1:q=a"),
            Err(RegistryError::MalformedEntry("q=a".to_owned()))
        );
        assert!(matches!(try_decode("v1:p=%FF"), Err(RegistryError::BadEncoding(_))));
    }

    #[test]
    fn legacy_json_array_is_accepted() {
        let decoded = decode(r#"["h1,h2", "h3", ""]"#);
        assert_eq!(decoded, mixed());
        assert_eq!(encode(&decoded), "v1:c=h1,h2;p=h3");
    }

    #[test]
    fn flatten_expands_composites_in_order() {
        assert_eq!(flatten(&mixed()), vec![h("h1"), h("h2"), h("h3")]);
        assert!(flatten(&[]).is_empty());
    }
}
