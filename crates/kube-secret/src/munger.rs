//! Munging of `Secret` data values
//!
//! Stateless helpers: check that a document is a `kind: Secret`, then walk
//! the entries under `data` in document order and rewrite each value in
//! place. The first failing entry aborts the walk; entries already rewritten
//! stay rewritten.

use crate::document::{Entry, Node, OrderedMap};
use crate::error::{Result, SecretError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

pub const KIND_KEY: &str = "kind";
pub const DATA_KEY: &str = "data";
pub const SECRET_KIND: &str = "Secret";

/// Which way the values under `data` are being converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// plaintext -> base64
    Encode,
    /// base64 -> plaintext
    Decode,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Encode => "encode",
            Direction::Decode => "decode",
        }
    }

    /// "encoding" / "decoding", for messages
    pub fn gerund(&self) -> &'static str {
        match self {
            Direction::Encode => "encoding",
            Direction::Decode => "decoding",
        }
    }
}

/// Fail unless the top-level `kind` is exactly the string "Secret"
pub fn ensure_is_secret(document: &OrderedMap) -> Result<()> {
    let kind = document.get(KIND_KEY).ok_or(SecretError::MissingKind)?;

    let kind = kind.as_str().ok_or_else(|| SecretError::WrongType {
        field: format!("yaml `{}`", KIND_KEY),
        value: kind.describe(),
        expected: "string",
    })?;

    if kind != SECRET_KIND {
        return Err(SecretError::WrongKind(kind.to_string()));
    }
    Ok(())
}

/// Apply `f` to every entry under `data`, in order.
///
/// A document without `data` is left alone (it may carry `stringData`
/// instead, which is already plaintext). Returns the number of entries
/// processed.
pub fn process<F>(document: &mut OrderedMap, mut f: F) -> Result<usize>
where
    F: FnMut(&mut Entry) -> Result<()>,
{
    let Some(data) = document.get_mut(DATA_KEY) else {
        debug!("no `data` key, nothing to munge");
        return Ok(0);
    };

    let description = data.describe();
    let data = data.as_map_mut().ok_or_else(|| SecretError::WrongType {
        field: format!("yaml `{}`", DATA_KEY),
        value: description,
        expected: "mapping",
    })?;

    for entry in data.entries_mut() {
        f(entry)?;
    }
    Ok(data.len())
}

/// Decode every `data` value from base64 to plaintext
pub fn decode_all(document: &mut OrderedMap) -> Result<usize> {
    process(document, decode_entry)
}

/// Encode every `data` value from plaintext to base64
pub fn encode_all(document: &mut OrderedMap) -> Result<usize> {
    process(document, encode_entry)
}

pub fn apply(document: &mut OrderedMap, direction: Direction) -> Result<usize> {
    match direction {
        Direction::Encode => encode_all(document),
        Direction::Decode => decode_all(document),
    }
}

/// Replace a base64 value with its decoded text.
///
/// Line breaks inside the value are ignored, so folded base64 still decodes.
pub fn decode_entry(entry: &mut Entry) -> Result<()> {
    let secret = secret_str(entry)?;
    let compact: String = secret.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let decoded = STANDARD
        .decode(compact.as_bytes())
        .map_err(|source| SecretError::Base64Decode {
            key: entry.key.label(),
            value: secret.to_string(),
            source,
        })?;

    let text = String::from_utf8(decoded).map_err(|_| SecretError::InvalidUtf8 {
        key: entry.key.label(),
    })?;

    entry.value = Node::String(text);
    Ok(())
}

/// Replace a plaintext value with its base64 encoding
pub fn encode_entry(entry: &mut Entry) -> Result<()> {
    let encoded = STANDARD.encode(secret_str(entry)?.as_bytes());
    entry.value = Node::String(encoded);
    Ok(())
}

fn secret_str(entry: &Entry) -> Result<&str> {
    entry.value.as_str().ok_or_else(|| SecretError::WrongType {
        field: format!("secret {:?}", entry.key.label()),
        value: entry.value.describe(),
        expected: "string",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: impl Into<Node>) -> Entry {
        Entry {
            key: Node::from(key),
            value: value.into(),
        }
    }

    fn secret(data: OrderedMap) -> OrderedMap {
        OrderedMap::new().with("kind", "Secret").with("data", data)
    }

    #[test]
    fn test_ensure_is_secret() {
        assert!(ensure_is_secret(&OrderedMap::new().with("kind", "Secret")).is_ok());

        let err = ensure_is_secret(&OrderedMap::new()).unwrap_err();
        assert!(matches!(err, SecretError::MissingKind));

        let err = ensure_is_secret(&OrderedMap::new().with("kind", 42i64)).unwrap_err();
        assert!(matches!(err, SecretError::WrongType { .. }));
        assert_eq!(err.to_string(), "yaml `kind` is 42, expected string");

        let err = ensure_is_secret(&OrderedMap::new().with("kind", "ConfigMap")).unwrap_err();
        assert!(matches!(err, SecretError::WrongKind(ref k) if k == "ConfigMap"));
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_kind_is_case_sensitive() {
        let err = ensure_is_secret(&OrderedMap::new().with("kind", "secret")).unwrap_err();
        assert!(matches!(err, SecretError::WrongKind(_)));
    }

    #[test]
    fn test_decode_entry() {
        let mut kv = entry("keyA", "Ym9vcA==");
        decode_entry(&mut kv).unwrap();
        assert_eq!(kv, entry("keyA", "boop"));
    }

    #[test]
    fn test_decode_entry_invalid_base64() {
        let mut kv = entry("keyB", "invalid!");
        let err = decode_entry(&mut kv).unwrap_err();
        match err {
            SecretError::Base64Decode { key, value, .. } => {
                assert_eq!(key, "keyB");
                assert_eq!(value, "invalid!");
            }
            other => panic!("unexpected error: {other}"),
        }
        // untouched on failure
        assert_eq!(kv, entry("keyB", "invalid!"));
    }

    #[test]
    fn test_decode_entry_ignores_line_breaks() {
        let mut kv = entry("folded", "Ym9v\ncA==");
        decode_entry(&mut kv).unwrap();
        assert_eq!(kv.value.as_str(), Some("boop"));
    }

    #[test]
    fn test_decode_entry_rejects_binary() {
        // 0xff 0xfe is not UTF-8
        let mut kv = entry("bin", "//4=");
        let err = decode_entry(&mut kv).unwrap_err();
        assert!(matches!(err, SecretError::InvalidUtf8 { ref key } if key == "bin"));
    }

    #[test]
    fn test_entry_bad_type() {
        let mut kv = entry("key2", OrderedMap::new());
        assert!(matches!(
            decode_entry(&mut kv).unwrap_err(),
            SecretError::WrongType { .. }
        ));
        assert!(matches!(
            encode_entry(&mut kv).unwrap_err(),
            SecretError::WrongType { .. }
        ));
    }

    #[test]
    fn test_encode_entry() {
        let mut kv = entry("key1", "goopy");
        encode_entry(&mut kv).unwrap();
        assert_eq!(kv, entry("key1", "Z29vcHk="));
    }

    #[test]
    fn test_encode_is_not_idempotent() {
        let mut kv = entry("k", "root");
        encode_entry(&mut kv).unwrap();
        encode_entry(&mut kv).unwrap();
        assert_eq!(kv.value.as_str(), Some("Y205dmRBPT0="));
    }

    #[test]
    fn test_process_visits_keys_in_order() {
        let mut doc = secret(
            OrderedMap::new()
                .with("secret1", "hai")
                .with("something", "boop")
                .with("secret2", "bai"),
        );

        let mut seen = vec![];
        let count = process(&mut doc, |kv| {
            seen.push(kv.key.label());
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen, vec!["secret1", "something", "secret2"]);
    }

    #[test]
    fn test_process_without_data_is_noop() {
        let mut doc = OrderedMap::new()
            .with("kind", "Secret")
            .with("stringData", OrderedMap::new().with("user", "root"));
        let before = doc.clone();

        assert_eq!(decode_all(&mut doc).unwrap(), 0);
        assert_eq!(encode_all(&mut doc).unwrap(), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_process_data_wrong_type() {
        let mut doc = OrderedMap::new().with("data", 42i64);
        let err = process(&mut doc, |_| Ok(())).unwrap_err();
        assert!(matches!(err, SecretError::WrongType { expected: "mapping", .. }));
    }

    #[test]
    fn test_process_stops_at_first_error() {
        let mut doc = secret(
            OrderedMap::new()
                .with("user", "cm9vdA==")
                .with("broken", "not-base64!!")
                .with("pass", "czNjcjN0"),
        );

        let err = decode_all(&mut doc).unwrap_err();
        assert!(matches!(err, SecretError::Base64Decode { ref key, .. } if key == "broken"));

        let Some(Node::Map(data)) = doc.get("data") else {
            panic!("data went missing");
        };
        assert_eq!(data.get("user").and_then(Node::as_str), Some("root"));
        assert_eq!(data.get("broken").and_then(Node::as_str), Some("not-base64!!"));
        assert_eq!(data.get("pass").and_then(Node::as_str), Some("czNjcjN0"));
    }

    #[test]
    fn test_decode_then_encode_is_identity() {
        let original = secret(
            OrderedMap::new()
                .with("user", "cm9vdA==")
                .with("pass", "czNjcjN0")
                .with("empty", ""),
        );
        let mut doc = original.clone();

        apply(&mut doc, Direction::Decode).unwrap();
        assert_ne!(doc, original);
        apply(&mut doc, Direction::Encode).unwrap();
        assert_eq!(doc, original);
    }

    #[test]
    fn test_encode_then_decode_handles_unicode() {
        let original = secret(OrderedMap::new().with("motd", "héllo\nwörld ✓"));
        let mut doc = original.clone();

        encode_all(&mut doc).unwrap();
        decode_all(&mut doc).unwrap();
        assert_eq!(doc, original);
    }
}
