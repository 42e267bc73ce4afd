//! Order-preserving YAML document model
//!
//! Manifests are deserialized by serde_yaml straight into an explicit list of
//! entries. Lookups are linear; manifests are small and the only thing that
//! matters is that keys come back out in the order they went in, so
//! reformatting a file doesn't show up as a diff.

use crate::error::{Result, SecretError};
use serde::de::{self, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::Value;
use std::fmt;

/// A YAML value, as far as the munger cares
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    String(String),
    Map(OrderedMap),
    Sequence(Vec<Node>),
    /// Null, bool, number or tagged values. Carried through untouched.
    Scalar(Value),
}

/// One key/value pair of an [`OrderedMap`]
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Node,
    pub value: Node,
}

/// Mapping that keeps its entries in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap {
    entries: Vec<Entry>,
}

impl Node {
    /// The string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut OrderedMap> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Node::String(s) => format!("{:?}", s),
            Node::Map(m) => format!("a mapping with {} entries", m.len()),
            Node::Sequence(items) => format!("a sequence with {} items", items.len()),
            Node::Scalar(Value::Null) => "null".to_string(),
            Node::Scalar(Value::Bool(b)) => b.to_string(),
            Node::Scalar(Value::Number(n)) => n.to_string(),
            Node::Scalar(Value::Tagged(t)) => format!("a value tagged {}", t.tag),
            Node::Scalar(_) => "a scalar".to_string(),
        }
    }

    /// Label for a map key in error messages; strings are shown bare
    pub fn label(&self) -> String {
        match self {
            Node::String(s) => s.clone(),
            other => other.describe(),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::String(s) => serializer.serialize_str(s),
            Node::Map(m) => m.serialize(serializer),
            Node::Sequence(items) => serializer.collect_seq(items),
            Node::Scalar(v) => v.serialize(serializer),
        }
    }
}

/// Writes every entry, duplicates included, in order
impl Serialize for OrderedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

/// Builds [`Node`]s straight from the YAML event stream. Going through
/// `serde_yaml::Mapping` would reject repeated keys, so maps are collected
/// entry by entry instead.
struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Bool(b)))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Number(n.into())))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Number(n.into())))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Number(n.into())))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Node, E> {
        Ok(Node::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Node, E> {
        Ok(Node::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Node, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Node, A::Error> {
        let mut entries = OrderedMap::new();
        while let Some((key, value)) = map.next_entry::<Node, Node>()? {
            entries.push(key, value);
        }
        Ok(Node::Map(entries))
    }

    // serde_yaml hands tagged nodes (`!foo bar`) over as enums
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> std::result::Result<Node, A::Error> {
        let (tag, contents): (String, A::Variant) = data.variant()?;
        let value: Value = contents.newtype_variant()?;
        Ok(Node::Scalar(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        }))))
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<OrderedMap> for Node {
    fn from(m: OrderedMap) -> Self {
        Node::Map(m)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Scalar(Value::Number(n.into()))
    }
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Duplicate keys are not rejected.
    pub fn push(&mut self, key: impl Into<Node>, value: impl Into<Node>) {
        self.entries.push(Entry {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Builder-style [`push`](Self::push)
    pub fn with(mut self, key: impl Into<Node>, value: impl Into<Node>) -> Self {
        self.push(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// Index of the first entry whose key is the string `key`
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.key.as_str() == Some(key))
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|idx| &self.entries[idx].value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        let idx = self.position(key)?;
        Some(&mut self.entries[idx].value)
    }

    /// Keys in document order, with non-string keys labelled
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.key.label())
    }

}

/// Parse a YAML document whose root is a mapping.
///
/// An empty document parses as an empty mapping. Repeated keys are kept as
/// separate entries. Input holding more than one document (`---`) is a
/// `Parse` error: the file is rewritten in place, and keeping only the first
/// document would silently drop the rest.
pub fn parse(bytes: &[u8]) -> Result<OrderedMap> {
    let node: Node =
        serde_yaml::from_slice(bytes).map_err(|e| SecretError::Parse(e.to_string()))?;

    match node {
        Node::Map(m) => Ok(m),
        Node::Scalar(Value::Null) => Ok(OrderedMap::new()),
        other => Err(SecretError::Parse(format!(
            "document root is {}, expected a mapping",
            other.describe()
        ))),
    }
}

/// Render a document back to YAML, keeping entry order
pub fn render(document: &OrderedMap) -> Result<Vec<u8>> {
    serde_yaml::to_string(document)
        .map(String::into_bytes)
        .map_err(SecretError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let doc = parse(b"zeta: 1\nalpha: two\nmid: [a, b]\n").unwrap();
        let keys: Vec<String> = doc.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(doc.get("alpha"), Some(&Node::from("two")));
        assert!(matches!(doc.get("mid"), Some(Node::Sequence(items)) if items.len() == 2));
    }

    #[test]
    fn test_position() {
        let doc = OrderedMap::new()
            .with("key2", "value2")
            .with("keyX", "boop")
            .with("key1", "value1");

        assert_eq!(doc.position("key1"), Some(2));
        assert_eq!(doc.position("key2"), Some(0));
        assert_eq!(doc.position("dne"), None);
    }

    #[test]
    fn test_non_string_keys_are_not_matched_by_name() {
        let doc = parse(b"1: one\n\"1\": string-one\n").unwrap();
        assert_eq!(doc.position("1"), Some(1));
    }

    #[test]
    fn test_render_round_trip_keeps_layout() {
        let input = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\n  namespace: prod\ntype: Opaque\ndata:\n  zz: YQ==\n  aa: Yg==\n";
        let doc = parse(input.as_bytes()).unwrap();
        let out = String::from_utf8(render(&doc).unwrap()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_parse_rejects_invalid_yaml() {
        let err = parse(b"kind: [unterminated\n").unwrap_err();
        assert!(matches!(err, SecretError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_non_mapping_root() {
        let err = parse(b"- just\n- a list\n").unwrap_err();
        match err {
            SecretError::Parse(msg) => assert!(msg.contains("expected a mapping")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_keeps_repeated_keys() {
        let doc = OrderedMap::new()
            .with("kind", "Secret")
            .with("a", "1")
            .with("a", "2");
        assert_eq!(doc.len(), 3);

        let out = String::from_utf8(render(&doc).unwrap()).unwrap();
        assert_eq!(out, "kind: Secret\na: '1'\na: '2'\n");
    }

    #[test]
    fn test_parse_keeps_repeated_keys() {
        let input = "kind: Secret\ndata:\n  user: cm9vdA==\n  user: czNjcjN0\n";
        let doc = parse(input.as_bytes()).unwrap();

        let data = match doc.get("data") {
            Some(Node::Map(m)) => m,
            other => panic!("unexpected data: {other:?}"),
        };
        let values: Vec<&str> = data.entries().iter().filter_map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["cm9vdA==", "czNjcjN0"]);

        let out = String::from_utf8(render(&doc).unwrap()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_scalars_and_tags_round_trip() {
        let input = "a: null\nb: true\nc: 1.5\nd: -3\ne: !custom value\nf:\n- x\n- 2\n";
        let doc = parse(input.as_bytes()).unwrap();
        assert!(matches!(doc.get("e"), Some(Node::Scalar(Value::Tagged(_)))));

        let out = String::from_utf8(render(&doc).unwrap()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_parse_rejects_multiple_documents() {
        let err = parse(b"kind: Secret\ndata:\n  a: YQ==\n---\nkind: ConfigMap\n").unwrap_err();
        match err {
            SecretError::Parse(msg) => assert!(msg.contains("more than one document")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_get_mut_replaces_value_in_place() {
        let mut doc = OrderedMap::new().with("a", "1").with("b", "2");
        *doc.get_mut("a").unwrap() = Node::from("changed");
        let keys: Vec<String> = doc.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(doc.get("a").and_then(Node::as_str), Some("changed"));
    }
}
