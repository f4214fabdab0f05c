//! Keys for mesh storage.
//!
//! Vertices and faces are identified by integer keys. Keys are either chosen by
//! the caller or allocated by a [`KeyCounter`], which never issues a key that
//! is less than or equal to any key it has observed. Keys are not reused after
//! the entity they identify is deleted.
//!
//! Edges are undirected and are identified by an [`EdgeKey`], which normalizes
//! the order of its vertices. Edge keys are only used to look up edge
//! attributes; the topology of edges is stored as half-edges between vertices.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VertexKey(usize);

impl VertexKey {
    pub fn new(key: usize) -> Self {
        VertexKey(key)
    }

    pub fn into_inner(self) -> usize {
        self.0
    }
}

impl Display for VertexKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<usize> for VertexKey {
    fn from(key: usize) -> Self {
        VertexKey(key)
    }
}

impl From<VertexKey> for usize {
    fn from(key: VertexKey) -> Self {
        key.0
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FaceKey(usize);

impl FaceKey {
    pub fn new(key: usize) -> Self {
        FaceKey(key)
    }

    pub fn into_inner(self) -> usize {
        self.0
    }
}

impl Display for FaceKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<usize> for FaceKey {
    fn from(key: usize) -> Self {
        FaceKey(key)
    }
}

impl From<FaceKey> for usize {
    fn from(key: FaceKey) -> Self {
        key.0
    }
}

/// Undirected edge key.
///
/// The vertices of an edge key are always ordered, so the keys for $(u,v)$ and
/// $(v,u)$ compare equal. Edge keys serialize as the string `"u-v"`, which
/// allows them to be used as keys of JSON objects.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EdgeKey(VertexKey, VertexKey);

impl EdgeKey {
    pub fn new(u: VertexKey, v: VertexKey) -> Self {
        if u <= v {
            EdgeKey(u, v)
        }
        else {
            EdgeKey(v, u)
        }
    }

    pub fn vertices(&self) -> (VertexKey, VertexKey) {
        (self.0, self.1)
    }
}

impl Display for EdgeKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}-{}", self.0, self.1)
    }
}

impl From<(VertexKey, VertexKey)> for EdgeKey {
    fn from((u, v): (VertexKey, VertexKey)) -> Self {
        EdgeKey::new(u, v)
    }
}

impl FromStr for EdgeKey {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (u, v) = text
            .split_once('-')
            .ok_or_else(|| format!("malformed edge key `{}`", text))?;
        let parse = |key: &str| {
            key.trim()
                .parse::<usize>()
                .map(VertexKey)
                .map_err(|_| format!("malformed edge key `{}`", text))
        };
        Ok(EdgeKey::new(parse(u)?, parse(v)?))
    }
}

impl Serialize for EdgeKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EdgeKeyVisitor;

        impl<'de> Visitor<'de> for EdgeKeyVisitor {
            type Value = EdgeKey;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("an edge key of the form `u-v`")
            }

            fn visit_str<E>(self, text: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                text.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(EdgeKeyVisitor)
    }
}

/// Monotonic key allocator.
///
/// Tracks the greatest key issued or observed so far. Allocation always
/// produces a key greater than every observed key, including keys that were
/// chosen explicitly by callers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeyCounter {
    max: Option<usize>,
}

impl KeyCounter {
    /// Restores a counter from its persisted form, where `-1` (or any
    /// negative value) means that no key has been issued.
    pub fn from_persisted(max: i64) -> Self {
        KeyCounter {
            max: usize::try_from(max).ok(),
        }
    }

    /// Gets the persisted form of the counter. Keys beyond `i64::MAX`
    /// saturate.
    pub fn to_persisted(self) -> i64 {
        self.max
            .map_or(-1, |max| i64::try_from(max).unwrap_or(i64::MAX))
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Issues the next key.
    pub fn allocate(&mut self) -> usize {
        let key = self.max.map_or(0, |max| max + 1);
        self.max = Some(key);
        key
    }

    /// Advances the counter past an explicitly chosen key.
    pub fn observe(&mut self, key: usize) {
        if self.max.map_or(true, |max| key > max) {
            self.max = Some(key);
        }
    }

    /// Takes the greater of two counters.
    pub fn merge(&mut self, other: KeyCounter) {
        if let Some(max) = other.max {
            self.observe(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::key::{EdgeKey, KeyCounter, VertexKey};

    #[test]
    fn edge_key_is_undirected() {
        let (u, v) = (VertexKey::new(3), VertexKey::new(1));
        assert_eq!(EdgeKey::new(u, v), EdgeKey::new(v, u));
        assert_eq!((v, u), EdgeKey::new(u, v).vertices());
    }

    #[test]
    fn edge_key_text() {
        let key = EdgeKey::new(VertexKey::new(12), VertexKey::new(4));
        assert_eq!("4-12", key.to_string());
        assert_eq!(Ok(key), "12-4".parse::<EdgeKey>());
        assert!("12".parse::<EdgeKey>().is_err());
        assert!("a-b".parse::<EdgeKey>().is_err());
    }

    #[test]
    fn counter_observes_explicit_keys() {
        let mut counter = KeyCounter::default();
        assert_eq!(0, counter.allocate());
        counter.observe(10);
        assert_eq!(11, counter.allocate());
        counter.observe(5);
        assert_eq!(12, counter.allocate());
    }

    #[test]
    fn counter_persistence() {
        assert_eq!(-1, KeyCounter::default().to_persisted());
        let mut counter = KeyCounter::from_persisted(-1);
        assert_eq!(0, counter.allocate());
        let mut counter = KeyCounter::from_persisted(41);
        assert_eq!(42, counter.allocate());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn counter_persistence_saturates() {
        let mut counter = KeyCounter::default();
        counter.observe(usize::MAX);
        assert_eq!(i64::MAX, counter.to_persisted());
        counter = KeyCounter::default();
        counter.observe(1 << 40);
        assert_eq!(1 << 40, counter.to_persisted());
    }
}
