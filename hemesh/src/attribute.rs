//! Named attributes of vertices, edges, and faces.
//!
//! Each entity may carry an [`Attributes`] map of explicit values. A mesh also
//! keeps one map of default values per entity kind. Reading an attribute
//! consults the explicit values of the entity first and falls back to the
//! defaults. Writing an attribute always writes an explicit value, and unsetting
//! an attribute only removes the explicit value.
//!
//! Defaults are never copied into entities: changing a default changes the
//! effective value of every entity that lacks an explicit value.
//!
//! [`Layered`] and [`LayeredMut`] expose this layering through the
//! [`AttributeView`] and [`AttributeViewMut`] traits.

use serde::ser;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::FromIterator;

/// Attribute value.
///
/// Values map directly onto JSON primitives and arrays. Floats that are NaN or
/// infinite have no such representation and fail to serialize.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Gets the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(value) => Some(value as f64),
            Value::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Value::Float(value) => Err(ser::Error::custom(format!("non-finite float {}", value))),
            Value::Text(value) => serializer.serialize_str(value),
            Value::List(values) => values.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_integer {
    (lossless => $($t:ty),*$(,)?) => (
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    );
    (saturating => $($t:ty),*$(,)?) => (
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
                }
            }
        )*
    );
}
impl_from_integer!(lossless => i8, i16, i32, i64, u8, u16, u32);
impl_from_integer!(saturating => u64, usize);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Map of attribute names to values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert<S, T>(&mut self, name: S, value: T) -> Option<Value>
    where
        S: Into<String>,
        T: Into<Value>,
    {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Writes all values of `other` into this map, replacing values with the
    /// same names.
    pub fn merge(&mut self, other: Attributes) {
        self.values.extend(other.values);
    }

    pub fn names(&self) -> impl '_ + Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<S, T> FromIterator<(S, T)> for Attributes
where
    S: Into<String>,
    T: Into<Value>,
{
    fn from_iter<I>(input: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
    {
        Attributes {
            values: input
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Constructs [`Attributes`] from `name => value` pairs.
///
/// # Examples
///
/// ```rust
/// use hemesh::attributes;
///
/// let attributes = attributes! { "x" => 1.0, "label" => "corner" };
/// assert_eq!(2, attributes.len());
/// ```
#[macro_export]
macro_rules! attributes {
    () => ($crate::Attributes::new());
    ($($name:expr => $value:expr),+$(,)?) => ({
        let mut attributes = $crate::Attributes::new();
        $(
            attributes.insert($name, $value);
        )+
        attributes
    });
}

/// Read access to the effective attributes of an entity.
pub trait AttributeView {
    /// Gets the effective value of an attribute.
    fn get(&self, name: &str) -> Option<&Value>;

    /// Gets the names of all effective attributes in order.
    fn names(&self) -> Vec<&str>;

    /// Collects all effective attributes.
    fn to_attributes(&self) -> Attributes {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name).map(|value| (name, value.clone())))
            .collect()
    }
}

/// Write access to the explicit attributes of an entity.
pub trait AttributeViewMut: AttributeView {
    /// Writes an explicit value, returning the previous explicit value.
    fn set(&mut self, name: &str, value: Value) -> Option<Value>;

    /// Removes an explicit value. Subsequent reads fall back to the defaults.
    fn unset(&mut self, name: &str) -> Option<Value>;
}

/// Explicit attributes layered over defaults.
#[derive(Clone, Copy, Debug)]
pub struct Layered<'a> {
    defaults: &'a Attributes,
    explicit: Option<&'a Attributes>,
}

impl<'a> Layered<'a> {
    pub fn new(defaults: &'a Attributes, explicit: Option<&'a Attributes>) -> Self {
        Layered { defaults, explicit }
    }
}

impl<'a> AttributeView for Layered<'a> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.explicit
            .and_then(|explicit| explicit.get(name))
            .or_else(|| self.defaults.get(name))
    }

    fn names(&self) -> Vec<&str> {
        layered_names(self.defaults, self.explicit)
    }
}

/// Mutable explicit attributes layered over defaults.
#[derive(Debug)]
pub struct LayeredMut<'a> {
    defaults: &'a Attributes,
    explicit: &'a mut Attributes,
}

impl<'a> LayeredMut<'a> {
    pub fn new(defaults: &'a Attributes, explicit: &'a mut Attributes) -> Self {
        LayeredMut { defaults, explicit }
    }
}

impl<'a> AttributeView for LayeredMut<'a> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.explicit.get(name).or_else(|| self.defaults.get(name))
    }

    fn names(&self) -> Vec<&str> {
        layered_names(self.defaults, Some(&*self.explicit))
    }
}

impl<'a> AttributeViewMut for LayeredMut<'a> {
    fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.explicit.insert(name, value)
    }

    fn unset(&mut self, name: &str) -> Option<Value> {
        self.explicit.remove(name)
    }
}

fn layered_names<'a>(defaults: &'a Attributes, explicit: Option<&'a Attributes>) -> Vec<&'a str> {
    let mut names = defaults.names().collect::<Vec<_>>();
    if let Some(explicit) = explicit {
        names.extend(explicit.names().filter(|name| !defaults.contains(name)));
    }
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use crate::attribute::{AttributeView, AttributeViewMut, Attributes, Layered, LayeredMut, Value};

    #[test]
    fn explicit_shadows_default() {
        let defaults = attributes! { "weight" => 1.0, "fixed" => false };
        let explicit = attributes! { "weight" => 2.0 };
        let view = Layered::new(&defaults, Some(&explicit));

        assert_eq!(Some(&Value::Float(2.0)), view.get("weight"));
        assert_eq!(Some(&Value::Bool(false)), view.get("fixed"));
        assert_eq!(None, view.get("missing"));
        assert_eq!(vec!["fixed", "weight"], view.names());
    }

    #[test]
    fn unset_falls_back_to_default() {
        let defaults = attributes! { "weight" => 1.0 };
        let mut explicit = Attributes::new();
        let mut view = LayeredMut::new(&defaults, &mut explicit);

        assert_eq!(None, view.set("weight", Value::Float(3.0)));
        assert_eq!(Some(&Value::Float(3.0)), view.get("weight"));
        assert_eq!(Some(Value::Float(3.0)), view.unset("weight"));
        assert_eq!(Some(&Value::Float(1.0)), view.get("weight"));
        // Unsetting without an explicit value is not an error.
        assert_eq!(None, view.unset("weight"));
        assert!(explicit.is_empty());
    }

    #[test]
    fn wide_integers_saturate() {
        assert_eq!(Value::Int(i64::MAX), Value::from(usize::MAX));
        assert_eq!(Value::Int(i64::MAX), Value::from(u64::MAX));
        assert_eq!(Value::Int(7), Value::from(7usize));
        assert_eq!(Value::Int(-3), Value::from(-3i8));
        assert_eq!(Value::Int(i64::from(u32::MAX)), Value::from(u32::MAX));
    }

    #[test]
    fn non_finite_floats_are_not_serialized() {
        assert!(serde_json::to_string(&Value::from(f64::NAN)).is_err());
        assert!(serde_json::to_string(&Value::from(vec![1.0, f64::INFINITY])).is_err());
        assert!(serde_json::to_string(&attributes! { "w" => f64::NEG_INFINITY }).is_err());
        assert_eq!("1.5", serde_json::to_string(&Value::from(1.5)).unwrap());
    }

    #[test]
    fn values_round_trip_through_json() {
        let attributes = attributes! {
            "flag" => true,
            "count" => 3,
            "weight" => 0.5,
            "label" => "a",
            "tags" => vec![1, 2],
        };
        let text = serde_json::to_string(&attributes).unwrap();
        let decoded: Attributes = serde_json::from_str(&text).unwrap();
        assert_eq!(attributes, decoded);
        assert_eq!(Some(3), decoded.get("count").and_then(Value::as_i64));
        assert_eq!(Some(0.5), decoded.get("weight").and_then(Value::as_f64));
    }
}
