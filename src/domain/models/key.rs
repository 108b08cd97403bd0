//! Invocation keys: the identity of "the same call" for caching.
//!
//! A key is built from an operation's positional arguments and its named
//! arguments. Named arguments are stored sorted by name, so the order in
//! which a caller supplies them never changes the key.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::key_serializer::KeyPartSerializer;
use crate::domain::errors::KeyError;

/// One hashable argument value.
///
/// Floats are compared by bit pattern, so `0.0` and `-0.0` are different
/// keys, infinities are distinct from each other and from `NaN`, and a
/// `NaN` matches a later `NaN` with the same payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Unit,
    Bool(bool),
    Int(i64),
    /// Only used for values above `i64::MAX`.
    UInt(u64),
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    /// An `Option`; `Some(None)` and `None` are different parts.
    Opt(Option<Box<KeyPart>>),
    /// An enum variant by name, with its payload (`Unit` for unit variants).
    Variant(String, Box<KeyPart>),
    Seq(Vec<KeyPart>),
    /// Sorted by name.
    Map(Vec<(String, KeyPart)>),
}

impl KeyPart {
    /// Convert any serializable value into a key part.
    ///
    /// `argument` names the argument in the error if conversion fails.
    pub fn from_serialize<T>(value: &T, argument: &str) -> Result<Self, KeyError>
    where
        T: Serialize + ?Sized,
    {
        value
            .serialize(KeyPartSerializer)
            .map_err(|source| KeyError::Unserializable {
                argument: argument.to_string(),
                source,
            })
    }

    pub fn float(value: f64) -> Self {
        Self::Float(value.to_bits())
    }

    pub fn variant(name: impl Into<String>, payload: Self) -> Self {
        Self::Variant(name.into(), Box::new(payload))
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyPart {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for KeyPart {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(bytes) => write!(f, "b{bytes:?}"),
            Self::Opt(None) => f.write_str("None"),
            Self::Opt(Some(inner)) => write!(f, "Some({inner})"),
            Self::Variant(name, payload) => match payload.as_ref() {
                Self::Unit => f.write_str(name),
                Self::Seq(_) | Self::Map(_) => write!(f, "{name}{payload}"),
                other => write!(f, "{name}({other})"),
            },
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Deterministic identity of one call: positional arguments plus named
/// arguments sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InvocationKey {
    positional: Vec<KeyPart>,
    named: Vec<(String, KeyPart)>,
}

impl InvocationKey {
    /// Build a key from already converted parts.
    ///
    /// Named arguments are sorted; if a name repeats, the last value wins.
    pub fn new<I, S>(positional: Vec<KeyPart>, named: I) -> Self
    where
        I: IntoIterator<Item = (S, KeyPart)>,
        S: Into<String>,
    {
        let named: BTreeMap<String, KeyPart> =
            named.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            positional,
            named: named.into_iter().collect(),
        }
    }

    pub fn builder() -> InvocationKeyBuilder {
        InvocationKeyBuilder::default()
    }

    /// Default key derivation from a serializable argument value.
    ///
    /// A tuple or sequence becomes the positional arguments, a struct or
    /// string-keyed map becomes the named arguments, `()` is a call with no
    /// arguments and any other value, `Option`s and enums included, is a
    /// single positional argument.
    pub fn derive<T>(args: &T) -> Result<Self, KeyError>
    where
        T: Serialize + ?Sized,
    {
        let key = match KeyPart::from_serialize(args, "args")? {
            KeyPart::Unit => Self::default(),
            KeyPart::Seq(items) => Self {
                positional: items,
                named: Vec::new(),
            },
            KeyPart::Map(entries) => Self {
                positional: Vec::new(),
                named: entries,
            },
            single => Self {
                positional: vec![single],
                named: Vec::new(),
            },
        };
        Ok(key)
    }

    pub fn positional(&self) -> &[KeyPart] {
        &self.positional
    }

    /// Named arguments, sorted by name.
    pub fn named(&self) -> &[(String, KeyPart)] {
        &self.named
    }

    pub fn named_value(&self, name: &str) -> Option<&KeyPart> {
        self.named
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|idx| &self.named[idx].1)
    }

    /// True when the positional arguments equal `expected`.
    pub fn positional_eq<T>(&self, expected: &[T]) -> bool
    where
        T: Clone + Into<KeyPart>,
    {
        self.positional.len() == expected.len()
            && self
                .positional
                .iter()
                .zip(expected)
                .all(|(part, want)| *part == want.clone().into())
    }
}

impl fmt::Display for InvocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let mut first = true;
        for part in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{part}")?;
        }
        for (name, part) in &self.named {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={part}")?;
        }
        f.write_str(")")
    }
}

/// Incremental key construction for operations with mixed positional and
/// named arguments. The first argument that fails to convert is reported
/// by `build`.
#[derive(Debug, Default)]
pub struct InvocationKeyBuilder {
    positional: Vec<KeyPart>,
    named: Vec<(String, KeyPart)>,
    error: Option<KeyError>,
}

impl InvocationKeyBuilder {
    #[must_use]
    pub fn arg<T>(mut self, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        if self.error.is_none() {
            let label = format!("#{}", self.positional.len());
            match KeyPart::from_serialize(value, &label) {
                Ok(part) => self.positional.push(part),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    #[must_use]
    pub fn named<T>(mut self, name: impl Into<String>, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        if self.error.is_none() {
            let name = name.into();
            match KeyPart::from_serialize(value, &format!("`{name}`")) {
                Ok(part) => self.named.push((name, part)),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub fn build(self) -> Result<InvocationKey, KeyError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(InvocationKey::new(self.positional, self.named)),
        }
    }
}
