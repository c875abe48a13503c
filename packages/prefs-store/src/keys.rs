//! Key type - the identifier of one entry in a store.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors related to key validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,
    #[error("invalid key {key:?}: {message}")]
    Invalid { key: String, message: String },
}

/// A validated store key.
///
/// Keys are opaque strings to the store, but a key must contain at least one
/// non-whitespace character and no control characters. Two keys are the same
/// entry exactly when their strings are equal.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Parse and validate a key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prefs_store::Key;
    ///
    /// let key = Key::parse("theme").unwrap();
    /// assert_eq!(key.as_str(), "theme");
    ///
    /// assert!(Key::parse("").is_err());
    /// assert!(Key::parse("   ").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        if s.is_empty() {
            return Err(KeyError::Empty);
        }

        if s.trim().is_empty() {
            return Err(KeyError::Invalid {
                key: s.to_string(),
                message: "key is only whitespace".to_string(),
            });
        }

        if let Some(c) = s.chars().find(|c| c.is_control()) {
            return Err(KeyError::Invalid {
                key: s.to_string(),
                message: format!("control character {:?}", c),
            });
        }

        Ok(Key(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Key {
    type Error = KeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Key::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Key::parse(&s)
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Key, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;

        Key::parse(&s).map_err(D::Error::custom)
    }
}

/// Build a [`Key`] from a literal, panicking if it is invalid.
#[macro_export]
macro_rules! key {
    ($s:expr) => {
        $crate::Key::parse($s).expect("invalid key literal")
    };
}
