//! Identifier management using string interning for efficient string storage and comparison
//!
//! This module provides the [`Id`] type used for shape ids and shape-type tags.
//! Ids are `Copy`, hash by their interned symbol, and order by their string
//! value so that sorted output is stable regardless of interning order.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for efficient identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Efficient identifier type using string interning
///
/// # Examples
///
/// ```
/// use tangram_core::identifier::Id;
///
/// let rect_id = Id::new("rect_1");
/// let line_id: Id = "line_1".into();
///
/// assert_eq!(rect_id, "rect_1");
/// assert!(line_id < rect_id);
///
/// // Anonymous identifiers for generated shapes
/// let anon_id = Id::from_anonymous(0);
/// assert_eq!(anon_id.to_string(), "__0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from &str.
    ///
    /// # Arguments
    ///
    /// * `name` - The string representation of the identifier
    pub fn new(name: &str) -> Self {
        let symbol = interner().get_or_intern(name);
        Self(symbol)
    }

    /// Creates an internal `Id` identifier from a numeric index.
    ///
    /// # Arguments
    ///
    /// * `idx` - A unique index used to generate the anonymous identifier.
    pub fn from_anonymous(idx: usize) -> Self {
        let name = format!("__{idx}");
        Self::new(&name)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{}", str_value)
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    /// Orders identifiers by their string value.
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        let interner = interner();
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        let other_str = interner
            .resolve(other.0)
            .expect("Symbol should exist in interner");
        self_str.cmp(other_str)
    }
}

impl std::str::FromStr for Id {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    /// Creates an `Id` from a string slice
    ///
    /// This is a convenience implementation that calls `Id::new`.
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        let interner = interner();
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for Id {
    /// Allows direct comparison with string references: `id == &string`
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_interns_to_same_id() {
        let a = Id::new("shape_a");
        let b = Id::new("shape_a");
        let c = Id::new("shape_c");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_and_comparison_with_str() {
        let id = Id::new("board_root");
        assert_eq!(id.to_string(), "board_root");
        assert!(id == "board_root");
        assert!(id == &"board_root");
        assert!(id != "board");
    }

    #[test]
    fn test_ordering_follows_string_value() {
        // Intern in reverse order so symbol order and string order disagree.
        let z = Id::new("zz_ordering");
        let a = Id::new("aa_ordering");

        assert!(a < z);
        assert_eq!(a.cmp(&a), Ordering::Equal);

        let mut ids = vec![z, a];
        ids.sort();
        assert_eq!(ids, vec![a, z]);
    }

    #[test]
    fn test_from_anonymous() {
        let id = Id::from_anonymous(42);
        assert_eq!(id, "__42");
    }

    #[test]
    fn test_from_str() {
        let id: Id = "parsed".parse().expect("infallible");
        assert_eq!(id, "parsed");
    }
}
