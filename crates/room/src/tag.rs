//! Type tags for data objects.
//!
//! Every [`DataObject`](crate::DataObject) carries one of nine tags. A tag has
//! two stable encodings that must never change:
//!
//! ```text
//! ordinal  name
//! 0        STRING
//! 1        CHARACTER
//! 2        BYTE
//! 3        SHORT
//! 4        INTEGER
//! 5        LONG
//! 6        FLOAT
//! 7        DOUBLE
//! 8        BOOLEAN
//! ```
//!
//! The current file format writes the name; the ordinal drives the numeric
//! compatibility groups used by the typed accessors.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Closed set of primitive kinds a data object value can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    String = 0,
    Character = 1,
    Byte = 2,
    Short = 3,
    Integer = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    Boolean = 8,
}

/// Returned by [`TypeTag::from_str`] when the name is not one of the nine tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type tag `{0}`")]
pub struct UnknownTag(pub String);

impl TypeTag {
    /// All tags in ordinal order.
    pub const ALL: [TypeTag; 9] = [
        TypeTag::String,
        TypeTag::Character,
        TypeTag::Byte,
        TypeTag::Short,
        TypeTag::Integer,
        TypeTag::Long,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::Boolean,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<TypeTag> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// The textual tag written into files.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::String => "STRING",
            TypeTag::Character => "CHARACTER",
            TypeTag::Byte => "BYTE",
            TypeTag::Short => "SHORT",
            TypeTag::Integer => "INTEGER",
            TypeTag::Long => "LONG",
            TypeTag::Float => "FLOAT",
            TypeTag::Double => "DOUBLE",
            TypeTag::Boolean => "BOOLEAN",
        }
    }

    /// Returns `true` if this tag's ordinal lies in `[from, to]` (inclusive).
    pub fn within(self, from: TypeTag, to: TypeTag) -> bool {
        (from.ordinal()..=to.ordinal()).contains(&self.ordinal())
    }

    pub fn is_integral(self) -> bool {
        self.within(TypeTag::Byte, TypeTag::Long)
    }

    pub fn is_decimal(self) -> bool {
        self.within(TypeTag::Float, TypeTag::Double)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeTag {
    type Err = UnknownTag;

    /// Exact, case-sensitive match on the tag name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}
