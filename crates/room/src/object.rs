//! Data objects and typed access to their text values.
//!
//! A [`DataObject`] stores its value as text regardless of its tag; parsing
//! into a native type happens only when one of the typed accessors is called.
//! Accessors accept a tag when its ordinal falls inside the accessor's group:
//!
//! - integral accessors (`i8`, `i16`, `i32`, `i64`): `BYTE..=LONG`
//! - decimal accessors (`f32`, `f64`): `BYTE..=DOUBLE`
//! - boolean accessor: `BOOLEAN` only
//!
//! Asking an integral accessor for a `FLOAT`/`DOUBLE` value yields
//! [`AccessError::DecimalNotIntegral`]; every other out-of-group request
//! yields [`AccessError::TypeMismatch`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::tag::TypeTag;

/// A single key / tag / text-value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    key: String,
    tag: TypeTag,
    value: String,
}

/// Errors raised by the typed accessors. They are local to the call and never
/// modify the object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("`{key}` holds a {actual} value, which cannot be read as {requested}")]
    TypeMismatch {
        key: String,
        actual: TypeTag,
        requested: &'static str,
    },
    #[error("`{key}` holds the decimal number `{value}`, which cannot be read as {requested}")]
    DecimalNotIntegral {
        key: String,
        value: String,
        requested: &'static str,
    },
    #[error("`{key}` holds `{value}`, which is not a valid {requested}")]
    MalformedNumber {
        key: String,
        value: String,
        requested: &'static str,
    },
    #[error("`{key}` holds `{value}`, which is not `true` or `false`")]
    MalformedBoolean { key: String, value: String },
    #[error("`{key}` holds an empty value, which cannot be read as a character")]
    EmptyCharacter { key: String },
}

impl DataObject {
    pub fn new(key: impl Into<String>, tag: TypeTag, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag,
            value: value.into(),
        }
    }

    /// Builds an object from any value that knows its own tag.
    pub fn from_value<V: ToValue + ?Sized>(key: impl Into<String>, value: &V) -> Self {
        Self::new(key, value.tag(), value.to_text())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The raw stored text. Valid for every tag.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// First character of the stored text, whatever the tag.
    pub fn as_char(&self) -> Result<char, AccessError> {
        self.value
            .chars()
            .next()
            .ok_or_else(|| AccessError::EmptyCharacter {
                key: self.key.clone(),
            })
    }

    pub fn as_i8(&self) -> Result<i8, AccessError> {
        self.integral("byte")
    }

    pub fn as_i16(&self) -> Result<i16, AccessError> {
        self.integral("short")
    }

    pub fn as_i32(&self) -> Result<i32, AccessError> {
        self.integral("integer")
    }

    pub fn as_i64(&self) -> Result<i64, AccessError> {
        self.integral("long")
    }

    pub fn as_f32(&self) -> Result<f32, AccessError> {
        self.decimal("float")
    }

    pub fn as_f64(&self) -> Result<f64, AccessError> {
        self.decimal("double")
    }

    /// Parses `true`/`false`, ignoring ASCII case.
    pub fn as_bool(&self) -> Result<bool, AccessError> {
        if self.tag != TypeTag::Boolean {
            return Err(self.mismatch("boolean"));
        }
        if self.value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if self.value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(AccessError::MalformedBoolean {
                key: self.key.clone(),
                value: self.value.clone(),
            })
        }
    }

    fn integral<T: FromStr>(&self, requested: &'static str) -> Result<T, AccessError> {
        if self.tag.is_integral() {
            return self.parse(requested, self.value.trim());
        }
        if self.tag.is_decimal() {
            return Err(AccessError::DecimalNotIntegral {
                key: self.key.clone(),
                value: self.value.clone(),
                requested,
            });
        }
        Err(self.mismatch(requested))
    }

    fn decimal<T: FromStr>(&self, requested: &'static str) -> Result<T, AccessError> {
        if self.tag.within(TypeTag::Byte, TypeTag::Double) {
            return self.parse(requested, self.value.trim());
        }
        Err(self.mismatch(requested))
    }

    fn parse<T: FromStr>(&self, requested: &'static str, text: &str) -> Result<T, AccessError> {
        text.parse().map_err(|_| AccessError::MalformedNumber {
            key: self.key.clone(),
            value: self.value.clone(),
            requested,
        })
    }

    fn mismatch(&self, requested: &'static str) -> AccessError {
        AccessError::TypeMismatch {
            key: self.key.clone(),
            actual: self.tag,
            requested,
        }
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] = {}", self.key, self.tag, self.value)
    }
}

/// A native value that can be stored in a data object.
pub trait ToValue {
    fn tag(&self) -> TypeTag;
    fn to_text(&self) -> String;
}

/// A native value that can be read back out of a data object.
pub trait FromValue: Sized {
    fn from_object(object: &DataObject) -> Result<Self, AccessError>;
}

impl ToValue for str {
    fn tag(&self) -> TypeTag {
        TypeTag::String
    }

    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl ToValue for String {
    fn tag(&self) -> TypeTag {
        TypeTag::String
    }

    fn to_text(&self) -> String {
        self.clone()
    }
}

impl<V: ToValue + ?Sized> ToValue for &V {
    fn tag(&self) -> TypeTag {
        (**self).tag()
    }

    fn to_text(&self) -> String {
        (**self).to_text()
    }
}

impl FromValue for String {
    fn from_object(object: &DataObject) -> Result<Self, AccessError> {
        Ok(object.value().to_string())
    }
}

impl ToValue for char {
    fn tag(&self) -> TypeTag {
        TypeTag::Character
    }

    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl FromValue for char {
    fn from_object(object: &DataObject) -> Result<Self, AccessError> {
        object.as_char()
    }
}

impl ToValue for bool {
    fn tag(&self) -> TypeTag {
        TypeTag::Boolean
    }

    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl FromValue for bool {
    fn from_object(object: &DataObject) -> Result<Self, AccessError> {
        object.as_bool()
    }
}

macro_rules! integral_value {
    ($ty:ty, $tag:expr, $getter:ident) => {
        impl ToValue for $ty {
            fn tag(&self) -> TypeTag {
                $tag
            }

            fn to_text(&self) -> String {
                self.to_string()
            }
        }

        impl FromValue for $ty {
            fn from_object(object: &DataObject) -> Result<Self, AccessError> {
                object.$getter()
            }
        }
    };
}

integral_value!(i8, TypeTag::Byte, as_i8);
integral_value!(i16, TypeTag::Short, as_i16);
integral_value!(i32, TypeTag::Integer, as_i32);
integral_value!(i64, TypeTag::Long, as_i64);

macro_rules! decimal_value {
    ($ty:ty, $tag:expr, $getter:ident) => {
        impl ToValue for $ty {
            fn tag(&self) -> TypeTag {
                $tag
            }

            // Non-finite spellings match what other readers of the format expect.
            fn to_text(&self) -> String {
                if self.is_nan() {
                    "NaN".to_string()
                } else if self.is_infinite() {
                    if self.is_sign_negative() {
                        "-Infinity".to_string()
                    } else {
                        "Infinity".to_string()
                    }
                } else {
                    format!("{:?}", self)
                }
            }
        }

        impl FromValue for $ty {
            fn from_object(object: &DataObject) -> Result<Self, AccessError> {
                object.$getter()
            }
        }
    };
}

decimal_value!(f32, TypeTag::Float, as_f32);
decimal_value!(f64, TypeTag::Double, as_f64);
