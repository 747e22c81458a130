//! Typed hint values and their `(type, text)` row encoding.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Hint names the daemon interprets itself.
pub mod keys {
    pub const CATEGORY: &str = "category";
    pub const PERSISTENT: &str = "persistent";
    pub const NO_NOTIFICATION_WINDOW: &str = "no-notification-window";
    pub const AMOUNT: &str = "amount";
    pub const LED_PATTERN: &str = "led-pattern";
    pub const DIALOG_TYPE: &str = "dialog-type";
    pub const DBUS_CALLBACK_PREFIX: &str = "dbus-callback-";
}

/// Hints keyed by name; keys are unique.
pub type Hints = BTreeMap<String, TypedValue>;

/// A hint value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    None,
    String(String),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Byte(u8),
}

impl TypedValue {
    pub fn hint_type(&self) -> HintType {
        match self {
            Self::None => HintType::None,
            Self::String(_) => HintType::String,
            Self::Int32(_) => HintType::Int32,
            Self::Int64(_) => HintType::Int64,
            Self::Float(_) => HintType::Float,
            Self::Byte(_) => HintType::Byte,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value. Numeric strings count too, since some
    /// senders pass counters as text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::Byte(v) => Some(i64::from(*v)),
            Self::String(s) => s.trim().parse().ok(),
            Self::None | Self::Float(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::String(s) => matches!(s.as_str(), "true" | "1"),
            Self::Int32(v) => *v != 0,
            Self::Int64(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Byte(v) => *v != 0,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<u8> for TypedValue {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

/// Type codes stored in `hints.type`. Codes are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HintType {
    None = 0,
    String = 1,
    Int32 = 2,
    Float = 3,
    Byte = 4,
    Int64 = 5,
}

impl HintType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for HintType {
    type Error = HintError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::String),
            2 => Ok(Self::Int32),
            3 => Ok(Self::Float),
            4 => Ok(Self::Byte),
            5 => Ok(Self::Int64),
            other => Err(HintError::UnknownType(other)),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HintError {
    #[error("unknown hint type code {0}")]
    UnknownType(i64),
    #[error("invalid {kind:?} payload: {text:?}")]
    InvalidPayload { kind: HintType, text: String },
}

/// Encode a value as the `(type, value)` columns of a hint row.
pub fn encode(value: &TypedValue) -> (HintType, String) {
    (value.hint_type(), value.to_string())
}

/// Decode the `(type, value)` columns of a hint row.
pub fn decode(code: i64, text: &str) -> Result<TypedValue, HintError> {
    let kind = HintType::try_from(code)?;
    let invalid = || HintError::InvalidPayload {
        kind,
        text: text.to_string(),
    };

    let value = match kind {
        HintType::None => TypedValue::None,
        HintType::String => TypedValue::String(text.to_string()),
        HintType::Int32 => TypedValue::Int32(text.trim().parse().map_err(|_| invalid())?),
        HintType::Int64 => TypedValue::Int64(text.trim().parse().map_err(|_| invalid())?),
        // Legacy rows were written with printf("%f"), which also parses here.
        HintType::Float => TypedValue::Float(text.trim().parse().map_err(|_| invalid())?),
        HintType::Byte => TypedValue::Byte(text.trim().parse().map_err(|_| invalid())?),
    };
    Ok(value)
}
