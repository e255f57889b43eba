//! Bind parameters and column values.
//!
//! Every value that reaches SQL goes through a [`BindParameter`]: a named
//! placeholder key, a value, and the type it is bound as.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared binding type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamType {
    #[default]
    Str,
    Int,
    Bool,
    Null,
    Lob,
}

/// A value read from or written to SQLite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Integer view of the value; numeric text is accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value; numbers are rendered in decimal
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Integer(v) => Some(v.to_string()),
            SqlValue::Real(v) => Some(v.to_string()),
            SqlValue::Null | SqlValue::Blob(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Coerce the value to the declared binding type
    ///
    /// Mirrors how a loosely typed driver treats a declared type: an INT
    /// parameter holding numeric text is bound as an integer, a STR
    /// parameter holding a number is bound as its text.
    pub fn coerce(&self, ty: ParamType) -> SqlValue {
        match (ty, self) {
            (ParamType::Null, _) => SqlValue::Null,
            (ParamType::Int, SqlValue::Text(s)) => s
                .trim()
                .parse()
                .map(SqlValue::Integer)
                .unwrap_or_else(|_| self.clone()),
            (ParamType::Bool, SqlValue::Text(s)) => match s.trim() {
                "" | "0" | "false" => SqlValue::Integer(0),
                _ => SqlValue::Integer(1),
            },
            (ParamType::Str, SqlValue::Integer(_) | SqlValue::Real(_)) => {
                self.as_text().map(SqlValue::Text).unwrap_or(SqlValue::Null)
            }
            (ParamType::Lob, SqlValue::Text(s)) => SqlValue::Blob(s.as_bytes().to_vec()),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{v}"),
            SqlValue::Real(v) => write!(f, "{v}"),
            SqlValue::Text(s) => write!(f, "'{s}'"),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

/// One named value for a prepared statement
///
/// `key` names the placeholder (`:key`) and, for insert/update/replace, the
/// column. Serialises as `{"key": .., "value": .., "type": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindParameter {
    pub key: String,
    pub value: SqlValue,
    #[serde(rename = "type")]
    pub ty: ParamType,
}

impl BindParameter {
    pub fn new(key: impl Into<String>, value: impl Into<SqlValue>, ty: ParamType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ty,
        }
    }

    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, SqlValue::Text(value.into()), ParamType::Str)
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, SqlValue::Integer(value), ParamType::Int)
    }

    pub fn null(key: impl Into<String>) -> Self {
        Self::new(key, SqlValue::Null, ParamType::Null)
    }

    /// The value as it will be bound
    pub fn bound_value(&self) -> SqlValue {
        self.value.coerce(self.ty)
    }
}
