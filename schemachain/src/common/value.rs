use crate::common::quote_literal;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A literal used as a column default.
///
/// Deserializes from plain JSON scalars: `null`, `true`, `42`, `0.5`, `"text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Renders the value as a SQL literal suitable for a `DEFAULT` clause.
    pub fn to_sql_literal(&self) -> SchemaResult<String> {
        match self {
            SqlValue::Null => Ok("NULL".to_string()),
            SqlValue::Bool(true) => Ok("TRUE".to_string()),
            SqlValue::Bool(false) => Ok("FALSE".to_string()),
            SqlValue::Integer(i) => Ok(i.to_string()),
            SqlValue::Real(f) if f.is_finite() => Ok(format!("{:?}", f)),
            SqlValue::Real(f) => Err(SchemaError::new(
                &format!("Default value {} is not a finite number", f),
                ErrorKind::ValidationError,
            )),
            SqlValue::Text(s) => Ok(quote_literal(s)),
        }
    }
}

impl Display for SqlValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{:?}", r),
            SqlValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}
