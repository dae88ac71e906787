use crate::error::Error;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Semantic scalar types a column can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Float,
    Text,
    Blob,
    /// Stored as `INTEGER` 0/1 and coerced back on read.
    Boolean,
}

impl SqlType {
    /// Storage column type used in generated DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Float => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Boolean => "INTEGER",
        }
    }
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(SqlType::Integer),
            "float" | "real" => Ok(SqlType::Float),
            "str" | "text" => Ok(SqlType::Text),
            "bytes" | "blob" => Ok(SqlType::Blob),
            "bool" | "boolean" => Ok(SqlType::Boolean),
            _ => Err(Error::UnsupportedType(name.to_string())),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A single field value, as held by an instance or bound to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Converts a raw column read from the store, restoring booleans for
    /// columns declared as [`SqlType::Boolean`].
    pub fn from_column(raw: SqlValue, ty: SqlType) -> Self {
        match (raw, ty) {
            (SqlValue::Null, _) => Value::Null,
            (SqlValue::Integer(v), SqlType::Boolean) => Value::Boolean(v != 0),
            (SqlValue::Integer(v), SqlType::Float) => Value::Real(v as f64),
            (SqlValue::Integer(v), _) => Value::Integer(v),
            (SqlValue::Real(v), _) => Value::Real(v),
            (SqlValue::Text(v), _) => Value::Text(v),
            (SqlValue::Blob(v), _) => Value::Blob(v),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value may be stored in a column of type `ty`.
    pub fn fits(&self, ty: SqlType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Integer(_), SqlType::Integer)
                | (Value::Integer(_), SqlType::Float)
                | (Value::Real(_), SqlType::Float)
                | (Value::Text(_), SqlType::Text)
                | (Value::Blob(_), SqlType::Blob)
                | (Value::Boolean(_), SqlType::Boolean)
        )
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Boolean(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
