use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error raised by a [`Store`](crate::store::Store) implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The façade call (or connection open) that was running when the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the connection behind a [`Database`](crate::Database).
    Open,
    Create,
    Save,
    Update,
    Get,
    All,
    Delete,
    Tables,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Create => "create",
            Operation::Save => "save",
            Operation::Update => "update",
            Operation::Get => "get",
            Operation::All => "all",
            Operation::Delete => "delete",
            Operation::Tables => "tables",
        };
        f.write_str(name)
    }
}

/// Errors raised while defining entities, generating SQL or talking to the store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A semantic type name has no storage mapping.
    #[error("unsupported column type `{0}`")]
    UnsupportedType(String),

    #[error("invalid definition for entity `{entity}`: {reason}")]
    InvalidDefinition { entity: String, reason: String },

    #[error("entity `{entity}` has no field named `{field}`")]
    UnknownField { entity: String, field: String },

    /// A field was read (or persisted) without ever receiving a value or default.
    #[error("field `{entity}.{field}` has no value")]
    MissingField { entity: String, field: String },

    #[error("field `{entity}.{field}` holds a value of the wrong kind, expected {expected}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: &'static str,
    },

    /// A relation points at an instance the store has not assigned an id to yet.
    #[error("field `{entity}.{field}` references an instance that has not been saved")]
    UnsavedReference { entity: String, field: String },

    #[error("instance of `{entity}` has not been saved")]
    Unsaved { entity: String },

    #[error("no row in `{table}` with id {id}")]
    NotFound { table: String, id: i64 },

    #[error("store handle is poisoned")]
    Poisoned,

    #[error("store failed during {operation}: {source}")]
    Storage {
        operation: Operation,
        #[source]
        source: StoreError,
    },
}

impl Error {
    pub(crate) fn storage(operation: Operation, err: impl Into<StoreError>) -> Self {
        Error::Storage {
            operation,
            source: err.into(),
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
