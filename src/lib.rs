//! A minimal ORM over SQLite.
//!
//! # Intention
//!
//! - Describe tables once as [`Entity`] definitions built from [`Column`] and
//!   [`ForeignKey`] descriptors.
//! - Generate `CREATE TABLE`, `INSERT`, `SELECT`, `UPDATE` and `DELETE`
//!   statements from those definitions ([`sql`]).
//! - Persist and fetch [`Instance`]s through [`Database`], resolving
//!   foreign keys into nested instances on read.
//!
//! # Architectural Boundaries
//!
//! - Statement generation is pure; only [`Database`] talks to a [`Store`].
//! - No query filtering beyond lookup by id, no migrations, no transactions.
//!
//! ```
//! use finesql::{Column, Database, Entity, Instance, SqlType, Value};
//!
//! # fn main() -> finesql::Result<()> {
//! let author = Entity::builder("Author")
//!     .column("name", Column::new(SqlType::Text))
//!     .column("age", Column::new(SqlType::Integer))
//!     .build()?;
//!
//! let db = Database::in_memory()?;
//! db.create(&author)?;
//!
//! let mut john = Instance::new(
//!     &author,
//!     [("name", Value::from("John Doe")), ("age", Value::from(44))],
//! )?;
//! assert_eq!(db.save(&mut john)?, 1);
//! assert_eq!(db.get(&author, 1)?.text("name")?, "John Doe");
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod error;
pub mod instance;
pub mod schema;
pub mod sql;
pub mod store;
pub mod types;

pub use db::{Database, DatabaseConfig};
pub use error::{Error, Operation, Result};
pub use instance::{FieldValue, Instance};
pub use schema::{Column, Entity, EntityBuilder, Field, ForeignKey};
pub use sql::Statement;
pub use store::Store;
pub use types::{SqlType, Value};
