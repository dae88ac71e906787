use crate::{
    error::{Error, Operation, Result},
    instance::{FieldValue, Instance},
    schema::Entity,
    sql::{self, Statement},
    store::Store,
    types::Value,
};
use rusqlite::{types::Value as SqlValue, Connection};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, `None` for an in-memory database
    pub db_path: Option<PathBuf>,
    /// Entities whose tables are created when the database is opened
    pub entities: Vec<Arc<Entity>>,
}

impl DatabaseConfig {
    /// Create a new config backed by the file at `db_path`
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
            entities: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Register an entity to create on open
    pub fn with_entity(mut self, entity: &Arc<Entity>) -> Self {
        self.entities.push(Arc::clone(entity));
        self
    }
}

/// Maps entity CRUD calls onto generated SQL.
///
/// The store handle sits behind a mutex: statements from concurrent callers
/// run one at a time.
#[derive(Debug)]
pub struct Database<S = Connection> {
    store: Mutex<S>,
}

impl Database<Connection> {
    /// Open the database described by `config` and create its entity tables
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let connection = match &config.db_path {
            Some(path) => {
                info!("opening sqlite database at path: {}", path.display());
                Connection::open(path)
            }
            None => Connection::open_in_memory(),
        }
        .map_err(|err| Error::storage(Operation::Open, err))?;

        let db = Self::new(connection);
        for entity in &config.entities {
            db.create(entity)?;
        }
        Ok(db)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(DatabaseConfig::new(path.as_ref()))
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(DatabaseConfig::in_memory())
    }
}

impl<S: Store> Database<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Release the store handle.
    pub fn into_inner(self) -> Result<S> {
        self.store.into_inner().map_err(|_| Error::Poisoned)
    }

    /// Create the table for `entity` if it does not exist yet.
    pub fn create(&self, entity: &Entity) -> Result<()> {
        let stmt = sql::build_create_table(entity);
        self.execute(Operation::Create, &stmt)?;
        info!(table = entity.table_name(), "table created");
        Ok(())
    }

    /// Insert a new instance, or update it when it already has an id.
    /// Returns the instance id.
    pub fn save(&self, instance: &mut Instance) -> Result<i64> {
        if let Some(id) = instance.id() {
            self.update(instance)?;
            return Ok(id);
        }

        let entity = Arc::clone(instance.entity());
        let stmt = sql::build_insert(&entity, instance.values())?;

        let id = {
            let mut store = self.lock()?;
            run(&mut *store, Operation::Save, &stmt)?;
            store.last_insert_id()
        };

        instance.assign_id(id);
        instance.mark_clean();
        info!(table = entity.table_name(), id, "row inserted");
        Ok(id)
    }

    /// Write every field of a saved instance back to its row.
    pub fn update(&self, instance: &mut Instance) -> Result<()> {
        let entity = Arc::clone(instance.entity());
        let stmt = sql::build_update(&entity, instance)?;
        let id = instance.id().ok_or_else(|| Error::Unsaved {
            entity: entity.name().to_string(),
        })?;

        if self.execute(Operation::Update, &stmt)? == 0 {
            return Err(Error::NotFound {
                table: entity.table_name().to_string(),
                id,
            });
        }

        instance.mark_clean();
        info!(table = entity.table_name(), id, "row updated");
        Ok(())
    }

    /// Fetch one row, resolving relations one level deep.
    pub fn get(&self, entity: &Arc<Entity>, id: i64) -> Result<Instance> {
        let (stmt, columns) = sql::build_select_by_id(entity, id);
        let row = self
            .query(Operation::Get, &stmt)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                table: entity.table_name().to_string(),
                id,
            })?;

        self.materialize(entity, &columns, row)
    }

    /// Fetch every row in store order, resolving relations one level deep.
    pub fn all(&self, entity: &Arc<Entity>) -> Result<Vec<Instance>> {
        let (stmt, columns) = sql::build_select_all(entity);
        self.query(Operation::All, &stmt)?
            .into_iter()
            .map(|row| self.materialize(entity, &columns, row))
            .collect()
    }

    /// Delete the row with `id`. Deleting an absent row is not an error.
    pub fn delete(&self, entity: &Entity, id: i64) -> Result<()> {
        let stmt = sql::build_delete(entity, id);
        match self.execute(Operation::Delete, &stmt)? {
            0 => warn!(table = entity.table_name(), id, "delete matched no row"),
            _ => info!(table = entity.table_name(), id, "row deleted"),
        }
        Ok(())
    }

    /// Names of the tables currently in the store.
    pub fn tables(&self) -> Result<Vec<String>> {
        self.lock()?
            .table_names()
            .map_err(|err| Error::storage(Operation::Tables, err))
    }

    fn materialize(
        &self,
        entity: &Arc<Entity>,
        columns: &[String],
        row: Vec<SqlValue>,
    ) -> Result<Instance> {
        let mut raw = columns.iter().zip(row);
        let id = match raw.next() {
            Some((_, SqlValue::Integer(id))) => id,
            _ => {
                return Err(Error::TypeMismatch {
                    entity: entity.name().to_string(),
                    field: "id".to_string(),
                    expected: "an integer",
                })
            }
        };

        let mut values = BTreeMap::new();
        for ((name, field), (_, cell)) in entity.fields().zip(raw) {
            let value = Value::from_column(cell, field.read_type());
            let value = match (field.as_foreign_key(), value) {
                (Some(fk), Value::Integer(related_id)) => {
                    match self.get(fk.table(), related_id) {
                        Ok(related) => FieldValue::Related(Box::new(related)),
                        Err(err) if err.is_not_found() => {
                            warn!(
                                table = entity.table_name(),
                                field = name,
                                related_id,
                                "foreign key points at a missing row"
                            );
                            FieldValue::Value(Value::Integer(related_id))
                        }
                        Err(err) => return Err(err),
                    }
                }
                (_, value) => FieldValue::Value(value),
            };
            values.insert(name.to_string(), value);
        }

        Ok(Instance::from_row(entity, id, values))
    }

    fn execute(&self, operation: Operation, stmt: &Statement) -> Result<usize> {
        run(&mut *self.lock()?, operation, stmt)
    }

    fn query(&self, operation: Operation, stmt: &Statement) -> Result<Vec<Vec<SqlValue>>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "query");
        self.lock()?
            .query(&stmt.sql, &stmt.params)
            .map_err(|err| Error::storage(operation, err))
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.store.lock().map_err(|_| Error::Poisoned)
    }
}

fn run<S: Store>(store: &mut S, operation: Operation, stmt: &Statement) -> Result<usize> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "execute");
    store
        .execute(&stmt.sql, &stmt.params)
        .map_err(|err| Error::storage(operation, err))
}
