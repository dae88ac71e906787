//! Statement generation.
//!
//! Every function here is pure: it renders SQL text and the ordered parameter
//! list from an [`Entity`] and, where needed, an instance's values. Column
//! order always follows [`Entity::fields`], so the same definition yields the
//! same text on every call.

use crate::{
    error::{Error, Result},
    instance::{FieldValue, Instance},
    schema::{Entity, Field, ID_COLUMN, ID_COLUMN_DEF},
    types::Value,
};
use std::collections::BTreeMap;

/// SQL text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }
}

pub fn build_create_table(entity: &Entity) -> Statement {
    let columns = std::iter::once(ID_COLUMN_DEF.to_string())
        .chain(
            entity
                .create_column_specs()
                .into_iter()
                .skip(1)
                .map(|(name, ty)| format!("{name} {ty}")),
        )
        .collect::<Vec<_>>()
        .join(", ");

    Statement::new(
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns});",
            entity.table_name()
        ),
        Vec::new(),
    )
}

/// `INSERT` for every declared field. `id` is left to the store.
pub fn build_insert(entity: &Entity, values: &BTreeMap<String, FieldValue>) -> Result<Statement> {
    let params = field_params(entity, values)?;
    let columns = entity.field_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");

    Ok(Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            entity.table_name(),
            columns.join(", ")
        ),
        params,
    ))
}

/// `SELECT` of every row, plus the column names in result order.
pub fn build_select_all(entity: &Entity) -> (Statement, Vec<String>) {
    let columns = entity.column_names();
    let sql = format!(
        "SELECT {} FROM {};",
        columns.join(", "),
        entity.table_name()
    );
    (Statement::new(sql, Vec::new()), columns)
}

/// `SELECT` of one row.
///
/// `id` is a typed integer and is rendered as a literal, which keeps the
/// statement text identical to the historical form without opening it to
/// injection.
pub fn build_select_by_id(entity: &Entity, id: i64) -> (Statement, Vec<String>) {
    let columns = entity.column_names();
    let sql = format!(
        "SELECT {} FROM {} WHERE {ID_COLUMN}={id};",
        columns.join(", "),
        entity.table_name()
    );
    (Statement::new(sql, Vec::new()), columns)
}

pub fn build_update(entity: &Entity, instance: &Instance) -> Result<Statement> {
    let id = instance.id().ok_or_else(|| Error::Unsaved {
        entity: entity.name().to_string(),
    })?;

    let mut params = field_params(entity, instance.values())?;
    params.push(Value::Integer(id));

    let assignments = entity
        .field_columns()
        .into_iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement::new(
        format!(
            "UPDATE {} SET {assignments} WHERE {ID_COLUMN} = ?;",
            entity.table_name()
        ),
        params,
    ))
}

pub fn build_delete(entity: &Entity, id: i64) -> Statement {
    Statement::new(
        format!("DELETE FROM {} WHERE {ID_COLUMN} = ?;", entity.table_name()),
        vec![Value::Integer(id)],
    )
}

/// One parameter per declared field, in column order. Relations contribute
/// the referenced instance's id.
fn field_params(entity: &Entity, values: &BTreeMap<String, FieldValue>) -> Result<Vec<Value>> {
    if let Some(unknown) = values.keys().find(|name| !entity.has_field(name)) {
        return Err(Error::UnknownField {
            entity: entity.name().to_string(),
            field: unknown.clone(),
        });
    }

    entity
        .fields()
        .map(|(name, field)| {
            let value = values.get(name).ok_or_else(|| entity.missing_field(name))?;
            match (field, value) {
                (Field::ForeignKey(_), FieldValue::Related(related)) => related
                    .id()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::UnsavedReference {
                        entity: entity.name().to_string(),
                        field: name.to_string(),
                    }),
                (_, FieldValue::Value(value)) => Ok(value.clone()),
                (Field::Column(_), FieldValue::Related(_)) => Err(Error::TypeMismatch {
                    entity: entity.name().to_string(),
                    field: name.to_string(),
                    expected: "a scalar value",
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::Column, types::SqlType};
    use std::sync::Arc;

    fn author() -> Arc<Entity> {
        Entity::builder("Author")
            .column("name", Column::new(SqlType::Text))
            .column("age", Column::new(SqlType::Integer))
            .build()
            .unwrap()
    }

    fn book(author: &Arc<Entity>) -> Arc<Entity> {
        Entity::builder("Book")
            .column("title", Column::new(SqlType::Text))
            .column("published", Column::new(SqlType::Boolean).default(false))
            .foreign_key("author", author)
            .build()
            .unwrap()
    }

    #[test]
    fn create_table() {
        let author = author();
        assert_eq!(
            build_create_table(&author).sql,
            "CREATE TABLE IF NOT EXISTS author (id INTEGER PRIMARY KEY AUTOINCREMENT, age INTEGER, name TEXT);"
        );
        assert_eq!(
            build_create_table(&book(&author)).sql,
            "CREATE TABLE IF NOT EXISTS book (id INTEGER PRIMARY KEY AUTOINCREMENT, author_id INTEGER, published INTEGER, title TEXT);"
        );
    }

    #[test]
    fn insert() {
        let john = Instance::new(
            &author(),
            [("name", Value::from("John Doe")), ("age", Value::from(44))],
        )
        .unwrap();

        let stmt = build_insert(john.entity(), john.values()).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO author (age, name) VALUES (?, ?);");
        assert_eq!(stmt.params, vec![Value::Integer(44), Value::from("John Doe")]);
    }

    #[test]
    fn insert_resolves_relations_to_ids() {
        let author = author();
        let book = book(&author);
        let mut john = Instance::new(
            &author,
            [("name", Value::from("John Doe")), ("age", Value::from(44))],
        )
        .unwrap();

        let draft = Instance::new(
            &book,
            [("title", FieldValue::from("Draft")), ("author", FieldValue::from(&john))],
        )
        .unwrap();
        assert!(matches!(
            build_insert(&book, draft.values()),
            Err(Error::UnsavedReference { field, .. }) if field == "author"
        ));

        john.assign_id(7);
        let saved = Instance::new(
            &book,
            [("title", FieldValue::from("Draft")), ("author", FieldValue::from(&john))],
        )
        .unwrap();
        let stmt = build_insert(&book, saved.values()).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO book (author_id, published, title) VALUES (?, ?, ?);"
        );
        assert_eq!(
            stmt.params,
            vec![Value::Integer(7), Value::Boolean(false), Value::from("Draft")]
        );
    }

    #[test]
    fn insert_rejects_unknown_and_missing_fields() {
        let author = author();
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), FieldValue::from("Jack"));
        assert!(matches!(
            build_insert(&author, &values),
            Err(Error::MissingField { field, .. }) if field == "age"
        ));

        values.insert("age".to_string(), FieldValue::from(55));
        values.insert("email".to_string(), FieldValue::from("jack@example.com"));
        assert!(matches!(
            build_insert(&author, &values),
            Err(Error::UnknownField { field, .. }) if field == "email"
        ));
    }

    #[test]
    fn selects() {
        let author = author();

        let (stmt, columns) = build_select_all(&author);
        assert_eq!(stmt.sql, "SELECT id, age, name FROM author;");
        assert_eq!(columns, ["id", "age", "name"]);

        let (stmt, columns) = build_select_by_id(&author, 1);
        assert_eq!(stmt.sql, "SELECT id, age, name FROM author WHERE id=1;");
        assert!(stmt.params.is_empty());
        assert_eq!(columns, ["id", "age", "name"]);
    }

    #[test]
    fn update_and_delete() {
        let author = author();
        let mut john = Instance::new(
            &author,
            [("name", Value::from("John Wick")), ("age", Value::from(43))],
        )
        .unwrap();
        assert!(matches!(
            build_update(&author, &john),
            Err(Error::Unsaved { .. })
        ));

        john.assign_id(1);
        let stmt = build_update(&author, &john).unwrap();
        assert_eq!(stmt.sql, "UPDATE author SET age = ?, name = ? WHERE id = ?;");
        assert_eq!(
            stmt.params,
            vec![Value::Integer(43), Value::from("John Wick"), Value::Integer(1)]
        );

        let stmt = build_delete(&author, 1);
        assert_eq!(stmt.sql, "DELETE FROM author WHERE id = ?;");
        assert_eq!(stmt.params, vec![Value::Integer(1)]);
    }
}
