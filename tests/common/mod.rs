#![allow(dead_code)]

use finesql::{Column, Database, Entity, FieldValue, Instance, Result, SqlType};
use std::sync::Arc;

pub fn author() -> Arc<Entity> {
    Entity::builder("Author")
        .column("name", Column::new(SqlType::Text))
        .column("age", Column::new(SqlType::Integer))
        .build()
        .unwrap()
}

pub fn book(author: &Arc<Entity>) -> Arc<Entity> {
    Entity::builder("Book")
        .column("title", Column::new(SqlType::Text))
        .column("published", Column::new(SqlType::Boolean).default(false))
        .foreign_key("author", author)
        .build()
        .unwrap()
}

pub fn user() -> Arc<Entity> {
    Entity::builder("User")
        .column("username", Column::new(SqlType::Text))
        .column("age", Column::new(SqlType::Integer).default(None::<i64>))
        .column("email", Column::new(SqlType::Text).default(None::<String>))
        .build()
        .unwrap()
}

pub fn post(user: &Arc<Entity>) -> Arc<Entity> {
    Entity::builder("Post")
        .column("title", Column::new(SqlType::Text))
        .column("body", Column::new(SqlType::Text).default(None::<String>))
        .column("content", Column::new(SqlType::Text).default(None::<String>))
        .foreign_key("author", user)
        .build()
        .unwrap()
}

pub fn hero() -> Arc<Entity> {
    Entity::builder("Hero")
        .column("name", Column::new(SqlType::Text))
        .column("secret_name", Column::new(SqlType::Text))
        .column("age", Column::new(SqlType::Integer).default(None::<i64>))
        .build()
        .unwrap()
}

pub fn todo() -> Arc<Entity> {
    Entity::builder("Todo")
        .column("title", Column::new(SqlType::Text))
        .column("completed", Column::new(SqlType::Boolean).default(false))
        .column("priority", Column::new(SqlType::Integer))
        .build()
        .unwrap()
}

pub fn create_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Builds and saves an instance in one step.
pub fn save_obj<const N: usize>(
    db: &Database,
    entity: &Arc<Entity>,
    values: [(&str, FieldValue); N],
) -> Result<Instance> {
    let mut instance = Instance::new(entity, values)?;
    db.save(&mut instance)?;
    Ok(instance)
}
