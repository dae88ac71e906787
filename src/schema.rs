//! Entity definitions and the reflector that turns them into column lists.
//!
//! An [`Entity`] is assembled once through [`EntityBuilder`] and shared as an
//! `Arc<Entity>`. Fields live in a name-sorted map, so every column list the
//! reflector hands out (and every statement rendered from it) is stable.

use crate::{
    error::{Error, Result},
    types::{SqlType, Value},
};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Name of the implicit identity column.
pub const ID_COLUMN: &str = "id";

/// DDL fragment for the identity column.
pub const ID_COLUMN_DEF: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT";

/// A scalar field.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    ty: SqlType,
    default: Option<Value>,
}

impl Column {
    pub fn new(ty: SqlType) -> Self {
        Self { ty, default: None }
    }

    /// Value given to instances that omit this field.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn ty(&self) -> SqlType {
        self.ty
    }

    pub fn sql_type(&self) -> &'static str {
        self.ty.sql_type()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// A one-to-one reference to another entity, stored as `<field>_id`.
#[derive(Clone)]
pub struct ForeignKey {
    table: Arc<Entity>,
}

impl ForeignKey {
    pub fn new(table: &Arc<Entity>) -> Self {
        Self {
            table: Arc::clone(table),
        }
    }

    /// The referenced entity.
    pub fn table(&self) -> &Arc<Entity> {
        &self.table
    }

    pub fn sql_type(&self) -> &'static str {
        SqlType::Integer.sql_type()
    }

    pub fn column_name(field: &str) -> String {
        format!("{field}_id")
    }
}

impl fmt::Debug for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("table", &self.table.name())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Field {
    Column(Column),
    ForeignKey(ForeignKey),
}

impl Field {
    /// Storage column this field maps to.
    pub fn column_name(&self, field: &str) -> String {
        match self {
            Field::Column(_) => field.to_string(),
            Field::ForeignKey(_) => ForeignKey::column_name(field),
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            Field::Column(column) => column.sql_type(),
            Field::ForeignKey(fk) => fk.sql_type(),
        }
    }

    /// Semantic type used to decode this field's column on read.
    pub fn read_type(&self) -> SqlType {
        match self {
            Field::Column(column) => column.ty(),
            Field::ForeignKey(_) => SqlType::Integer,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Field::Column(column) => column.default_value(),
            Field::ForeignKey(_) => None,
        }
    }

    pub fn as_foreign_key(&self) -> Option<&ForeignKey> {
        match self {
            Field::ForeignKey(fk) => Some(fk),
            Field::Column(_) => None,
        }
    }
}

/// An immutable table blueprint.
#[derive(Debug)]
pub struct Entity {
    name: String,
    table: String,
    fields: BTreeMap<String, Field>,
}

impl Entity {
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Name the entity was declared with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage table name: the declared name, lower-cased.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Declared fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &ForeignKey)> {
        self.fields()
            .filter_map(|(name, field)| field.as_foreign_key().map(|fk| (name, fk)))
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields.get(name).ok_or_else(|| Error::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Storage columns of the declared fields, without `id`.
    pub fn field_columns(&self) -> Vec<String> {
        self.fields()
            .map(|(name, field)| field.column_name(name))
            .collect()
    }

    /// Every storage column, `id` first.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(ID_COLUMN.to_string())
            .chain(self.field_columns())
            .collect()
    }

    /// `(column, sql type)` pairs used for `CREATE TABLE`, `id` first.
    pub fn create_column_specs(&self) -> Vec<(String, &'static str)> {
        std::iter::once((ID_COLUMN.to_string(), SqlType::Integer.sql_type()))
            .chain(
                self.fields()
                    .map(|(name, field)| (field.column_name(name), field.sql_type())),
            )
            .collect()
    }

    pub(crate) fn missing_field(&self, field: &str) -> Error {
        Error::MissingField {
            entity: self.name.clone(),
            field: field.to_string(),
        }
    }
}

/// Reserved words of the SQLite grammar. Statements are rendered unquoted, so
/// none of these may name a table or column.
const SQLITE_KEYWORDS: &[&str] = &[
    "abort", "action", "add", "after", "all", "alter", "always", "analyze", "and", "as",
    "asc", "attach", "autoincrement", "before", "begin", "between", "by", "cascade", "case",
    "cast", "check", "collate", "column", "commit", "conflict", "constraint", "create",
    "cross", "current", "current_date", "current_time", "current_timestamp", "database",
    "default", "deferrable", "deferred", "delete", "desc", "detach", "distinct", "do",
    "drop", "each", "else", "end", "escape", "except", "exclude", "exclusive", "exists",
    "explain", "fail", "filter", "first", "following", "for", "foreign", "from", "full",
    "generated", "glob", "group", "groups", "having", "if", "ignore", "immediate", "in",
    "index", "indexed", "initially", "inner", "insert", "instead", "intersect", "into",
    "is", "isnull", "join", "key", "last", "left", "like", "limit", "match", "materialized",
    "natural", "no", "not", "nothing", "notnull", "null", "nulls", "of", "offset", "on",
    "or", "order", "others", "outer", "over", "partition", "plan", "pragma", "preceding",
    "primary", "query", "raise", "range", "recursive", "references", "regexp", "reindex",
    "release", "rename", "replace", "restrict", "returning", "right", "rollback", "row",
    "rows", "savepoint", "select", "set", "table", "temp", "temporary", "then", "ties",
    "to", "transaction", "trigger", "unbounded", "union", "unique", "update", "using",
    "vacuum", "values", "view", "virtual", "when", "where", "window", "with", "without",
];

/// Whether `name` can appear unquoted as a table or column name.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !SQLITE_KEYWORDS.contains(&name.to_ascii_lowercase().as_str())
        && !name.to_ascii_lowercase().starts_with("sqlite_")
}

fn invalid(entity: &str, reason: impl Into<String>) -> Error {
    Error::InvalidDefinition {
        entity: entity.to_string(),
        reason: reason.into(),
    }
}

/// Registration step for an [`Entity`].
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    fields: Vec<(String, Field)>,
}

impl EntityBuilder {
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.fields.push((name.into(), Field::Column(column)));
        self
    }

    pub fn foreign_key(mut self, name: impl Into<String>, table: &Arc<Entity>) -> Self {
        self.fields
            .push((name.into(), Field::ForeignKey(ForeignKey::new(table))));
        self
    }

    pub fn build(self) -> Result<Arc<Entity>> {
        let name = self.name;
        if name.is_empty() {
            return Err(invalid(&name, "entity name is empty"));
        }
        if !is_identifier(&name) {
            return Err(invalid(&name, "entity name is not a usable table name"));
        }
        if self.fields.is_empty() {
            return Err(invalid(&name, "entity declares no fields"));
        }

        let mut fields = BTreeMap::new();
        for (field_name, field) in self.fields {
            if field_name.is_empty() {
                return Err(invalid(&name, "field name is empty"));
            }
            if field_name == ID_COLUMN {
                return Err(invalid(&name, "`id` is reserved for the identity column"));
            }
            if let Field::Column(column) = &field {
                if let Some(default) = column.default_value() {
                    if !default.fits(column.ty()) {
                        return Err(invalid(
                            &name,
                            format!("default for `{field_name}` is not a {}", column.ty()),
                        ));
                    }
                }
            }
            if fields.insert(field_name.clone(), field).is_some() {
                return Err(invalid(&name, format!("field `{field_name}` declared twice")));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for (field_name, field) in &fields {
            let column = field.column_name(field_name);
            if !is_identifier(&column) {
                return Err(invalid(
                    &name,
                    format!("`{column}` is not a usable column name"),
                ));
            }
            if column == ID_COLUMN || !seen.insert(column.clone()) {
                return Err(invalid(&name, format!("column `{column}` is mapped twice")));
            }
        }

        Ok(Arc::new(Entity {
            table: name.to_lowercase(),
            name,
            fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Arc<Entity> {
        Entity::builder("Author")
            .column("name", Column::new(SqlType::Text))
            .column("age", Column::new(SqlType::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn describes_declared_fields() {
        let author = author();
        let book = Entity::builder("Book")
            .column("title", Column::new(SqlType::Text))
            .foreign_key("author", &author)
            .build()
            .unwrap();

        match author.field("name").unwrap() {
            Field::Column(column) => {
                assert_eq!(column.ty(), SqlType::Text);
                assert_eq!(column.sql_type(), "TEXT");
            }
            other => panic!("unexpected field {other:?}"),
        }
        let fk = book.field("author").unwrap().as_foreign_key().unwrap();
        assert!(Arc::ptr_eq(fk.table(), &author));
        assert_eq!(book.table_name(), "book");
    }

    #[test]
    fn orders_columns_by_field_name() {
        let author = author();
        let book = Entity::builder("Book")
            .column("title", Column::new(SqlType::Text))
            .column("published", Column::new(SqlType::Boolean))
            .foreign_key("author", &author)
            .build()
            .unwrap();

        assert_eq!(author.column_names(), ["id", "age", "name"]);
        assert_eq!(book.column_names(), ["id", "author_id", "published", "title"]);
        assert_eq!(
            book.create_column_specs(),
            vec![
                ("id".to_string(), "INTEGER"),
                ("author_id".to_string(), "INTEGER"),
                ("published".to_string(), "INTEGER"),
                ("title".to_string(), "TEXT"),
            ]
        );
        assert_eq!(book.column_names(), book.column_names());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = author().field("email").unwrap_err();
        assert!(matches!(err, Error::UnknownField { field, .. } if field == "email"));
    }

    #[test]
    fn rejects_bad_definitions() {
        let reserved = Entity::builder("Thing")
            .column("id", Column::new(SqlType::Integer))
            .build();
        assert!(matches!(reserved, Err(Error::InvalidDefinition { .. })));

        let twice = Entity::builder("Thing")
            .column("a", Column::new(SqlType::Integer))
            .column("a", Column::new(SqlType::Text))
            .build();
        assert!(matches!(twice, Err(Error::InvalidDefinition { .. })));

        let author = author();
        let clash = Entity::builder("Book")
            .column("author_id", Column::new(SqlType::Integer))
            .foreign_key("author", &author)
            .build();
        assert!(matches!(clash, Err(Error::InvalidDefinition { .. })));

        let empty = Entity::builder("Tag").build();
        assert!(matches!(
            empty,
            Err(Error::InvalidDefinition { reason, .. }) if reason == "entity declares no fields"
        ));

        let bad_default = Entity::builder("Todo")
            .column("done", Column::new(SqlType::Boolean).default("no"))
            .build();
        assert!(matches!(bad_default, Err(Error::InvalidDefinition { .. })));
    }

    #[test]
    fn rejects_names_that_need_quoting() {
        let keyword_table = Entity::builder("Order")
            .column("total", Column::new(SqlType::Float))
            .build();
        assert!(matches!(keyword_table, Err(Error::InvalidDefinition { .. })));

        let keyword_column = Entity::builder("Team")
            .column("group", Column::new(SqlType::Text))
            .build();
        assert!(matches!(
            keyword_column,
            Err(Error::InvalidDefinition { reason, .. }) if reason.contains("`group`")
        ));

        for bad in ["first name", "1st", "name;--", "sqlite_stat"] {
            let built = Entity::builder("Person")
                .column(bad, Column::new(SqlType::Text))
                .build();
            assert!(
                matches!(built, Err(Error::InvalidDefinition { .. })),
                "accepted {bad:?}"
            );
        }

        assert!(is_identifier("secret_name"));
        assert!(is_identifier("_hidden2"));
    }
}
