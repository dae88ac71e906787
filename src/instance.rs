use crate::{
    error::{Error, Result},
    schema::{Entity, Field},
    types::{SqlType, Value},
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// What an instance holds for one declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// A resolved (or caller-supplied) related instance.
    ///
    /// This is an owned copy: building it from `&author` clones the author,
    /// so an id assigned to the original afterwards is not seen here. Save
    /// the related instance first, then build the referencing one from it.
    Related(Box<Instance>),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::Related(_) => None,
        }
    }

    pub fn as_related(&self) -> Option<&Instance> {
        match self {
            FieldValue::Related(instance) => Some(instance),
            FieldValue::Value(_) => None,
        }
    }
}

impl<T: Into<Value>> From<T> for FieldValue {
    fn from(value: T) -> Self {
        FieldValue::Value(value.into())
    }
}

impl From<Instance> for FieldValue {
    fn from(instance: Instance) -> Self {
        FieldValue::Related(Box::new(instance))
    }
}

impl From<&Instance> for FieldValue {
    fn from(instance: &Instance) -> Self {
        FieldValue::Related(Box::new(instance.clone()))
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(value) => value.serialize(serializer),
            FieldValue::Related(instance) => instance.serialize(serializer),
        }
    }
}

/// One in-memory row of an [`Entity`].
///
/// Declared fields live in a private value store keyed by field name, apart
/// from the identity and dirty bookkeeping.
#[derive(Debug, Clone)]
pub struct Instance {
    entity: Arc<Entity>,
    id: Option<i64>,
    values: BTreeMap<String, FieldValue>,
    dirty: BTreeSet<String>,
}

impl Instance {
    /// Builds an unsaved instance. Omitted fields take their declared default
    /// or stay unset.
    pub fn new<I, K, V>(entity: &Arc<Entity>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut instance = Self {
            entity: Arc::clone(entity),
            id: None,
            values: BTreeMap::new(),
            dirty: BTreeSet::new(),
        };

        for (name, field) in entity.fields() {
            if let Some(default) = field.default_value() {
                instance
                    .values
                    .insert(name.to_string(), FieldValue::Value(default.clone()));
            }
        }
        for (name, value) in values {
            instance.set(name, value)?;
        }
        Ok(instance)
    }

    /// Rebuilds a stored row; nothing is marked dirty.
    pub(crate) fn from_row(
        entity: &Arc<Entity>,
        id: i64,
        values: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            entity: Arc::clone(entity),
            id: Some(id),
            values,
            dirty: BTreeSet::new(),
        }
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    /// Identity assigned by the store, `None` until the first save.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        self.entity.field(name)?;
        self.values
            .get(name)
            .ok_or_else(|| self.entity.missing_field(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        let field = self.entity.field(&name)?;

        let accepted = match (field, &value) {
            (Field::Column(column), FieldValue::Value(v)) => v.fits(column.ty()),
            (Field::Column(_), FieldValue::Related(_)) => false,
            (Field::ForeignKey(fk), FieldValue::Related(other)) => {
                Arc::ptr_eq(fk.table(), other.entity())
            }
            (Field::ForeignKey(_), FieldValue::Value(v)) => v.fits(SqlType::Integer),
        };
        if !accepted {
            let expected = match field {
                Field::Column(column) => type_label(column.ty()),
                Field::ForeignKey(_) => "a related instance or integer id",
            };
            return Err(Error::TypeMismatch {
                entity: self.entity.name().to_string(),
                field: name,
                expected,
            });
        }

        self.dirty.insert(name.clone());
        self.values.insert(name, value);
        Ok(())
    }

    /// Raw values, by field name. Unset fields are absent.
    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Fields set since construction or the last successful write.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.scalar(name)? {
            Value::Text(v) => Ok(v),
            _ => Err(self.mismatch(name, "text")),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.scalar(name)? {
            Value::Integer(v) => Ok(*v),
            _ => Err(self.mismatch(name, "an integer")),
        }
    }

    pub fn real(&self, name: &str) -> Result<f64> {
        match self.scalar(name)? {
            Value::Real(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            _ => Err(self.mismatch(name, "a float")),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.scalar(name)? {
            Value::Boolean(v) => Ok(*v),
            _ => Err(self.mismatch(name, "a boolean")),
        }
    }

    pub fn blob(&self, name: &str) -> Result<&[u8]> {
        match self.scalar(name)? {
            Value::Blob(v) => Ok(v),
            _ => Err(self.mismatch(name, "binary")),
        }
    }

    /// `true` when the field holds SQL `NULL`.
    pub fn is_null(&self, name: &str) -> Result<bool> {
        Ok(matches!(self.get(name)?, FieldValue::Value(Value::Null)))
    }

    /// The related instance behind a foreign-key field.
    pub fn related(&self, name: &str) -> Result<&Instance> {
        self.get(name)?
            .as_related()
            .ok_or_else(|| self.mismatch(name, "a related instance"))
    }

    /// The referenced row's id, whether resolved or raw.
    pub fn related_id(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name)? {
            FieldValue::Related(instance) => Ok(instance.id()),
            FieldValue::Value(Value::Integer(id)) => Ok(Some(*id)),
            FieldValue::Value(Value::Null) => Ok(None),
            FieldValue::Value(_) => Err(self.mismatch(name, "an integer id")),
        }
    }

    fn scalar(&self, name: &str) -> Result<&Value> {
        self.get(name)?
            .as_value()
            .ok_or_else(|| self.mismatch(name, "a scalar value"))
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> Error {
        Error::TypeMismatch {
            entity: self.entity.name().to_string(),
            field: name.to_string(),
            expected,
        }
    }
}

fn type_label(ty: SqlType) -> &'static str {
    match ty {
        SqlType::Integer => "an integer",
        SqlType::Float => "a float",
        SqlType::Text => "text",
        SqlType::Blob => "binary",
        SqlType::Boolean => "a boolean",
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entity, &other.entity)
            && self.id == other.id
            && self.values == other.values
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
