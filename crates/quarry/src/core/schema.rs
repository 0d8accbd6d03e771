//! Table/column descriptors derived from record types, with per-type caching.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::identifier::{table_name, to_snake_case};
use crate::core::model::Model;

/// One member-to-column correspondence within a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Logical (struct member) name.
    pub name: &'static str,
    /// Database column name: the annotation override, or the snake_case
    /// form of `name`. Unique within a schema.
    pub column: String,
}

/// Cached descriptor of a record type's table name and field/column
/// correspondence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Table name derived from the type name (snake_case + `s`).
    pub table: String,
    /// Persisted fields in declaration order.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Derive a schema from a record type's field table.
    ///
    /// Walks `T::FIELDS` in declaration order, skipping excluded members.
    /// Never fails; a type with no persisted members yields a field-less
    /// schema.
    pub fn derive<T: Model>() -> Schema {
        let fields = T::FIELDS
            .iter()
            .filter(|spec| !spec.skip)
            .map(|spec| Field {
                name: spec.name,
                column: spec
                    .column
                    .map(str::to_string)
                    .unwrap_or_else(|| to_snake_case(spec.name)),
            })
            .collect();

        Schema {
            table: table_name(T::NAME),
            fields,
        }
    }

    /// Look up the logical field name for a column, if the column is mapped.
    #[must_use]
    pub fn field_for_column(&self, column: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.name)
    }
}

/// Process-lifetime cache of schemas keyed by type identity.
///
/// Injectable rather than a hidden global: each [`Db`](crate::Db) owns one,
/// so tests can isolate caching behavior. Cloning shares the underlying map.
///
/// Entries are derived lazily on first use, published once, and never
/// evicted or mutated. Concurrent first derivations of the same type may
/// race; the derivations are value-equal, so whichever publish wins is
/// correct and later callers share the cached `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    inner: Arc<RwLock<HashMap<TypeId, Arc<Schema>>>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the schema for `T`, deriving and caching it on first use.
    pub fn describe<T: Model + 'static>(&self) -> Arc<Schema> {
        let key = TypeId::of::<T>();

        if let Some(schema) = self
            .inner
            .read()
            .expect("schema cache lock poisoned")
            .get(&key)
        {
            return Arc::clone(schema);
        }

        // Derive outside the write lock; losing the race just means the
        // winning, value-equal derivation is kept.
        let schema = Arc::new(Schema::derive::<T>());
        let mut cache = self.inner.write().expect("schema cache lock poisoned");
        Arc::clone(cache.entry(key).or_insert(schema))
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("schema cache lock poisoned").len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FieldSpec;
    use crate::core::value::Value;
    use crate::error::Result;
    use std::collections::HashMap as StdHashMap;

    // Manual Model implementation; the derive is exercised by the
    // integration suite.
    #[derive(Debug, Default)]
    struct Account {
        id: i64,
        user_name: String,
        secret: String,
    }

    impl Model for Account {
        const NAME: &'static str = "Account";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec {
                name: "id",
                column: None,
                skip: false,
            },
            FieldSpec {
                name: "user_name",
                column: Some("login"),
                skip: false,
            },
            FieldSpec {
                name: "secret",
                column: None,
                skip: true,
            },
        ];

        fn values(&self) -> StdHashMap<&'static str, Value> {
            let mut map = StdHashMap::new();
            map.insert("id", Value::from(self.id));
            map.insert("user_name", Value::from(self.user_name.clone()));
            map
        }

        fn put(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = crate::FromValue::from_value(value).unwrap(),
                "user_name" => self.user_name = crate::FromValue::from_value(value).unwrap(),
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_derive_table_and_columns() {
        let schema = Schema::derive::<Account>();
        assert_eq!(schema.table, "accounts");
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.fields[0].column, "id");
        // Annotation override wins over derivation.
        assert_eq!(schema.fields[1].column, "login");
        // Skipped members never reach the schema.
        assert!(schema.field_for_column("secret").is_none());
    }

    #[test]
    fn test_describe_is_idempotent_and_cached() {
        let registry = SchemaRegistry::new();
        let first = registry.describe::<Account>();
        let second = registry.describe::<Account>();
        assert_eq!(first, second);
        // The second call reuses the published instance.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = SchemaRegistry::new();
        let b = SchemaRegistry::new();
        a.describe::<Account>();
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
