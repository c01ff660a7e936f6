use crate::{DataError, FieldDef, FieldRole, Record, Result};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Classification of a record type's fields, computed once per type.
#[derive(Debug)]
pub struct RecordMetadata {
    /// Every writable field.
    pub all: Vec<FieldDef>,
    /// Declared keys, or the inferred `id` field when none is declared.
    pub keys: Vec<FieldDef>,
    /// Caller-assigned keys, never inferred.
    pub explicit_keys: Vec<FieldDef>,
    /// Database-computed fields.
    pub computed: Vec<FieldDef>,
}

impl RecordMetadata {
    fn derive<T: Record>() -> Self {
        let all: Vec<FieldDef> = T::fields().iter().filter(|f| f.write).copied().collect();
        let explicit_keys: Vec<FieldDef> = all
            .iter()
            .filter(|f| f.role == FieldRole::ExplicitKey)
            .copied()
            .collect();
        let computed: Vec<FieldDef> = all
            .iter()
            .filter(|f| f.role == FieldRole::Computed)
            .copied()
            .collect();
        let mut keys: Vec<FieldDef> = all
            .iter()
            .filter(|f| f.role == FieldRole::Key)
            .copied()
            .collect();
        if keys.is_empty() {
            // Inference never picks explicit keys (caller-assigned) nor
            // computed fields (keys and computed stay disjoint).
            if let Some(id) = all.iter().find(|f| {
                f.name.eq_ignore_ascii_case("id") && f.role == FieldRole::Normal
            }) {
                keys.push(*id);
            }
        }
        Self {
            all,
            keys,
            explicit_keys,
            computed,
        }
    }

    /// Keys and explicit keys together: the WHERE clause of single-record
    /// update and delete.
    pub fn combined_keys(&self) -> impl Iterator<Item = &FieldDef> {
        self.keys.iter().chain(self.explicit_keys.iter())
    }

    pub fn combined_key_count(&self) -> usize {
        self.keys.len() + self.explicit_keys.len()
    }

    /// INSERT column list: everything writable except keys and computed
    /// fields. Explicit keys are caller-assigned and stay in.
    pub fn insert_fields(&self) -> Vec<FieldDef> {
        self.all
            .iter()
            .filter(|f| {
                !self.keys.iter().any(|k| k.name == f.name)
                    && !self.computed.iter().any(|c| c.name == f.name)
            })
            .copied()
            .collect()
    }

    /// UPDATE SET list: excludes all keys (declared, inferred and explicit)
    /// and computed fields.
    pub fn update_fields(&self) -> Vec<FieldDef> {
        self.all
            .iter()
            .filter(|f| {
                !self.combined_keys().any(|k| k.name == f.name)
                    && !self.computed.iter().any(|c| c.name == f.name)
            })
            .copied()
            .collect()
    }
}

/// Process-wide metadata cache, keyed by type identity.
///
/// Population is idempotent: a race simply recomputes the same value and the
/// last writer wins.
#[derive(Debug, Default)]
pub struct MetadataCache {
    map: RwLock<HashMap<TypeId, Arc<RecordMetadata>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Record>(&self) -> Arc<RecordMetadata> {
        let key = TypeId::of::<T>();
        if let Some(meta) = self.map.read().unwrap().get(&key) {
            return meta.clone();
        }
        let meta = Arc::new(RecordMetadata::derive::<T>());
        self.map
            .write()
            .unwrap()
            .insert(key, meta.clone());
        meta
    }

    /// The single key a fetch-style operation requires. Fails with a
    /// configuration error naming the operation when the type declares zero
    /// or more than one combined key/explicit-key field.
    pub fn single_key<T: Record>(&self, operation: &str) -> Result<FieldDef> {
        let meta = self.get::<T>();
        let count = meta.combined_key_count();
        if count == 0 {
            return Err(DataError::configuration(format!(
                "{} requires `{}` to declare a key or explicit-key field",
                operation,
                T::table_name(),
            )));
        }
        if count > 1 {
            return Err(DataError::configuration(format!(
                "{} requires `{}` to declare a single key or explicit-key field, found {}",
                operation,
                T::table_name(),
                count,
            )));
        }
        Ok(*meta
            .keys
            .first()
            .unwrap_or_else(|| meta.explicit_keys.first().expect("one key exists")))
    }
}
