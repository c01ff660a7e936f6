use crate::{FromRow, Value};

/// How a field participates in persistence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Regular readable and writable column.
    #[default]
    Normal,
    /// Database-generated key, excluded from INSERT and UPDATE column lists.
    Key,
    /// Caller-assigned key (e.g. a natural key): written on insert, never
    /// inferred, part of every WHERE key clause.
    ExplicitKey,
    /// Database-computed column, excluded from writes but read back.
    Computed,
}

/// Declarative descriptor of one persistable field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub role: FieldRole,
    /// Fields marked non-writable are invisible to the generator entirely.
    pub write: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Normal,
            write: true,
        }
    }
    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Key,
            write: true,
        }
    }
    pub const fn explicit_key(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::ExplicitKey,
            write: true,
        }
    }
    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Computed,
            write: true,
        }
    }
    pub const fn read_only(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Normal,
            write: false,
        }
    }
}

/// A plain record type the layer can persist.
///
/// The field table is registered ahead of time, once per type; the layer
/// never introspects values at runtime to discover shape.
pub trait Record: FromRow + Send + 'static {
    /// Unquoted table name, conventionally the type name.
    fn table_name() -> &'static str;

    /// Field descriptors, in destination column order.
    fn fields() -> &'static [FieldDef];

    /// Current field values, aligned by name with [`Record::fields`].
    fn row(&self) -> Box<[(&'static str, Value)]>;
}
