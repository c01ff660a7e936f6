use crate::{Result, Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
    time::Duration,
};

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
        }
    }
}

/// A named value bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Marker-prefixed parameter name, as the backend expects it.
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// SQL text together with its bound parameters, ready for the provider.
#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Parameter>,
    pub timeout: Option<Duration>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
            timeout: None,
        }
    }
    pub fn with_params(mut self, params: Vec<Parameter>) -> Self {
        self.params = params;
        self
    }
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.text))
    }
}

/// What the caller asked the backend to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteKind {
    NonQuery,
    Scalar,
    Reader,
}

/// Heterogeneous result of a single provider execution.
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// A modify effect aggregation.
    Affected(RowsAffected),
    /// A single value, first column of the first row.
    Scalar(Value),
    /// Materialized labeled rows.
    Rows(Vec<RowLabeled>),
}

/// Materializes a typed record out of a labeled row.
pub trait FromRow: Sized {
    fn from_row(row: &RowLabeled) -> Result<Self>;
}
