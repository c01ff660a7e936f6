use crate::{BulkCopy, ExecuteKind, ExecuteOutcome, Result, RowLabeled, Statement};

/// Transaction isolation requested from the backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Schema metadata collections every provider must answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCollection {
    DataSourceInformation,
    ReservedWords,
    Tables,
}

impl SchemaCollection {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaCollection::DataSourceInformation => "data-source-information",
            SchemaCollection::ReservedWords => "reserved-words",
            SchemaCollection::Tables => "tables",
        }
    }
}

/// Opaque handle for a transaction open on a provider connection.
pub type TransactionToken = u64;

/// A backing database client, treated as an opaque factory of connections.
///
/// The provider is the only dialect-aware party: everything the layer needs
/// to know about quoting and parameter syntax is read back out of the
/// connection's schema collections, never hard-coded.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a connection handle for the given connection string. The
    /// handle starts closed, [`ProviderConnection::open`] establishes it.
    fn connect(&self, connection_string: &str) -> Result<Box<dyn ProviderConnection>>;

    /// Identifier quote prefix the client's command builder reports, if any.
    fn quote_prefix(&self) -> Option<&str> {
        None
    }
    fn quote_suffix(&self) -> Option<&str> {
        None
    }

    /// Optional batched-write fast path. Defaults to none: bulk insert then
    /// fails with a not-supported error.
    fn bulk_copy(&self) -> Option<&dyn BulkCopy> {
        None
    }
}

/// A single native connection. Transactions are opaque tokens handed out by
/// `begin` and consumed by `commit`/`rollback`; statements execute in the
/// order submitted, one in flight at a time.
pub trait ProviderConnection: Send {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;

    fn get_schema(&mut self, collection: SchemaCollection) -> Result<Vec<RowLabeled>>;

    fn begin(&mut self, isolation: Isolation) -> Result<TransactionToken>;
    fn commit(&mut self, token: TransactionToken) -> Result<()>;
    fn rollback(&mut self, token: TransactionToken) -> Result<()>;

    fn execute(
        &mut self,
        statement: &Statement,
        transaction: Option<TransactionToken>,
        kind: ExecuteKind,
    ) -> Result<ExecuteOutcome>;

    /// Best-effort cancellation of the in-flight statement, forwarded to the
    /// native client. Does not guarantee a rollback.
    fn cancel(&mut self) -> Result<()>;
}
