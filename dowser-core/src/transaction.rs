use crate::{
    BulkCopy, Command, Connection, ConnectionInner, DataError, ExecuteKind, ExecuteOutcome,
    Isolation, Result, Statement, TabularData, TransactionToken,
};
use std::sync::{Arc, Mutex, Weak};

/// Lifecycle of a transaction.
///
/// `Open` is the initial state; exactly one of `Committed`/`RolledBack`
/// applies per instance, `Completed` always follows either, and `Disposed`
/// is terminal and always reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
    Completed,
    Disposed,
}

impl TransactionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance(self, next: TransactionState) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Open, Committed)
                | (Open, RolledBack)
                | (Committed, Completed)
                | (RolledBack, Completed)
                | (Open, Disposed)
                | (Completed, Disposed)
        )
    }
}

pub(crate) struct TransactionCore {
    pub(crate) id: u64,
    pub(crate) token: TransactionToken,
    pub(crate) isolation: Isolation,
    pub(crate) state: Mutex<TransactionState>,
}

impl TransactionCore {
    pub(crate) fn state(&self) -> TransactionState {
        *self.state.lock().unwrap()
    }

    /// Guarded transition; an illegal edge (double commit, commit after
    /// rollback) is an error and leaves the state untouched.
    pub(crate) fn advance(&self, next: TransactionState) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.can_advance(next) {
            return Err(DataError::execution(format!(
                "transaction {}: illegal state transition {:?} -> {:?}",
                self.id, *state, next
            )));
        }
        *state = next;
        Ok(())
    }
}

/// An observable transaction on a connection.
///
/// Dropping a still-open transaction rolls it back before releasing it, so
/// the scoped-resource guarantee holds on every exit path.
pub struct Transaction {
    pub(crate) connection: Weak<ConnectionInner>,
    pub(crate) core: Arc<TransactionCore>,
    /// Present when the transaction owns the connection it runs on; that
    /// connection is disposed once the transaction completes.
    pub(crate) owned_connection: Option<Connection>,
}

impl Transaction {
    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn isolation(&self) -> Isolation {
        self.core.isolation
    }

    pub fn state(&self) -> TransactionState {
        self.core.state()
    }

    /// Commits against the backend, then walks `Open -> Committed ->
    /// Completed`, notifying observers on each transition.
    pub fn commit(&self) -> Result<()> {
        self.upgrade()?.complete_transaction(&self.core, true)
    }

    /// Rolls back against the backend, then walks `Open -> RolledBack ->
    /// Completed`, notifying observers on each transition.
    pub fn rollback(&self) -> Result<()> {
        self.upgrade()?.complete_transaction(&self.core, false)
    }

    /// Releases the transaction, rolling back first when still open.
    pub fn dispose(self) {}

    pub(crate) fn upgrade(&self) -> Result<Arc<ConnectionInner>> {
        self.connection.upgrade().ok_or_else(|| {
            DataError::execution(format!(
                "transaction {}: owning connection has been disposed",
                self.core.id
            ))
        })
    }

    pub(crate) fn execute(
        &self,
        statement: Statement,
        kind: ExecuteKind,
    ) -> Result<ExecuteOutcome> {
        let connection = self.upgrade()?;
        let mut command = Command::attach(&connection, statement.text);
        command.params = statement.params;
        command.timeout = statement.timeout;
        command.transaction = Some(self.core.clone());
        command.run(kind)
    }

    pub(crate) fn bulk_write(
        &self,
        strategy: &dyn BulkCopy,
        table: &TabularData,
        batch_size: usize,
        timeout: Option<std::time::Duration>,
    ) -> Result<u64> {
        let state = self.core.state();
        if state != TransactionState::Open {
            return Err(DataError::execution(format!(
                "transaction {} is {:?}, a bulk transfer needs an open transaction",
                self.core.id, state
            )));
        }
        self.upgrade()?
            .bulk_write(strategy, self.core.token, table, batch_size, timeout)
    }

    /// Runs `f` with the owning connection opened, restoring the closed
    /// state afterwards. The transaction itself is not committed here; that
    /// stays with whoever began it.
    pub(crate) fn run_scoped<R>(
        &self,
        f: impl FnOnce(&Transaction) -> Result<R>,
    ) -> Result<R> {
        let connection = self.upgrade()?;
        let was_closed = !connection.is_open();
        if was_closed {
            connection.open()?;
        }
        let result = f(self);
        if was_closed {
            if let Err(e) = connection.close() {
                log::error!("{:#}", e);
            }
        }
        result
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.finish_transaction(&self.core);
        }
        // Dropping an owned connection disposes it.
        self.owned_connection.take();
    }
}
