use crate::{
    BulkCopy, Command, CommandCore, CommandEvent, CommandOperation, ConnectionObserver,
    ConnectionState, DataError, ExecuteKind, ExecuteOutcome, ExecuteSummary, Isolation,
    ProviderConnection, Result, RowLabeled, SchemaCollection, Statement, TabularData, Transaction,
    TransactionCore, TransactionState, TransactionToken,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

pub(crate) struct ConnectionInner {
    native: Mutex<Box<dyn ProviderConnection>>,
    state: Mutex<ConnectionState>,
    commands: Mutex<Vec<Arc<CommandCore>>>,
    transactions: Mutex<Vec<Arc<TransactionCore>>>,
    observers: Mutex<Vec<Arc<dyn ConnectionObserver>>>,
    next_id: AtomicU64,
}

impl ConnectionInner {
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn observers(&self) -> Vec<Arc<dyn ConnectionObserver>> {
        self.observers.lock().unwrap().clone()
    }

    fn notify_connection_state(&self, state: ConnectionState) {
        for observer in self.observers() {
            observer.connection_state_changed(state);
        }
    }

    pub(crate) fn notify_transaction_state(&self, transaction_id: u64, state: TransactionState) {
        for observer in self.observers() {
            observer.transaction_state_changed(transaction_id, state);
        }
    }

    pub(crate) fn notify_command(&self, event: &CommandEvent) {
        for observer in self.observers() {
            observer.command_executed(event);
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub(crate) fn open(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        self.native.lock().unwrap().open()?;
        *self.state.lock().unwrap() = ConnectionState::Open;
        self.notify_connection_state(ConnectionState::Open);
        Ok(())
    }

    /// Tears the connection down, innermost resources first: every still
    /// active command is cancelled and disposed, every still active
    /// transaction is rolled back and disposed, then the native connection
    /// closes. Idempotent; nothing dangling survives, even when the caller
    /// forgot to release children.
    pub(crate) fn close(&self) -> Result<()> {
        let was_open = self.is_open();
        // The registries are drained under their locks; the walk itself runs
        // outside them so child deregistration cannot deadlock.
        let commands: Vec<_> = std::mem::take(&mut *self.commands.lock().unwrap());
        let transactions: Vec<_> = std::mem::take(&mut *self.transactions.lock().unwrap());
        for command in &commands {
            self.dispose_command(command, was_open);
        }
        for transaction in &transactions {
            self.finish_transaction(transaction);
        }
        if !was_open {
            return Ok(());
        }
        let closed = self.native.lock().unwrap().close();
        match closed {
            Ok(()) => {
                *self.state.lock().unwrap() = ConnectionState::Closed;
                self.notify_connection_state(ConnectionState::Closed);
                Ok(())
            }
            Err(error) => {
                *self.state.lock().unwrap() = ConnectionState::Broken;
                self.notify_connection_state(ConnectionState::Broken);
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    pub(crate) fn get_schema(&self, collection: SchemaCollection) -> Result<Vec<RowLabeled>> {
        self.open()?;
        self.native.lock().unwrap().get_schema(collection)
    }

    pub(crate) fn register_command(&self, core: Arc<CommandCore>) {
        self.commands.lock().unwrap().push(core);
    }

    /// Disposes one command: optionally cancels it first (connection
    /// teardown), fires the events and removes it from the registry.
    pub(crate) fn dispose_command(&self, core: &Arc<CommandCore>, cancel: bool) {
        if core.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if cancel {
            if let Err(e) = self.native.lock().unwrap().cancel() {
                log::error!("{:#}", e);
            }
            self.notify_command(&CommandEvent {
                command_id: core.id,
                operation: CommandOperation::Cancel,
                result: None,
            });
        }
        self.notify_command(&CommandEvent {
            command_id: core.id,
            operation: CommandOperation::Dispose,
            result: None,
        });
        self.commands.lock().unwrap().retain(|c| c.id != core.id);
    }

    pub(crate) fn cancel_native(&self) -> Result<()> {
        self.native.lock().unwrap().cancel()
    }

    pub(crate) fn execute_command(
        &self,
        core: &Arc<CommandCore>,
        statement: &Statement,
        transaction: Option<&TransactionCore>,
        kind: ExecuteKind,
    ) -> Result<ExecuteOutcome> {
        if core.disposed.load(Ordering::SeqCst) {
            return Err(DataError::execution(format!(
                "command {} has been disposed",
                core.id
            )));
        }
        if let Some(transaction) = transaction {
            let state = transaction.state();
            if state != TransactionState::Open {
                return Err(DataError::execution(format!(
                    "transaction {} is {:?}, commands need an open transaction",
                    transaction.id, state
                )));
            }
        }
        let result = self.native.lock().unwrap().execute(
            statement,
            transaction.map(|t| t.token),
            kind,
        );
        match result {
            Ok(outcome) => {
                let operation = match kind {
                    ExecuteKind::NonQuery => CommandOperation::NonQuery,
                    ExecuteKind::Scalar => CommandOperation::Scalar,
                    ExecuteKind::Reader => CommandOperation::Reader,
                };
                let summary = match &outcome {
                    ExecuteOutcome::Affected(affected) => {
                        ExecuteSummary::Affected(affected.rows_affected)
                    }
                    ExecuteOutcome::Scalar(value) => ExecuteSummary::Scalar(value.clone()),
                    ExecuteOutcome::Rows(rows) => ExecuteSummary::Rows(rows.len()),
                };
                self.notify_command(&CommandEvent {
                    command_id: core.id,
                    operation,
                    result: Some(summary),
                });
                Ok(outcome)
            }
            Err(error) => {
                let error = error.context(format!("While executing:\n{}", statement));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Commit or rollback, then walk the state machine, one notification per
    /// transition. A provider failure leaves the transaction open and
    /// surfaces as-is.
    pub(crate) fn complete_transaction(
        &self,
        core: &Arc<TransactionCore>,
        commit: bool,
    ) -> Result<()> {
        let state = core.state();
        if state != TransactionState::Open {
            return Err(DataError::execution(format!(
                "transaction {} is {:?}, only an open transaction can {}",
                core.id,
                state,
                if commit { "commit" } else { "roll back" }
            )));
        }
        {
            let mut native = self.native.lock().unwrap();
            if commit {
                native.commit(core.token)?;
            } else {
                native.rollback(core.token)?;
            }
        }
        let next = if commit {
            TransactionState::Committed
        } else {
            TransactionState::RolledBack
        };
        core.advance(next)?;
        self.notify_transaction_state(core.id, next);
        core.advance(TransactionState::Completed)?;
        self.notify_transaction_state(core.id, TransactionState::Completed);
        Ok(())
    }

    /// Rolls back when still open, then disposes and deregisters. Used by
    /// `Transaction::drop` and the connection teardown walk.
    pub(crate) fn finish_transaction(&self, core: &Arc<TransactionCore>) {
        if core.state() == TransactionState::Open {
            if let Err(e) = self.native.lock().unwrap().rollback(core.token) {
                log::error!("{:#}", e);
            }
            if core.advance(TransactionState::RolledBack).is_ok() {
                self.notify_transaction_state(core.id, TransactionState::RolledBack);
                let _ = core.advance(TransactionState::Completed);
                self.notify_transaction_state(core.id, TransactionState::Completed);
            }
        }
        if core.state() != TransactionState::Disposed && core.advance(TransactionState::Disposed).is_ok() {
            self.notify_transaction_state(core.id, TransactionState::Disposed);
        }
        self.transactions.lock().unwrap().retain(|t| t.id != core.id);
    }

    pub(crate) fn begin(inner: &Arc<ConnectionInner>, isolation: Isolation) -> Result<Transaction> {
        let token = inner.native.lock().unwrap().begin(isolation)?;
        let core = Arc::new(TransactionCore {
            id: inner.next_id(),
            token,
            isolation,
            state: Mutex::new(TransactionState::Open),
        });
        inner.transactions.lock().unwrap().push(core.clone());
        Ok(Transaction {
            connection: Arc::downgrade(inner),
            core,
            owned_connection: None,
        })
    }

    pub(crate) fn bulk_write(
        &self,
        strategy: &dyn BulkCopy,
        token: TransactionToken,
        table: &TabularData,
        batch_size: usize,
        timeout: Option<std::time::Duration>,
    ) -> Result<u64> {
        let mut native = self.native.lock().unwrap();
        strategy.write(&mut **native, token, table, batch_size, timeout)
    }

    pub(crate) fn active_commands(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub(crate) fn active_transactions(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

/// An observable connection around a provider's native connection.
///
/// The connection is the owner of every command and transaction created from
/// it: both are registered at creation, deregistered when they complete
/// disposal, and torn down in order (commands, transactions, native handle)
/// when the connection closes or is dropped.
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn new(native: Box<dyn ProviderConnection>) -> Self {
        let state = if native.is_open() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        };
        Self {
            inner: Arc::new(ConnectionInner {
                native: Mutex::new(native),
                state: Mutex::new(state),
                commands: Mutex::new(Vec::new()),
                transactions: Mutex::new(Vec::new()),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Arc<ConnectionInner> {
        &self.inner
    }

    /// Subscribes an observer to state, transaction and command events.
    pub fn add_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        self.inner.observers.lock().unwrap().push(observer);
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn open(&self) -> Result<()> {
        self.inner.open()
    }

    /// Closes the connection, cascading over still-active commands and
    /// transactions first. The preferred way of releasing a connection;
    /// dropping it does the same.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }

    /// Schema metadata pass-through, opening the connection when needed.
    pub fn get_schema(&self, collection: SchemaCollection) -> Result<Vec<RowLabeled>> {
        self.inner.get_schema(collection)
    }

    /// Creates and registers a command on this connection.
    pub fn create_command(&self, text: impl Into<String>) -> Command {
        Command::attach(&self.inner, text.into())
    }

    /// Starts and registers a transaction on this connection.
    pub fn begin_transaction(&self, isolation: Isolation) -> Result<Transaction> {
        ConnectionInner::begin(&self.inner, isolation)
    }

    /// Number of commands currently registered on the connection.
    pub fn active_commands(&self) -> usize {
        self.inner.active_commands()
    }

    /// Number of transactions currently registered on the connection.
    pub fn active_transactions(&self) -> usize {
        self.inner.active_transactions()
    }

    /// Runs `f` inside a fresh transaction: commits on success, rolls back
    /// on failure, and restores the connection's closed state when this call
    /// was the one to open it.
    pub fn execute_in_transaction<R>(
        &self,
        isolation: Isolation,
        f: impl FnOnce(&Transaction) -> Result<R>,
    ) -> Result<R> {
        let was_closed = !self.is_open();
        if was_closed {
            self.open()?;
        }
        let transaction = self.begin_transaction(isolation)?;
        match f(&transaction) {
            Ok(value) => {
                transaction.commit()?;
                if was_closed {
                    self.close()?;
                }
                Ok(value)
            }
            Err(error) => {
                if let Err(e) = transaction.rollback() {
                    log::error!("{:#}", e);
                }
                drop(transaction);
                if was_closed {
                    let _ = self.close();
                }
                Err(error)
            }
        }
    }

}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            log::error!("{:#}", e);
        }
    }
}
