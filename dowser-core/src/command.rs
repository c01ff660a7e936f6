use crate::{
    CommandEvent, CommandOperation, ConnectionInner, DataError, Error, ExecuteKind,
    ExecuteOutcome, Parameter, Result, RowLabeled, Statement, Transaction, TransactionCore, Value,
};
use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

pub(crate) struct CommandCore {
    pub(crate) id: u64,
    pub(crate) disposed: AtomicBool,
}

/// An observable command on a connection.
///
/// Holds the SQL text, bound parameters and optional transaction binding;
/// every execution, cancellation and disposal notifies the connection's
/// observers. A command outlived by its connection's teardown refuses
/// further use.
pub struct Command {
    pub(crate) connection: Weak<ConnectionInner>,
    pub(crate) core: Arc<CommandCore>,
    pub(crate) text: String,
    pub(crate) params: Vec<Parameter>,
    pub(crate) transaction: Option<Arc<TransactionCore>>,
    pub(crate) timeout: Option<Duration>,
}

impl Command {
    /// Creates and registers a command on `connection`.
    pub(crate) fn attach(connection: &Arc<ConnectionInner>, text: String) -> Self {
        let core = Arc::new(CommandCore {
            id: connection.next_id(),
            disposed: AtomicBool::new(false),
        });
        connection.register_command(core.clone());
        Self {
            connection: Arc::downgrade(connection),
            core,
            text,
            params: Vec::new(),
            transaction: None,
            timeout: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    /// Appends a bound parameter.
    pub fn bind(&mut self, parameter: Parameter) -> &mut Self {
        self.params.push(parameter);
        self
    }

    pub fn set_transaction(&mut self, transaction: &Transaction) -> &mut Self {
        self.transaction = Some(transaction.core.clone());
        self
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn execute_non_query(&self) -> Result<u64> {
        match self.run(ExecuteKind::NonQuery)? {
            ExecuteOutcome::Affected(affected) => Ok(affected.rows_affected),
            _ => Err(Error::msg("provider returned rows for a non-query execution")),
        }
    }

    pub fn execute_scalar(&self) -> Result<Value> {
        match self.run(ExecuteKind::Scalar)? {
            ExecuteOutcome::Scalar(value) => Ok(value),
            ExecuteOutcome::Rows(rows) => Ok(rows
                .first()
                .and_then(|row| row.values.first().cloned())
                .unwrap_or(Value::Null)),
            _ => Err(Error::msg("provider returned no scalar for a scalar execution")),
        }
    }

    pub fn execute_reader(&self) -> Result<Vec<RowLabeled>> {
        match self.run(ExecuteKind::Reader)? {
            ExecuteOutcome::Rows(rows) => Ok(rows),
            _ => Err(Error::msg("provider returned no rows for a reader execution")),
        }
    }

    /// Best-effort cancellation, forwarded to the native command. A clean
    /// rollback is not implied; the caller decides what happens to the
    /// owning transaction.
    pub fn cancel(&self) -> Result<()> {
        let connection = self.upgrade()?;
        if self.core.disposed.load(Ordering::SeqCst) {
            return Err(DataError::execution(format!(
                "command {} has been disposed",
                self.core.id
            )));
        }
        connection.cancel_native()?;
        connection.notify_command(&CommandEvent {
            command_id: self.core.id,
            operation: CommandOperation::Cancel,
            result: None,
        });
        Ok(())
    }

    pub(crate) fn run(&self, kind: ExecuteKind) -> Result<ExecuteOutcome> {
        let connection = self.upgrade()?;
        let statement = Statement::new(self.text.clone())
            .with_params(self.params.clone())
            .with_timeout(self.timeout);
        connection.execute_command(&self.core, &statement, self.transaction.as_deref(), kind)
    }

    fn upgrade(&self) -> Result<Arc<ConnectionInner>> {
        self.connection.upgrade().ok_or_else(|| {
            DataError::execution(format!(
                "command {}: owning connection has been disposed",
                self.core.id
            ))
        })
    }
}

impl Drop for Command {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.dispose_command(&self.core, false);
        }
    }
}
