use crate::{TransactionState, Value};

/// Lifecycle state of an observable connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    /// The native connection failed while closing and can no longer be used.
    Broken,
}

/// The operation a command event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOperation {
    NonQuery,
    Scalar,
    Reader,
    Cancel,
    Dispose,
}

/// Compact description of an execution result, carried on command events so
/// observers can build audit trails without touching the result itself.
#[derive(Debug, Clone)]
pub enum ExecuteSummary {
    Affected(u64),
    Scalar(Value),
    Rows(usize),
}

/// Snapshot delivered to observers every time a command executes, cancels or
/// is disposed.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub command_id: u64,
    pub operation: CommandOperation,
    pub result: Option<ExecuteSummary>,
}

/// Subscription interface for connection lifecycle notifications.
///
/// Observers are invoked synchronously after each transition; they observe
/// but cannot block or veto it. All methods default to no-ops so a subscriber
/// implements only what it cares about.
pub trait ConnectionObserver: Send + Sync {
    fn connection_state_changed(&self, _state: ConnectionState) {}
    fn transaction_state_changed(&self, _transaction_id: u64, _state: TransactionState) {}
    fn command_executed(&self, _event: &CommandEvent) {}
}
