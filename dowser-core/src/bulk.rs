use crate::{ProviderConnection, Record, Result, Row, TransactionToken};
use std::time::Duration;

/// In-memory tabular image of a homogeneous record collection, handed to a
/// bulk strategy. Column order matches the destination table's columns
/// one-to-one.
#[derive(Debug)]
pub struct TabularData {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Row>,
}

impl TabularData {
    pub fn from_records<T: Record>(records: &[T]) -> Self {
        let columns: Vec<&'static str> = T::fields().iter().map(|f| f.name).collect();
        let rows = records
            .iter()
            .map(|record| {
                let values = record.row();
                columns
                    .iter()
                    .map(|column| {
                        values
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Self {
            name: T::table_name(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Provider-specific batched-write fast path.
///
/// Implementations transfer the whole table in batches of `batch_size`
/// within the given transaction; any failure must leave the transfer
/// abortable by rolling that transaction back.
pub trait BulkCopy: Send + Sync {
    fn write(
        &self,
        connection: &mut dyn ProviderConnection,
        transaction: TransactionToken,
        table: &TabularData,
        batch_size: usize,
        timeout: Option<Duration>,
    ) -> Result<u64>;
}
