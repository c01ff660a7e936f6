#![allow(dead_code)]

use dowser::{
    BulkCopy, Error, ExecuteKind, ExecuteOutcome, FieldDef, FromRow, Isolation, Parameter,
    Provider, ProviderConnection, Record, Result, RowLabeled, RowsAffected, SchemaCollection,
    Statement, TabularData, TransactionToken, Value,
};
use log::LevelFilter;
use rust_decimal::Decimal;
use std::{
    collections::VecDeque,
    env,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
    RowLabeled::new(
        labels.iter().map(|l| l.to_string()).collect(),
        values.into_boxed_slice(),
    )
}

/// Capability answers the mock backend reports through its
/// data-source-information collection.
#[derive(Debug, Clone)]
pub struct MockProfile {
    pub quote_prefix: Option<&'static str>,
    pub quote_suffix: Option<&'static str>,
    pub marker_format: &'static str,
    pub marker_pattern: &'static str,
    pub name_max_length: i64,
    pub name_pattern: &'static str,
    pub separator_pattern: &'static str,
    pub tables: Vec<&'static str>,
}

impl MockProfile {
    fn tables() -> Vec<&'static str> {
        vec!["Widget", "Invoice", "Memo", "Route", "Gadget", "journal"]
    }

    /// Named `@name` markers, default `"` quoting, SQL Server-ish limits.
    pub fn named() -> Self {
        Self {
            quote_prefix: None,
            quote_suffix: None,
            marker_format: "@{0}",
            marker_pattern: "@[A-Za-z_][A-Za-z0-9_]*",
            name_max_length: 128,
            name_pattern: "^[@A-Za-z_][A-Za-z0-9_]*$",
            separator_pattern: "\\.",
            tables: Self::tables(),
        }
    }

    /// Positional `?` markers, no parameter names at all.
    pub fn positional() -> Self {
        Self {
            marker_format: "?",
            marker_pattern: "",
            name_max_length: 0,
            name_pattern: "",
            ..Self::named()
        }
    }

    /// Bracket-quoting backend, `[name]` style.
    pub fn bracketed() -> Self {
        Self {
            quote_prefix: Some("["),
            quote_suffix: Some("]"),
            ..Self::named()
        }
    }

    /// Tight name limit to exercise truncation.
    pub fn short_names() -> Self {
        Self {
            name_max_length: 6,
            ..Self::named()
        }
    }
}

/// One statement as the mock backend received it.
#[derive(Debug, Clone)]
pub struct ExecutedStatement {
    pub text: String,
    pub params: Vec<Parameter>,
    pub transaction: Option<TransactionToken>,
    pub kind: ExecuteKind,
}

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub cancels: AtomicUsize,
}

pub struct MockState {
    pub profile: MockProfile,
    pub counters: Counters,
    pub executed: Mutex<Vec<ExecutedStatement>>,
    pub schema_requests: Mutex<Vec<SchemaCollection>>,
    pub responses: Mutex<VecDeque<ExecuteOutcome>>,
    pub fail_next_execute: AtomicBool,
    pub fail_bulk: AtomicBool,
    pub bulk_batches: Mutex<Vec<(Vec<&'static str>, usize)>>,
    next_token: AtomicU64,
}

impl MockState {
    pub fn new(profile: MockProfile) -> Arc<Self> {
        Arc::new(Self {
            profile,
            counters: Counters::default(),
            executed: Mutex::new(Vec::new()),
            schema_requests: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            fail_next_execute: AtomicBool::new(false),
            fail_bulk: AtomicBool::new(false),
            bulk_batches: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        })
    }

    pub fn push_response(&self, outcome: ExecuteOutcome) {
        self.responses.lock().unwrap().push_back(outcome);
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.executed.lock().unwrap().clone()
    }

    pub fn count(&self, counter: impl Fn(&Counters) -> &AtomicUsize) -> usize {
        counter(&self.counters).load(Ordering::SeqCst)
    }

    pub fn schema_requests_for(&self, collection: SchemaCollection) -> usize {
        self.schema_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == collection)
            .count()
    }
}

pub struct MockProvider {
    pub state: Arc<MockState>,
    bulk: Option<MockBulkCopy>,
}

impl MockProvider {
    pub fn new(profile: MockProfile) -> Self {
        Self {
            state: MockState::new(profile),
            bulk: None,
        }
    }

    pub fn with_bulk(profile: MockProfile) -> Self {
        let state = MockState::new(profile);
        Self {
            bulk: Some(MockBulkCopy {
                state: state.clone(),
            }),
            state,
        }
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mockdb"
    }

    fn connect(&self, _connection_string: &str) -> Result<Box<dyn ProviderConnection>> {
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            open: false,
        }))
    }

    fn quote_prefix(&self) -> Option<&str> {
        self.state.profile.quote_prefix
    }

    fn quote_suffix(&self) -> Option<&str> {
        self.state.profile.quote_suffix
    }

    fn bulk_copy(&self) -> Option<&dyn BulkCopy> {
        self.bulk.as_ref().map(|b| b as &dyn BulkCopy)
    }
}

struct MockConnection {
    state: Arc<MockState>,
    open: bool,
}

impl MockConnection {
    fn info_rows(&self) -> Vec<RowLabeled> {
        let profile = &self.state.profile;
        vec![row(
            &[
                "CompositeIdentifierSeparatorPattern",
                "DataSourceProductName",
                "DataSourceProductVersion",
                "GroupByBehavior",
                "IdentifierCase",
                "OrderByColumnsInSelect",
                "ParameterMarkerFormat",
                "ParameterMarkerPattern",
                "ParameterNameMaxLength",
                "ParameterNamePattern",
                "QuotedIdentifierCase",
                "StatementSeparatorPattern",
                "SupportedJoinOperators",
            ],
            vec![
                Value::from(profile.separator_pattern),
                Value::from("Mockbase"),
                Value::from("1.0"),
                Value::from(3i64),
                Value::from(1i64),
                Value::from(false),
                Value::from(profile.marker_format),
                Value::from(profile.marker_pattern),
                Value::from(profile.name_max_length),
                Value::from(profile.name_pattern),
                Value::from(2i64),
                Value::from(";"),
                Value::from(3i64),
            ],
        )]
    }
}

impl ProviderConnection for MockConnection {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.state.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.state.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn get_schema(&mut self, collection: SchemaCollection) -> Result<Vec<RowLabeled>> {
        if !self.open {
            return Err(Error::msg("connection is not open"));
        }
        self.state.schema_requests.lock().unwrap().push(collection);
        Ok(match collection {
            SchemaCollection::DataSourceInformation => self.info_rows(),
            SchemaCollection::ReservedWords => ["SELECT", "FROM", "WHERE", "TABLE"]
                .iter()
                .map(|word| row(&["ReservedWord"], vec![Value::from(*word)]))
                .collect(),
            SchemaCollection::Tables => self
                .state
                .profile
                .tables
                .iter()
                .map(|table| row(&["TABLE_NAME"], vec![Value::from(*table)]))
                .collect(),
        })
    }

    fn begin(&mut self, _isolation: Isolation) -> Result<TransactionToken> {
        if !self.open {
            return Err(Error::msg("cannot begin a transaction on a closed connection"));
        }
        self.state.counters.begins.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.next_token.fetch_add(1, Ordering::SeqCst))
    }

    fn commit(&mut self, _token: TransactionToken) -> Result<()> {
        self.state.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self, _token: TransactionToken) -> Result<()> {
        self.state.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(
        &mut self,
        statement: &Statement,
        transaction: Option<TransactionToken>,
        kind: ExecuteKind,
    ) -> Result<ExecuteOutcome> {
        if !self.open {
            return Err(Error::msg("cannot execute on a closed connection"));
        }
        if self.state.fail_next_execute.swap(false, Ordering::SeqCst) {
            return Err(Error::msg("mock execution failure"));
        }
        self.state.executed.lock().unwrap().push(ExecutedStatement {
            text: statement.text.clone(),
            params: statement.params.clone(),
            transaction,
            kind,
        });
        if let Some(outcome) = self.state.responses.lock().unwrap().pop_front() {
            return Ok(outcome);
        }
        Ok(match kind {
            ExecuteKind::NonQuery => ExecuteOutcome::Affected(RowsAffected { rows_affected: 1 }),
            ExecuteKind::Scalar => ExecuteOutcome::Scalar(Value::Null),
            ExecuteKind::Reader => ExecuteOutcome::Rows(Vec::new()),
        })
    }

    fn cancel(&mut self) -> Result<()> {
        self.state.counters.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockBulkCopy {
    state: Arc<MockState>,
}

impl BulkCopy for MockBulkCopy {
    fn write(
        &self,
        _connection: &mut dyn ProviderConnection,
        _transaction: TransactionToken,
        table: &TabularData,
        batch_size: usize,
        _timeout: Option<Duration>,
    ) -> Result<u64> {
        if self.state.fail_bulk.load(Ordering::SeqCst) {
            return Err(Error::msg("mock bulk transfer failure"));
        }
        let mut written = 0;
        for batch in table.rows.chunks(batch_size.max(1)) {
            self.state
                .bulk_batches
                .lock()
                .unwrap()
                .push((table.columns.clone(), batch.len()));
            written += batch.len() as u64;
        }
        Ok(written)
    }
}

// Record types shared by the suites.

pub struct Widget {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
}

impl FromRow for Widget {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row
                .get_column("Id")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::msg("row is missing `Id`"))? as i32,
            name: row
                .get_column("Name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            price: match row.get_column("Price") {
                Some(Value::Decimal(Some(price))) => *price,
                _ => Decimal::ZERO,
            },
        })
    }
}

impl Record for Widget {
    fn table_name() -> &'static str {
        "Widget"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 3] = [
            FieldDef::key("Id"),
            FieldDef::new("Name"),
            FieldDef::new("Price"),
        ];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([
            ("Id", Value::from(self.id)),
            ("Name", Value::from(self.name.clone())),
            ("Price", Value::from(self.price)),
        ])
    }
}

pub fn widget_row(id: i32, name: &str, price: Decimal) -> RowLabeled {
    row(
        &["Id", "Name", "Price"],
        vec![Value::from(id), Value::from(name), Value::from(price)],
    )
}

/// Key inferred from the `id` field, computed and non-writable columns.
pub struct Invoice {
    pub id: i32,
    pub number: String,
    pub total: Decimal,
    pub etag: String,
}

impl FromRow for Invoice {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row.get_column("id").and_then(Value::as_i64).unwrap_or(0) as i32,
            number: row
                .get_column("number")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            total: match row.get_column("total") {
                Some(Value::Decimal(Some(total))) => *total,
                _ => Decimal::ZERO,
            },
            etag: row
                .get_column("etag")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

impl Record for Invoice {
    fn table_name() -> &'static str {
        "Invoice"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 4] = [
            FieldDef::new("id"),
            FieldDef::new("number"),
            FieldDef::computed("total"),
            FieldDef::read_only("etag"),
        ];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([
            ("id", Value::from(self.id)),
            ("number", Value::from(self.number.clone())),
            ("total", Value::from(self.total)),
            ("etag", Value::from(self.etag.clone())),
        ])
    }
}

/// No key, no explicit key, no `id`.
#[derive(Debug)]
pub struct Memo {
    pub title: String,
    pub body: String,
}

impl FromRow for Memo {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            title: row
                .get_column("Title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            body: row
                .get_column("Body")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

impl Record for Memo {
    fn table_name() -> &'static str {
        "Memo"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 2] = [FieldDef::new("Title"), FieldDef::new("Body")];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([
            ("Title", Value::from(self.title.clone())),
            ("Body", Value::from(self.body.clone())),
        ])
    }
}

/// Two caller-assigned keys: ineligible for single-key operations.
#[derive(Debug)]
pub struct Route {
    pub origin: String,
    pub target: String,
    pub distance: f64,
}

impl FromRow for Route {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            origin: row
                .get_column("Origin")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            target: row
                .get_column("Target")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            distance: match row.get_column("Distance") {
                Some(Value::Float64(Some(distance))) => *distance,
                _ => 0.0,
            },
        })
    }
}

impl Record for Route {
    fn table_name() -> &'static str {
        "Route"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 3] = [
            FieldDef::explicit_key("Origin"),
            FieldDef::explicit_key("Target"),
            FieldDef::new("Distance"),
        ];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([
            ("Origin", Value::from(self.origin.clone())),
            ("Target", Value::from(self.target.clone())),
            ("Distance", Value::from(self.distance)),
        ])
    }
}

/// One explicit (caller-assigned) key.
pub struct Gadget {
    pub serial: String,
    pub label: String,
}

impl FromRow for Gadget {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            serial: row
                .get_column("Serial")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            label: row
                .get_column("Label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

impl Record for Gadget {
    fn table_name() -> &'static str {
        "Gadget"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 2] = [FieldDef::explicit_key("Serial"), FieldDef::new("Label")];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([
            ("Serial", Value::from(self.serial.clone())),
            ("Label", Value::from(self.label.clone())),
        ])
    }
}

/// Mapped to a table the live schema does not contain.
pub struct Ghost {
    pub id: i32,
}

impl FromRow for Ghost {
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row.get_column("Id").and_then(Value::as_i64).unwrap_or(0) as i32,
        })
    }
}

impl Record for Ghost {
    fn table_name() -> &'static str {
        "Ghost"
    }
    fn fields() -> &'static [FieldDef] {
        static FIELDS: [FieldDef; 1] = [FieldDef::key("Id")];
        &FIELDS
    }
    fn row(&self) -> Box<[(&'static str, Value)]> {
        Box::new([("Id", Value::from(self.id))])
    }
}
