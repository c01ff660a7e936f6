use crate::{
    Connection, ConnectionInner, Context, DataError, Error, ExecuteKind, ExecuteOutcome, FieldDef,
    FromRow, Isolation, MetadataCache, Parameter, Provider, Record, Result, RowLabeled,
    RowsAffected, SchemaCollection, SourceInfo, Statement, TabularData, Transaction, Value,
    separated_by,
};
use once_cell::sync::OnceCell;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, Mutex, RwLock, Weak},
    time::Duration,
};
use uuid::Uuid;

/// The CRUD operations whose generated text is cached per record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Insert,
    Update,
    Delete,
    Fetch,
    FetchAll,
}

/// Tunables of an adapter, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct AdapterConfig {
    /// Isolation used for internally created transactions.
    pub isolation: Isolation,
    /// Command timeout handed to the provider.
    pub timeout: Option<Duration>,
    /// Batch size for the bulk-insert fast path.
    pub insert_batch_size: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            isolation: Isolation::default(),
            timeout: Some(Duration::from_secs(15)),
            insert_batch_size: 10_000,
        }
    }
}

/// The SQL generator and entry point of the data layer.
///
/// One adapter exists per distinct provider and connection-string pair. It
/// owns the capability data probed from the backend, the per-type metadata
/// and generated-command caches, and the registry of connections it has
/// produced; it outlives every connection it creates.
///
/// Nothing here is dialect-specific: quoting, parameter markers and naming
/// limits all come from the backend's own schema collections, probed lazily
/// the first time they are needed and reused for the adapter's lifetime.
pub struct Adapter {
    provider: Arc<dyn Provider>,
    connection_string: String,
    config: AdapterConfig,
    source_info: OnceCell<SourceInfo>,
    quote_prefix: OnceCell<String>,
    quote_suffix: OnceCell<String>,
    identifier_separator: OnceCell<char>,
    join_separator: OnceCell<String>,
    reserved_words: OnceCell<Vec<String>>,
    schema_tables: OnceCell<Vec<String>>,
    metadata: MetadataCache,
    commands: RwLock<HashMap<(TypeId, CommandKind), Arc<str>>>,
    connections: Mutex<Vec<Weak<ConnectionInner>>>,
}

impl Adapter {
    pub fn new(provider: Arc<dyn Provider>, connection_string: impl Into<String>) -> Self {
        Self::with_config(provider, connection_string, AdapterConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn Provider>,
        connection_string: impl Into<String>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            provider,
            connection_string: connection_string.into(),
            config,
            source_info: OnceCell::new(),
            quote_prefix: OnceCell::new(),
            quote_suffix: OnceCell::new(),
            identifier_separator: OnceCell::new(),
            join_separator: OnceCell::new(),
            reserved_words: OnceCell::new(),
            schema_tables: OnceCell::new(),
            metadata: MetadataCache::new(),
            commands: RwLock::new(HashMap::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Creates (and optionally opens) a new observable connection,
    /// registering it with the adapter.
    pub fn create_connection(&self, open: bool) -> Result<Connection> {
        let native = self.provider.connect(&self.connection_string)?;
        let connection = Connection::new(native);
        self.connections
            .lock()
            .unwrap()
            .push(Arc::downgrade(connection.inner()));
        if open {
            connection.open()?;
        }
        Ok(connection)
    }

    /// Connections created by this adapter and still alive.
    pub fn active_connections(&self) -> usize {
        let mut connections = self.connections.lock().unwrap();
        connections.retain(|c| c.upgrade().is_some());
        connections.len()
    }

    /// Connections created by this adapter and currently open.
    pub fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| c.is_open())
            .count()
    }

    /// Begins a transaction on a fresh connection owned by the transaction;
    /// the connection is disposed when the transaction completes.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        self.begin_transaction_with(self.config.isolation)
    }

    pub fn begin_transaction_with(&self, isolation: Isolation) -> Result<Transaction> {
        let connection = self.create_connection(true)?;
        let mut transaction = connection.begin_transaction(isolation)?;
        transaction.owned_connection = Some(connection);
        Ok(transaction)
    }

    // Capability probing. Each value is resolved once, on first use, from a
    // scoped connection that closes again when the probe completes.

    pub fn source_info(&self) -> Result<&SourceInfo> {
        self.source_info.get_or_try_init(|| {
            let connection = self.create_connection(true)?;
            let rows = connection
                .get_schema(SchemaCollection::DataSourceInformation)
                .with_context(|| {
                    format!(
                        "While probing data source information of `{}`",
                        self.provider.name()
                    )
                })?;
            SourceInfo::from_rows(&rows)
        })
    }

    pub fn reserved_words(&self) -> Result<&[String]> {
        self.reserved_words
            .get_or_try_init(|| {
                let connection = self.create_connection(true)?;
                let rows = connection.get_schema(SchemaCollection::ReservedWords)?;
                Ok(rows
                    .iter()
                    .filter_map(|row| row.get_column("ReservedWord"))
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect())
            })
            .map(Vec::as_slice)
    }

    /// Tables of the live schema, as the backend reports them.
    pub fn schema_tables(&self) -> Result<&[String]> {
        self.schema_tables
            .get_or_try_init(|| {
                let connection = self.create_connection(true)?;
                let rows = connection.get_schema(SchemaCollection::Tables)?;
                Ok(rows
                    .iter()
                    .filter_map(|row| row.get_column("TABLE_NAME"))
                    .filter_map(Value::as_str)
                    .map(|name| name.trim_matches('\'').to_string())
                    .collect())
            })
            .map(Vec::as_slice)
    }

    /// Identifier quote prefix: what the provider's command builder reports,
    /// or `"` when it reports none.
    pub fn quote_prefix(&self) -> &str {
        self.quote_prefix.get_or_init(|| {
            let reported = self.provider.quote_prefix().unwrap_or_default().trim();
            if reported.is_empty() {
                "\"".to_string()
            } else {
                reported.to_string()
            }
        })
    }

    pub fn quote_suffix(&self) -> &str {
        self.quote_suffix.get_or_init(|| {
            let reported = self.provider.quote_suffix().unwrap_or_default().trim();
            if reported.is_empty() {
                "\"".to_string()
            } else {
                reported.to_string()
            }
        })
    }

    /// The character joining qualified identifiers (`schema.table`), from
    /// the backend's composite-identifier pattern. Defaults to `.`.
    pub fn identifier_separator(&self) -> Result<char> {
        self.identifier_separator
            .get_or_try_init(|| {
                let pattern = self
                    .source_info()?
                    .composite_identifier_separator_pattern
                    .replace('\\', "");
                Ok(pattern.chars().next().unwrap_or('.'))
            })
            .map(|c| *c)
    }

    /// The sequence joining two quoted segments: suffix, separator, prefix.
    pub fn join_separator(&self) -> Result<&str> {
        self.join_separator
            .get_or_try_init(|| {
                Ok(format!(
                    "{}{}{}",
                    self.quote_suffix(),
                    self.identifier_separator()?,
                    self.quote_prefix()
                ))
            })
            .map(String::as_str)
    }

    /// Quotes an identifier, segment by segment for qualified names.
    /// Formatting an already-formatted name is a no-op.
    pub fn format(&self, item_name: &str) -> Result<String> {
        if item_name.is_empty() {
            return Ok(String::new());
        }
        let prefix = self.quote_prefix();
        let suffix = self.quote_suffix();
        let name = if item_name.contains(prefix) || item_name.contains(suffix) {
            self.unformat(item_name)?
        } else {
            item_name.to_string()
        };
        let separator = self.identifier_separator()?;
        let joined = if name.contains(separator) {
            name.split(separator)
                .collect::<Vec<_>>()
                .join(self.join_separator()?)
        } else {
            name
        };
        Ok(format!("{prefix}{joined}{suffix}"))
    }

    /// Left inverse of [`Adapter::format`]: strips one matching quote pair
    /// from every separator-delimited segment.
    pub fn unformat(&self, item_name: &str) -> Result<String> {
        if item_name.is_empty() {
            return Ok(String::new());
        }
        let prefix = self.quote_prefix();
        let suffix = self.quote_suffix();
        let separator = self.identifier_separator()?;
        let segments: Vec<String> = item_name
            .split(separator)
            .map(|item| {
                if item.len() > prefix.len() + suffix.len()
                    && item.starts_with(prefix)
                    && item.ends_with(suffix)
                {
                    item[prefix.len()..item.len() - suffix.len()].to_string()
                } else {
                    item.to_string()
                }
            })
            .collect();
        Ok(segments.join(&separator.to_string()))
    }

    /// `"column"=@column`, the building block of SET and WHERE lists.
    pub fn parameter_assignment(&self, column_name: &str) -> Result<String> {
        Ok(format!(
            "{}{}{}={}",
            self.quote_prefix(),
            column_name,
            self.quote_suffix(),
            self.parameter_name(column_name)?
        ))
    }

    /// Produces a marker-prefixed parameter name the backend will accept:
    /// truncated to the reported maximum, and replaced wholesale with a
    /// random token when it fails the backend's naming rule. Backends with
    /// strict naming must never receive a malformed name.
    pub fn parameter_name(&self, raw: &str) -> Result<String> {
        let info = self.source_info()?;
        let marker = info.parameter_marker();
        let max = info.parameter_name_max_length;
        if max < 1 {
            return Ok(marker.to_string());
        }
        let mut name = raw.to_string();
        if max < name.len() {
            name.truncate(max - 1);
        }
        if !info.parameter_name_regex()?.is_match(&name) {
            name = self.random_parameter_name(max);
        }
        if !name.starts_with(marker) {
            name = format!("{marker}{name}");
        }
        Ok(name)
    }

    /// Random alphanumeric token of bounded length, first character forced
    /// to a letter. Used only when a caller-supplied name fails validation.
    fn random_parameter_name(&self, length: usize) -> String {
        let length = if length == 0 || length > 8 { 8 } else { length };
        Uuid::new_v4()
            .as_bytes()
            .iter()
            .take(length)
            .enumerate()
            .map(|(i, b)| {
                let valid = b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit());
                if valid {
                    *b as char
                } else {
                    ((b % 26) + b'a') as char
                }
            })
            .collect()
    }

    /// Normalizes caller-written parameter prefixes in raw SQL to the
    /// backend's marker. Positional (`?`) backends keep the caller's prefix.
    pub fn format_command_text(&self, prefix: &str, command_text: &str) -> Result<String> {
        let info = self.source_info()?;
        let mut marker = info.parameter_marker_format.replace("{0}", "");
        if marker == "?" {
            marker = prefix.to_string();
        }
        if !marker.is_empty() && marker != prefix {
            return Ok(command_text.replace(prefix, &marker));
        }
        Ok(command_text.to_string())
    }

    /// Formatted (quoted) table name of a record type.
    pub fn table_name<T: Record>(&self) -> Result<String> {
        self.format(T::table_name())
    }

    /// Membership of `name` in the live schema, checked case-sensitively
    /// first and case-insensitively second; schema qualifiers are dropped.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let mut name = name
            .replace(self.quote_prefix(), "")
            .replace(self.quote_suffix(), "");
        let separator = self.identifier_separator()?;
        if let Some(last) = name.split(separator).next_back() {
            name = last.to_string();
        }
        let tables = self.schema_tables()?;
        Ok(tables.iter().any(|t| *t == name)
            || tables.iter().any(|t| t.eq_ignore_ascii_case(&name)))
    }

    // Command-text generation, cached per (record type, operation).

    pub fn command_text<T: Record>(&self, kind: CommandKind) -> Result<Arc<str>> {
        let key = (TypeId::of::<T>(), kind);
        if let Some(text) = self.commands.read().unwrap().get(&key) {
            return Ok(text.clone());
        }
        let text: Arc<str> = match kind {
            CommandKind::Insert => self.insert_text::<T>()?,
            CommandKind::Update => self.update_text::<T>()?,
            CommandKind::Delete => self.delete_text::<T>()?,
            CommandKind::Fetch => self.fetch_text::<T>(false)?,
            CommandKind::FetchAll => self.fetch_text::<T>(true)?,
        }
        .into();
        log::debug!("Generated {:?} for `{}`: {}", kind, T::table_name(), text);
        self.commands.write().unwrap().insert(key, text.clone());
        Ok(text)
    }

    fn insert_text<T: Record>(&self) -> Result<String> {
        let meta = self.metadata.get::<T>();
        let table = self.table_name::<T>()?;
        let fields = meta.insert_fields();
        let columns: Vec<String> = fields
            .iter()
            .map(|f| self.format(f.name))
            .collect::<Result<_>>()?;
        let names: Vec<String> = fields
            .iter()
            .map(|f| self.parameter_name(f.name))
            .collect::<Result<_>>()?;
        let mut column_list = String::new();
        separated_by(&mut column_list, &columns, |out, c| out.push_str(c), ", ");
        let mut parameter_list = String::new();
        separated_by(&mut parameter_list, &names, |out, p| out.push_str(p), ", ");
        Ok(format!(
            "INSERT INTO {table} ({column_list}) VALUES ({parameter_list})"
        ))
    }

    fn update_text<T: Record>(&self) -> Result<String> {
        let meta = self.metadata.get::<T>();
        if meta.combined_key_count() == 0 {
            return Err(DataError::argument(format!(
                "record type `{}` must have at least one key or explicit-key field",
                T::table_name()
            )));
        }
        self.metadata.single_key::<T>("Update")?;
        let table = self.table_name::<T>()?;
        let assignments: Vec<String> = meta
            .update_fields()
            .iter()
            .map(|f| self.parameter_assignment(f.name))
            .collect::<Result<_>>()?;
        let keys: Vec<String> = meta
            .combined_keys()
            .map(|f| self.parameter_assignment(f.name))
            .collect::<Result<_>>()?;
        let mut set_list = String::new();
        separated_by(&mut set_list, &assignments, |out, a| out.push_str(a), ", ");
        let mut where_list = String::new();
        separated_by(&mut where_list, &keys, |out, k| out.push_str(k), " AND ");
        Ok(format!("UPDATE {table} SET {set_list} WHERE {where_list}"))
    }

    fn delete_text<T: Record>(&self) -> Result<String> {
        let table = self.table_name::<T>()?;
        if !self.table_exists(&table)? {
            return Err(DataError::not_found(format!(
                "table {table} does not exist in the current database"
            )));
        }
        let meta = self.metadata.get::<T>();
        if meta.combined_key_count() == 0 {
            return Err(DataError::argument(format!(
                "record type `{}` must have at least one key or explicit-key field",
                T::table_name()
            )));
        }
        self.metadata.single_key::<T>("Delete")?;
        let keys: Vec<String> = meta
            .combined_keys()
            .map(|f| self.parameter_assignment(f.name))
            .collect::<Result<_>>()?;
        let mut where_list = String::new();
        separated_by(&mut where_list, &keys, |out, k| out.push_str(k), " AND ");
        Ok(format!("DELETE FROM {table} WHERE {where_list}"))
    }

    fn fetch_text<T: Record>(&self, all: bool) -> Result<String> {
        let key = self
            .metadata
            .single_key::<T>(if all { "FetchAll" } else { "Fetch" })?;
        let table = self.table_name::<T>()?;
        if all {
            Ok(format!("SELECT * FROM {table}"))
        } else {
            Ok(format!(
                "SELECT * FROM {table} WHERE {}",
                self.parameter_assignment(key.name)?
            ))
        }
    }

    // The caller-facing operation set. Every operation accepts an optional
    // externally supplied transaction; without one, the statement runs in a
    // scoped connection and transaction that commit or roll back and always
    // close again.

    pub fn fetch<T: Record>(
        &self,
        id: impl Into<Value>,
        transaction: Option<&Transaction>,
    ) -> Result<Option<T>> {
        let key = self.metadata.single_key::<T>("Fetch")?;
        let text = self.command_text::<T>(CommandKind::Fetch)?;
        let statement = Statement::new(text.as_ref())
            .with_params(vec![Parameter::new(self.parameter_name(key.name)?, id)])
            .with_timeout(self.config.timeout);
        match self.execute_impl(statement, transaction, ExecuteKind::Reader)? {
            ExecuteOutcome::Rows(rows) => rows.first().map(T::from_row).transpose(),
            _ => Ok(None),
        }
    }

    pub fn fetch_all<T: Record>(&self, transaction: Option<&Transaction>) -> Result<Vec<T>> {
        let text = self.command_text::<T>(CommandKind::FetchAll)?;
        let statement = Statement::new(text.as_ref()).with_timeout(self.config.timeout);
        match self.execute_impl(statement, transaction, ExecuteKind::Reader)? {
            ExecuteOutcome::Rows(rows) => rows.iter().map(T::from_row).collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Inserts one record, returning the number of affected rows.
    pub fn insert<T: Record>(&self, record: &T, transaction: Option<&Transaction>) -> Result<u64> {
        let text = self.command_text::<T>(CommandKind::Insert)?;
        let meta = self.metadata.get::<T>();
        let statement = Statement::new(text.as_ref())
            .with_params(self.bind_fields(record, meta.insert_fields())?)
            .with_timeout(self.config.timeout);
        affected(self.execute_impl(statement, transaction, ExecuteKind::NonQuery)?)
    }

    /// Inserts a homogeneous slice record by record inside one transaction,
    /// reusing the cached single-row text.
    pub fn insert_many<T: Record>(
        &self,
        records: &[T],
        transaction: Option<&Transaction>,
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let text = self.command_text::<T>(CommandKind::Insert)?;
        let meta = self.metadata.get::<T>();
        let params: Vec<Vec<Parameter>> = records
            .iter()
            .map(|record| self.bind_fields(record, meta.insert_fields()))
            .collect::<Result<_>>()?;
        self.with_transaction(transaction, |tx| {
            let mut total = RowsAffected::default();
            for bound in params {
                let statement = Statement::new(text.as_ref())
                    .with_params(bound)
                    .with_timeout(self.config.timeout);
                if let ExecuteOutcome::Affected(one) =
                    tx.execute(statement, ExecuteKind::NonQuery)?
                {
                    total.extend([one]);
                }
            }
            Ok(total.rows_affected)
        })
    }

    /// Updates one record by its key fields; true when a row changed.
    pub fn update<T: Record>(&self, record: &T, transaction: Option<&Transaction>) -> Result<bool> {
        let text = self.command_text::<T>(CommandKind::Update)?;
        let meta = self.metadata.get::<T>();
        let mut fields = meta.update_fields();
        fields.extend(meta.combined_keys().copied());
        let statement = Statement::new(text.as_ref())
            .with_params(self.bind_fields(record, fields)?)
            .with_timeout(self.config.timeout);
        Ok(affected(self.execute_impl(statement, transaction, ExecuteKind::NonQuery)?)? > 0)
    }

    /// Deletes one record by its key fields; true when a row was removed.
    pub fn delete<T: Record>(&self, record: &T, transaction: Option<&Transaction>) -> Result<bool> {
        let text = self.command_text::<T>(CommandKind::Delete)?;
        let meta = self.metadata.get::<T>();
        let fields: Vec<FieldDef> = meta.combined_keys().copied().collect();
        let statement = Statement::new(text.as_ref())
            .with_params(self.bind_fields(record, fields)?)
            .with_timeout(self.config.timeout);
        Ok(affected(self.execute_impl(statement, transaction, ExecuteKind::NonQuery)?)? > 0)
    }

    /// Deletes every row of the record's table; true when any was removed.
    pub fn delete_all<T: Record>(&self, transaction: Option<&Transaction>) -> Result<bool> {
        let table = self.table_name::<T>()?;
        let statement =
            Statement::new(format!("DELETE FROM {table}")).with_timeout(self.config.timeout);
        Ok(affected(self.execute_impl(statement, transaction, ExecuteKind::NonQuery)?)? > 0)
    }

    pub fn query<T: FromRow>(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<Vec<T>> {
        let statement = Statement::new(text)
            .with_params(params)
            .with_timeout(self.config.timeout);
        match self.execute_impl(statement, transaction, ExecuteKind::Reader)? {
            ExecuteOutcome::Rows(rows) => rows.iter().map(T::from_row).collect(),
            _ => Ok(Vec::new()),
        }
    }

    pub fn query_first<T: FromRow>(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<T> {
        self.query::<T>(text, params, transaction)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::msg("the query returned no rows"))
    }

    pub fn query_first_or_default<T: FromRow>(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<Option<T>> {
        Ok(self.query::<T>(text, params, transaction)?.into_iter().next())
    }

    pub fn execute_non_query(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<u64> {
        let statement = Statement::new(text)
            .with_params(params)
            .with_timeout(self.config.timeout);
        affected(self.execute_impl(statement, transaction, ExecuteKind::NonQuery)?)
    }

    pub fn execute_scalar(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<Value> {
        let statement = Statement::new(text)
            .with_params(params)
            .with_timeout(self.config.timeout);
        match self.execute_impl(statement, transaction, ExecuteKind::Scalar)? {
            ExecuteOutcome::Scalar(value) => Ok(value),
            ExecuteOutcome::Rows(rows) => Ok(rows
                .first()
                .and_then(|row| row.values.first().cloned())
                .unwrap_or(Value::Null)),
            _ => Err(Error::msg("provider returned no scalar for a scalar execution")),
        }
    }

    pub fn execute_reader(
        &self,
        text: &str,
        params: Vec<Parameter>,
        transaction: Option<&Transaction>,
    ) -> Result<Vec<RowLabeled>> {
        let statement = Statement::new(text)
            .with_params(params)
            .with_timeout(self.config.timeout);
        match self.execute_impl(statement, transaction, ExecuteKind::Reader)? {
            ExecuteOutcome::Rows(rows) => Ok(rows),
            _ => Err(Error::msg("provider returned no rows for a reader execution")),
        }
    }

    /// Single batched transfer of a record slice through the provider's
    /// fast path. Providers without one fail with a not-supported error;
    /// a failing transfer rolls back the owning transaction.
    pub fn bulk_insert<T: Record>(
        &self,
        records: &[T],
        transaction: Option<&Transaction>,
    ) -> Result<u64> {
        let Some(strategy) = self.provider.bulk_copy() else {
            return Err(DataError::not_supported(format!(
                "provider `{}` does not support bulk inserting",
                self.provider.name()
            )));
        };
        if records.is_empty() {
            return Ok(0);
        }
        let table = TabularData::from_records(records);
        self.with_transaction(transaction, |tx| {
            tx.bulk_write(
                strategy,
                &table,
                self.config.insert_batch_size,
                self.config.timeout,
            )
        })
    }

    fn bind_fields<T: Record>(
        &self,
        record: &T,
        fields: impl IntoIterator<Item = FieldDef>,
    ) -> Result<Vec<Parameter>> {
        let values = record.row();
        fields
            .into_iter()
            .map(|field| {
                let value = values
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default();
                Ok(Parameter {
                    name: self.parameter_name(field.name)?,
                    value,
                })
            })
            .collect()
    }

    /// Routes work through the supplied transaction, or through a scoped
    /// connection + transaction that commits on success, rolls back on
    /// failure and closes again on every exit path.
    fn with_transaction<R>(
        &self,
        transaction: Option<&Transaction>,
        f: impl FnOnce(&Transaction) -> Result<R>,
    ) -> Result<R> {
        match transaction {
            Some(transaction) => transaction.run_scoped(f),
            None => {
                let connection = self.create_connection(true)?;
                connection.execute_in_transaction(self.config.isolation, f)
            }
        }
    }

    fn execute_impl(
        &self,
        statement: Statement,
        transaction: Option<&Transaction>,
        kind: ExecuteKind,
    ) -> Result<ExecuteOutcome> {
        self.with_transaction(transaction, |tx| tx.execute(statement, kind))
    }
}

fn affected(outcome: ExecuteOutcome) -> Result<u64> {
    match outcome {
        ExecuteOutcome::Affected(affected) => Ok(affected.rows_affected),
        _ => Err(Error::msg("provider returned rows for a non-query execution")),
    }
}
