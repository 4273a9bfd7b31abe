//! Synchronous execution layer.
//!
//! [`Connection`] wraps a [`GraphDriver`] with lazy (or eager) connect,
//! classified retries with exponential backoff, nested logical transactions
//! over a single physical one, a bounded query log, and execution of
//! deferred aggregate follow-ups. All calls block the current thread; there
//! is no pooling and no background I/O.

pub mod driver;
pub mod errors;
pub mod retry;

pub use driver::{DriverError, GraphDriver, Row};
pub use errors::{classify, ConnectionError, ErrorClass};
pub use retry::RetryPolicy;

use std::collections::VecDeque;
use std::time::Instant;

use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::cypher_generator::alias_resolver::BASE_ALIAS;
use crate::cypher_generator::{Bindings, CompiledQuery, PARENT_KEY_PARAM};

use errors::{is_terminated_transaction, needs_reconnect};

/// One entry in the bounded query log. Parameter values are not recorded,
/// only their names.
#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub text: String,
    pub param_names: Vec<String>,
    pub elapsed_ms: u128,
    /// Row count for reads, None for writes
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionStats {
    pub connections_opened: u64,
    pub queries_executed: u64,
    pub statements_executed: u64,
    pub transactions_started: u64,
    pub retries: u64,
}

pub struct Connection<D: GraphDriver> {
    driver: D,
    config: ConnectionConfig,
    retry: RetryPolicy,
    connected: bool,
    tx_level: u32,
    query_log: VecDeque<QueryLogEntry>,
    stats: ConnectionStats,
}

impl<D: GraphDriver> Connection<D> {
    /// Wrap a driver. With `config.eager` the physical connection opens
    /// immediately; otherwise it opens on first use.
    pub fn new(driver: D, config: ConnectionConfig) -> Result<Self, ConnectionError> {
        config.validate().map_err(|e| ConnectionError::ConnectFailed(e.to_string()))?;
        let mut connection = Self {
            driver,
            config,
            retry: RetryPolicy::default(),
            connected: false,
            tx_level: 0,
            query_log: VecDeque::new(),
            stats: ConnectionStats::default(),
        };
        if connection.config.eager {
            connection.ensure_connected()?;
        }
        Ok(connection)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    pub fn query_log(&self) -> impl Iterator<Item = &QueryLogEntry> {
        self.query_log.iter()
    }

    pub fn transaction_depth(&self) -> u32 {
        self.tx_level
    }

    fn ensure_connected(&mut self) -> Result<(), ConnectionError> {
        if self.connected {
            return Ok(());
        }
        self.driver
            .connect(&self.config)
            .map_err(|e| ConnectionError::ConnectFailed(e.message))?;
        self.connected = true;
        self.stats.connections_opened += 1;
        log::info!("connected to {}", self.config.uri);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), ConnectionError> {
        log::warn!("reopening connection to {}", self.config.uri);
        self.driver.disconnect();
        self.connected = false;
        self.ensure_connected()
    }

    /// Run a driver operation under the retry policy. Non-retryable
    /// failures surface immediately; retryable ones back off, reopening the
    /// socket first when the failure indicates a dead connection.
    fn run_with_retries<T>(
        &mut self,
        mut op: impl FnMut(&mut D) -> Result<T, DriverError>,
    ) -> Result<T, ConnectionError> {
        self.ensure_connected()?;
        let mut attempt = 1;
        loop {
            match op(&mut self.driver) {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    let class = classify(&failure.message);
                    if !class.is_retryable() || attempt >= self.retry.max_attempts {
                        log::warn!(
                            "{:?} failure, giving up after attempt {}: {}",
                            class,
                            attempt,
                            failure.message
                        );
                        return Err(ConnectionError::from_failure(
                            class,
                            failure.message,
                            attempt,
                        ));
                    }
                    log::warn!(
                        "{:?} failure on attempt {}, retrying: {}",
                        class,
                        attempt,
                        failure.message
                    );
                    self.stats.retries += 1;
                    self.retry.sleep_before_retry(attempt);
                    if needs_reconnect(&failure.message) {
                        self.reconnect()?;
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn record(&mut self, text: &str, bindings: &Bindings, elapsed_ms: u128, rows: Option<usize>) {
        if self.config.query_log_limit == 0 {
            return;
        }
        while self.query_log.len() >= self.config.query_log_limit {
            self.query_log.pop_front();
        }
        self.query_log.push_back(QueryLogEntry {
            text: text.to_string(),
            param_names: bindings.names().iter().map(|s| s.to_string()).collect(),
            elapsed_ms,
            rows,
        });
    }

    /// Run a read statement and return its rows.
    pub fn select(
        &mut self,
        text: &str,
        bindings: &Bindings,
    ) -> Result<Vec<Row>, ConnectionError> {
        let started = Instant::now();
        let rows = self.run_with_retries(|d| d.run_query(text, bindings.as_map()))?;
        self.stats.queries_executed += 1;
        self.record(text, bindings, started.elapsed().as_millis(), Some(rows.len()));
        Ok(rows)
    }

    /// Run a write statement and return the affected-entity count.
    pub fn affecting_statement(
        &mut self,
        text: &str,
        bindings: &Bindings,
    ) -> Result<u64, ConnectionError> {
        let started = Instant::now();
        let affected = self.run_with_retries(|d| d.run_statement(text, bindings.as_map()))?;
        self.stats.statements_executed += 1;
        self.record(text, bindings, started.elapsed().as_millis(), None);
        Ok(affected)
    }

    /// Run a compiled read query, then resolve its deferred aggregates by
    /// issuing one follow-up statement per deferred aggregate per row and
    /// writing the result over the placeholder column.
    pub fn run_compiled(
        &mut self,
        compiled: &CompiledQuery,
    ) -> Result<Vec<Row>, ConnectionError> {
        let mut rows = self.select(&compiled.text, &compiled.bindings)?;
        for deferred in &compiled.deferred_aggregates {
            for index in 0..rows.len() {
                let correlate = extract_correlate(&rows[index], &deferred.source_column);
                let Some(correlate) = correlate else {
                    log::warn!(
                        "row has no '{}' value, leaving aggregate '{}' at its placeholder",
                        deferred.source_column,
                        deferred.alias
                    );
                    continue;
                };
                let mut bindings = deferred.bindings.clone();
                bindings.insert_raw(PARENT_KEY_PARAM, correlate);
                let result = self.select(&deferred.text, &bindings)?;
                let value = result
                    .first()
                    .and_then(|row| row.get(&deferred.alias))
                    .cloned()
                    .unwrap_or(Value::from(0));
                rows[index].insert(deferred.alias.clone(), value);
            }
        }
        Ok(rows)
    }

    /// Run a compiled write statement.
    pub fn run_compiled_statement(
        &mut self,
        compiled: &CompiledQuery,
    ) -> Result<u64, ConnectionError> {
        self.affecting_statement(&compiled.text, &compiled.bindings)
    }

    /// Open a logical transaction. Only the outermost level opens a
    /// physical transaction; nested calls just deepen the counter.
    pub fn begin_transaction(&mut self) -> Result<(), ConnectionError> {
        self.tx_level += 1;
        if self.tx_level == 1 {
            self.ensure_connected()?;
            if let Err(failure) = self.driver.begin_tx() {
                self.tx_level -= 1;
                let class = classify(&failure.message);
                return Err(ConnectionError::from_failure(class, failure.message, 1));
            }
            self.stats.transactions_started += 1;
        }
        Ok(())
    }

    /// Close one logical level; the physical commit happens when the
    /// outermost level closes.
    pub fn commit(&mut self) -> Result<(), ConnectionError> {
        if self.tx_level == 0 {
            return Err(ConnectionError::Transaction(
                "commit without an active transaction".to_string(),
            ));
        }
        self.tx_level -= 1;
        if self.tx_level == 0 {
            self.driver.commit_tx().map_err(|failure| {
                let class = classify(&failure.message);
                ConnectionError::from_failure(class, failure.message, 1)
            })?;
        }
        Ok(())
    }

    /// Close one logical level, rolling back physically at the outermost
    /// level. A rollback against an already-terminated transaction is
    /// swallowed; other rollback failures propagate.
    pub fn rollback(&mut self) -> Result<(), ConnectionError> {
        if self.tx_level == 0 {
            return Err(ConnectionError::Transaction(
                "rollback without an active transaction".to_string(),
            ));
        }
        self.tx_level -= 1;
        if self.tx_level == 0 {
            if let Err(failure) = self.driver.rollback_tx() {
                if is_terminated_transaction(&failure.message) {
                    log::debug!("rollback no-op, transaction already closed: {}", failure.message);
                    return Ok(());
                }
                let class = classify(&failure.message);
                return Err(ConnectionError::from_failure(class, failure.message, 1));
            }
        }
        Ok(())
    }

    /// Run a unit of read work under the retry policy. The closure is
    /// re-invoked from the start on a retryable failure.
    pub fn read<T>(
        &mut self,
        mut work: impl FnMut(&mut Self) -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        let mut attempt = 1;
        loop {
            match work(self) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.class().is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(error);
                    }
                    self.stats.retries += 1;
                    self.retry.sleep_before_retry(attempt);
                    attempt += 1;
                }
            }
        }
    }

    /// Run a unit of write work inside a transaction under the retry
    /// policy. The transaction commits when the closure succeeds and rolls
    /// back when it fails; a retryable failure re-runs the whole unit in a
    /// fresh transaction.
    pub fn write<T>(
        &mut self,
        mut work: impl FnMut(&mut Self) -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        let mut attempt = 1;
        loop {
            match self.write_once(&mut work) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.class().is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(error);
                    }
                    self.stats.retries += 1;
                    self.retry.sleep_before_retry(attempt);
                    attempt += 1;
                }
            }
        }
    }

    fn write_once<T>(
        &mut self,
        work: &mut impl FnMut(&mut Self) -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        self.begin_transaction()?;
        match work(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.rollback() {
                    log::warn!("rollback after failed write also failed: {}", rollback_error);
                }
                Err(error)
            }
        }
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            self.driver.disconnect();
            self.connected = false;
            log::info!("disconnected from {}", self.config.uri);
        }
    }
}

/// The correlate value for a deferred aggregate: looked up on the row's
/// entity map under the base alias, falling back to a top-level key for
/// column projections.
fn extract_correlate(row: &Row, source_column: &str) -> Option<Value> {
    row.get(BASE_ALIAS)
        .and_then(|v| v.as_object())
        .and_then(|entity| entity.get(source_column))
        .or_else(|| row.get(source_column))
        .cloned()
}
