//! Scripted in-memory driver for execution tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::{Map, Value};

use cypherquill::connection::{DriverError, GraphDriver, Row};
use cypherquill::ConnectionConfig;

#[derive(Debug, Clone, Default)]
pub struct DriverCalls {
    pub connects: u32,
    pub disconnects: u32,
    pub begins: u32,
    pub commits: u32,
    pub rollbacks: u32,
    pub queries: Vec<String>,
    pub statements: Vec<String>,
}

/// Pops one canned result per query or statement; an exhausted script
/// yields empty results. Connects and transacts unconditionally.
pub struct ScriptedDriver {
    pub calls: Rc<RefCell<DriverCalls>>,
    query_results: VecDeque<Result<Vec<Row>, DriverError>>,
    statement_results: VecDeque<Result<u64, DriverError>>,
}

impl ScriptedDriver {
    pub fn new() -> (Self, Rc<RefCell<DriverCalls>>) {
        let calls = Rc::new(RefCell::new(DriverCalls::default()));
        let driver = Self {
            calls: calls.clone(),
            query_results: VecDeque::new(),
            statement_results: VecDeque::new(),
        };
        (driver, calls)
    }

    pub fn push_rows(&mut self, rows: Vec<Row>) {
        self.query_results.push_back(Ok(rows));
    }

    pub fn push_query_failure(&mut self, message: &str) {
        self.query_results.push_back(Err(DriverError::new(message)));
    }

    pub fn push_affected(&mut self, affected: u64) {
        self.statement_results.push_back(Ok(affected));
    }
}

impl GraphDriver for ScriptedDriver {
    fn connect(&mut self, _config: &ConnectionConfig) -> Result<(), DriverError> {
        self.calls.borrow_mut().connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.borrow_mut().disconnects += 1;
    }

    fn run_query(
        &mut self,
        text: &str,
        _params: &Map<String, Value>,
    ) -> Result<Vec<Row>, DriverError> {
        self.calls.borrow_mut().queries.push(text.to_string());
        self.query_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn run_statement(
        &mut self,
        text: &str,
        _params: &Map<String, Value>,
    ) -> Result<u64, DriverError> {
        self.calls.borrow_mut().statements.push(text.to_string());
        self.statement_results.pop_front().unwrap_or(Ok(0))
    }

    fn begin_tx(&mut self) -> Result<(), DriverError> {
        self.calls.borrow_mut().begins += 1;
        Ok(())
    }

    fn commit_tx(&mut self) -> Result<(), DriverError> {
        self.calls.borrow_mut().commits += 1;
        Ok(())
    }

    fn rollback_tx(&mut self) -> Result<(), DriverError> {
        self.calls.borrow_mut().rollbacks += 1;
        Ok(())
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
