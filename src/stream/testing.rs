//! In-memory event store for tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{BuiltQuery, EventStore, ProfError, ProfResult, Row, RowCursor};

/// Answers each query with the rows registered for the first needle its SQL contains.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    responses: Vec<(String, Vec<Row>)>,
    fail_after: Option<(usize, String)>,
    executed: RefCell<Vec<BuiltQuery>>,
    pulled: Rc<Cell<usize>>,
    open: Rc<Cell<usize>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.responses.push((needle.to_string(), rows));
        self
    }

    /// Every cursor fails with a storage error once it has yielded `rows` rows.
    pub fn fail_after(mut self, rows: usize, message: &str) -> Self {
        self.fail_after = Some((rows, message.to_string()));
        self
    }

    pub fn executed(&self) -> Vec<BuiltQuery> {
        self.executed.borrow().clone()
    }

    pub fn rows_pulled(&self) -> usize {
        self.pulled.get()
    }

    pub fn open_cursors(&self) -> usize {
        self.open.get()
    }
}

impl EventStore for ScriptedStore {
    fn execute(&self, query: &BuiltQuery) -> ProfResult<Box<dyn RowCursor + '_>> {
        self.executed.borrow_mut().push(query.clone());
        let rows = self
            .responses
            .iter()
            .find(|(needle, _)| query.sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        self.open.set(self.open.get() + 1);
        Ok(Box::new(ScriptedCursor {
            rows: rows.into_iter(),
            yielded: 0,
            fail_after: self.fail_after.clone(),
            pulled: Rc::clone(&self.pulled),
            open: Rc::clone(&self.open),
        }))
    }
}

struct ScriptedCursor {
    rows: std::vec::IntoIter<Row>,
    yielded: usize,
    fail_after: Option<(usize, String)>,
    pulled: Rc<Cell<usize>>,
    open: Rc<Cell<usize>>,
}

impl Iterator for ScriptedCursor {
    type Item = ProfResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match &self.fail_after {
            Some((limit, message)) if self.yielded >= *limit => {
                return Some(Err(ProfError::storage(message.clone())));
            }
            _ => {}
        }
        let row = self.rows.next()?;
        self.yielded += 1;
        self.pulled.set(self.pulled.get() + 1);
        Some(Ok(row))
    }
}

impl Drop for ScriptedCursor {
    fn drop(&mut self) {
        self.open.set(self.open.get().saturating_sub(1));
    }
}
