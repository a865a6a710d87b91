//! In-process [`QueryExecutor`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::store::{Query, QueryExecutor, StoreError};

#[derive(Clone)]
enum Reply {
    Rows(Value),
    Fail(String),
}

/// Answers queries by name and records everything it was asked.
///
/// Queries without a registered reply get `Value::Null`, unless
/// [`FakeStore::fail_all`] was used.
#[derive(Default)]
pub struct FakeStore {
    replies: HashMap<&'static str, Reply>,
    fallback: Option<Reply>,
    seen: Mutex<Vec<Query>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(mut self, name: &'static str, value: Value) -> Self {
        self.replies.insert(name, Reply::Rows(value));
        self
    }

    #[must_use]
    pub fn fail(mut self, name: &'static str, message: &str) -> Self {
        self.replies.insert(name, Reply::Fail(message.to_string()));
        self
    }

    #[must_use]
    pub fn fail_all(mut self, message: &str) -> Self {
        self.fallback = Some(Reply::Fail(message.to_string()));
        self
    }

    /// Every query executed so far, in call order.
    pub fn queries(&self) -> Vec<Query> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    pub fn last_query(&self) -> Option<Query> {
        self.queries().pop()
    }

    pub fn query_named(&self, name: &str) -> Option<Query> {
        self.queries().into_iter().find(|q| q.name == name)
    }
}

impl QueryExecutor for FakeStore {
    async fn execute(&self, query: &Query) -> Result<Value, StoreError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.clone());
        }

        let reply = self
            .replies
            .get(query.name)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or(Reply::Rows(Value::Null));

        match reply {
            Reply::Rows(value) => Ok(value),
            Reply::Fail(body) => Err(StoreError::Status { status: 503, body }),
        }
    }
}
