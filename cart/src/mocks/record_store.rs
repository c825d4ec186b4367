//! In-memory record store.

use crate::error::{RecordStoreError, Result};
use crate::providers::{RecordStore, RecordStream};
use futures::StreamExt;
use futures::channel::mpsc;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory record store.
///
/// Holds one JSON tree. Writes merge, deletes prune empty parents, and every
/// subscriber whose path overlaps a change receives the full value at its path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    root: Value,
    subscribers: Vec<Subscriber>,
    writes: usize,
    deletes: usize,
    failure: Option<String>,
}

#[derive(Debug)]
struct Subscriber {
    path: Vec<String>,
    tx: mpsc::UnboundedSender<Result<Value>>,
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn related(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(x, y)| x == y)
}

static NULL: Value = Value::Null;

fn get<'a>(root: &'a Value, path: &[String]) -> &'a Value {
    path.iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
        .unwrap_or(&NULL)
}

/// Returns true when `node` holds nothing and should be removed
fn prune(node: &mut Value) -> bool {
    match node {
        Value::Null => true,
        Value::Object(map) => {
            map.retain(|_, child| !prune(child));
            map.is_empty()
        },
        _ => false,
    }
}

impl Inner {
    fn merge(&mut self, path: &[String], value: Value) {
        let mut node = &mut self.root;
        for segment in path {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                return;
            };
            node = map.entry(segment.clone()).or_insert(Value::Null);
        }

        match (node, value) {
            (Value::Object(existing), Value::Object(patch)) => {
                for (key, value) in patch {
                    existing.insert(key, value);
                }
            },
            (node, value) => *node = value,
        }

        if prune(&mut self.root) {
            self.root = Value::Null;
        }
    }

    fn remove(&mut self, path: &[String]) {
        match path.split_last() {
            None => self.root = Value::Null,
            Some((last, parents)) => {
                let mut node = &mut self.root;
                for segment in parents {
                    match node.get_mut(segment.as_str()) {
                        Some(child) => node = child,
                        None => return,
                    }
                }
                if let Value::Object(map) = node {
                    map.remove(last);
                }
            },
        }

        if prune(&mut self.root) {
            self.root = Value::Null;
        }
    }

    fn notify(&mut self, changed: &[String]) {
        let root = &self.root;
        self.subscribers.retain(|subscriber| {
            if !related(&subscriber.path, changed) {
                return !subscriber.tx.is_closed();
            }
            subscriber
                .tx
                .unbounded_send(Ok(get(root, &subscriber.path).clone()))
                .is_ok()
        });
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(RecordStoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

impl InMemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge `value` into `path` without counting it as a client write
    pub fn seed(&self, path: &str, value: Value) {
        let path = segments(path);
        let mut inner = self.lock();
        inner.merge(&path, value);
        inner.notify(&path);
    }

    /// Current value at `path`
    #[must_use]
    pub fn value(&self, path: &str) -> Value {
        get(&self.lock().root, &segments(path)).clone()
    }

    /// Make every write and delete fail with `message`; `None` restores service
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    /// End every subscription on exactly `path` with `message`
    pub fn end_subscriptions(&self, path: &str, message: &str) {
        let path = segments(path);
        self.lock().subscribers.retain(|subscriber| {
            if subscriber.path != path {
                return true;
            }
            let _ = subscriber
                .tx
                .unbounded_send(Err(RecordStoreError::Unavailable(message.to_string())));
            false
        });
    }

    /// Write calls received, including failed ones
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Delete calls received, including failed ones
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    /// Live subscriptions on exactly `path`
    #[must_use]
    pub fn subscriber_count(&self, path: &str) -> usize {
        let path = segments(path);
        let mut inner = self.lock();
        inner.subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        inner
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.path == path)
            .count()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn read(&self, path: &str) -> impl Future<Output = Result<Value>> + Send {
        let value = self.value(path);
        async move { Ok(value) }
    }

    fn write(&self, path: &str, value: Value) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let path = segments(path);

        async move {
            let mut inner = store.lock();
            inner.writes += 1;
            inner.check_failure()?;
            inner.merge(&path, value);
            inner.notify(&path);
            Ok(())
        }
    }

    fn delete(&self, path: &str) -> impl Future<Output = Result<()>> + Send {
        let store = self.clone();
        let path = segments(path);

        async move {
            let mut inner = store.lock();
            inner.deletes += 1;
            inner.check_failure()?;
            inner.remove(&path);
            inner.notify(&path);
            Ok(())
        }
    }

    fn subscribe(&self, path: &str) -> RecordStream {
        let path = segments(path);
        let (tx, rx) = mpsc::unbounded();

        let mut inner = self.lock();
        let _ = tx.unbounded_send(Ok(get(&inner.root, &path).clone()));
        inner.subscribers.push(Subscriber { path, tx });

        rx.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_merges_and_delete_prunes() {
        let store = InMemoryRecordStore::new();

        assert!(store.write("customers/u1/cart/products/a", json!({"id": "a", "quantity": 1})).await.is_ok());
        assert!(store.write("customers/u1/cart/products/a", json!({"quantity": 3})).await.is_ok());

        assert_eq!(
            store.value("customers/u1/cart/products/a"),
            json!({"id": "a", "quantity": 3})
        );

        assert!(store.delete("customers/u1/cart/products/a").await.is_ok());
        assert_eq!(store.value("customers"), Value::Null);
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_initial_and_changed_values() {
        let store = InMemoryRecordStore::new();
        store.seed("customers/u1/cart/products/a", json!({"id": "a"}));

        let mut stream = store.subscribe("customers/u1/cart/products");
        let first = stream.next().await;
        assert!(matches!(first, Some(Ok(ref v)) if v["a"]["id"] == "a"));

        assert!(store.write("customers/u1/cart/products/b", json!({"id": "b"})).await.is_ok());
        let second = stream.next().await;
        assert!(matches!(second, Some(Ok(ref v)) if v.as_object().map(Map::len) == Some(2)));

        // Unrelated paths do not notify
        assert!(store.write("customers/u2/cart/products/c", json!({"id": "c"})).await.is_ok());
        assert_eq!(store.subscriber_count("customers/u1/cart/products"), 1);

        drop(stream);
        assert_eq!(store.subscriber_count("customers/u1/cart/products"), 0);
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let store = InMemoryRecordStore::new();
        store.fail_writes(Some("offline"));

        let result = store.write("a/b", json!(1)).await;
        assert!(matches!(result, Err(RecordStoreError::Unavailable(_))));
        assert_eq!(store.value("a/b"), Value::Null);

        store.fail_writes(None);
        assert!(store.write("a/b", json!(1)).await.is_ok());
        assert_eq!(store.value("a/b"), json!(1));
    }
}
