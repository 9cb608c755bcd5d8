//! Uniform wrapper over synchronous and suspending request handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::errors::DispatchError;

/// A named request handler. `arguments` is the request's `opct`.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Runs the operation and returns its JSON result.
    async fn invoke(&self, arguments: Value) -> Result<Value, DispatchError>;
}

struct SyncOperation<F>(F);

#[async_trait]
impl<F, T> Operation for SyncOperation<F>
where
    F: Fn(Value) -> Result<T, DispatchError> + Send + Sync + 'static,
    T: Serialize + 'static,
{
    async fn invoke(&self, arguments: Value) -> Result<Value, DispatchError> {
        let result = (self.0)(arguments)?;
        Ok(serde_json::to_value(result)?)
    }
}

struct AsyncOperation<F>(F);

#[async_trait]
impl<F, Fut, T> Operation for AsyncOperation<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
    T: Serialize + 'static,
{
    async fn invoke(&self, arguments: Value) -> Result<Value, DispatchError> {
        let result = (self.0)(arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Wraps a plain function as an [`Operation`].
pub fn from_fn<F, T>(function: F) -> Arc<dyn Operation>
where
    F: Fn(Value) -> Result<T, DispatchError> + Send + Sync + 'static,
    T: Serialize + 'static,
{
    Arc::new(SyncOperation(function))
}

/// Wraps a function returning a future as an [`Operation`].
pub fn from_async_fn<F, Fut, T>(function: F) -> Arc<dyn Operation>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(AsyncOperation(function))
}

/// Verb-suffix to operation map.
#[derive(Clone, Default)]
pub struct OperationTable {
    operations: BTreeMap<String, Arc<dyn Operation>>,
}

impl OperationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an operation.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, operation: Arc<dyn Operation>) -> Self {
        self.insert(name, operation);
        self
    }

    /// Adds or replaces an operation in place.
    pub fn insert(&mut self, name: impl Into<String>, operation: Arc<dyn Operation>) {
        self.operations.insert(name.into(), operation);
    }

    /// Adds every entry of `other`, replacing entries with the same name.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.operations.extend(other.operations);
        self
    }

    /// Looks up an operation.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.operations.keys())
            .finish()
    }
}
