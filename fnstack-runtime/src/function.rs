//! Function contract and registry

use crate::context::ExecutionContext;
use crate::event::Event;
use crate::result::InvocationResult;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// What a function signals through its callback
pub type Completion = Result<InvocationResult, anyhow::Error>;

/// Completion callback handed to a function.
///
/// Consumed on use, so it fires at most once. It can be moved into another
/// task when the function finishes asynchronously.
pub struct Callback {
    tx: oneshot::Sender<Completion>,
}

impl Callback {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn call(self, completion: Completion) {
        // The receiver is gone only when the request was abandoned.
        let _ = self.tx.send(completion);
    }

    pub fn succeed(self, value: impl Into<InvocationResult>) {
        self.call(Ok(value.into()));
    }

    pub fn fail(self, error: impl Into<anyhow::Error>) {
        self.call(Err(error.into()));
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// A cloud function: receives its context, the event and a completion callback.
///
/// Returning `Err` signals a synchronous failure.
pub trait Function: Send + Sync {
    fn call(&self, context: ExecutionContext, event: Event, callback: Callback) -> anyhow::Result<()>;
}

impl<F> Function for F
where
    F: Fn(ExecutionContext, Event, Callback) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, context: ExecutionContext, event: Event, callback: Callback) -> anyhow::Result<()> {
        self(context, event, callback)
    }
}

/// Functions registered in this process, by logical name
#[derive(Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure under `name` (leading and trailing `/` ignored)
    pub fn register<F>(&self, name: &str, function: F)
    where
        F: Fn(ExecutionContext, Event, Callback) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_function(name, Arc::new(function));
    }

    pub fn register_function(&self, name: &str, function: Arc<dyn Function>) {
        let name = normalize(name);
        info!(function_name = %name, "Registered function");
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(normalize(name).as_str()).map(|f| f.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(normalize(name).as_str())
    }

    pub fn remove(&self, name: &str) -> bool {
        self.functions.remove(normalize(name).as_str()).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim_matches('/').to_string()
}
