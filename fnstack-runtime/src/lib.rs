//! Serverless function runtime for fnstack
//!
//! Bridges an inbound HTTP request to a function invocation (event, context,
//! callback) and serializes what the function hands back.

pub mod client;
pub mod config;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod event;
pub mod function;
pub mod invocation;
pub mod response;
pub mod result;
pub mod scope;
pub mod twiml;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, ApiClientFactory, Client, ClientError, ClientFactory, ClientOptions};
pub use config::RuntimeConfig;
pub use context::{construct_context, ExecutionContext};
pub use discovery::{LocalDiscovery, ResourceDiscovery};
pub use dispatch::{handle_error, handle_success, Dispatcher, HttpResponse, Payload, ResponseSink};
pub use event::{construct_event, Event, InboundRequest};
pub use function::{Callback, Function, FunctionRegistry};
pub use invocation::{InvocationError, Invoker};
pub use response::Response;
pub use result::InvocationResult;
pub use scope::{
    construct_global_scope, global_scope, reset_global_scope, GlobalScope, ScopeDependencies,
    ScopeError,
};
pub use twiml::{is_twiml, FaxResponse, MessagingResponse, VoiceResponse};
