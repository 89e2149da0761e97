//! Function invocation
//!
//! Builds the event and context for a request, runs the function and turns
//! whatever it signals into an [`HttpResponse`]. This is the only place that
//! recovers from function failures.

use crate::client::ClientFactory;
use crate::config::RuntimeConfig;
use crate::context::construct_context;
use crate::dispatch::{Dispatcher, HttpResponse};
use crate::event::{construct_event, InboundRequest};
use crate::function::{Callback, Completion, Function};
use crate::scope::GlobalScope;
use fnstack_core::InvocationId;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Function completed without invoking its callback")]
    CallbackDropped,

    #[error("Function panicked: {0}")]
    Panicked(String),
}

/// Runs functions against a fixed configuration and scope
pub struct Invoker {
    config: RuntimeConfig,
    scope: Arc<GlobalScope>,
    factory: Arc<dyn ClientFactory>,
    dispatcher: Dispatcher,
}

impl Invoker {
    pub fn new(
        config: RuntimeConfig,
        scope: Arc<GlobalScope>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            config,
            scope,
            factory,
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scope(&self) -> &Arc<GlobalScope> {
        &self.scope
    }

    /// Invoke `function` for one request and serialize the outcome
    pub async fn invoke(
        &self,
        name: &str,
        function: Arc<dyn Function>,
        request: InboundRequest,
    ) -> HttpResponse {
        let invocation_id = InvocationId::new();
        let span = info_span!(
            "invocation",
            function_name = %name,
            invocation_id = %invocation_id
        );

        async move {
            let started = Instant::now();
            let completion = self.run(function, request).await;

            let mut response = HttpResponse::new();
            match completion {
                Ok(value) => self.dispatcher.handle_success(value, &mut response),
                Err(e) => {
                    error!(error = %format!("{:#}", e), "Function invocation failed");
                    self.dispatcher.handle_error(&e, &mut response);
                }
            }

            info!(
                status = response.status_code(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Invoked function"
            );
            response
        }
        .instrument(span)
        .await
    }

    /// Run the function and wait for the first completion signal.
    ///
    /// A callback that already fired wins over a synchronous error.
    pub async fn run(&self, function: Arc<dyn Function>, request: InboundRequest) -> Completion {
        let event = construct_event(&request);
        let context = construct_context(&self.config, Arc::clone(&self.factory))
            .with_scope(Arc::clone(&self.scope));
        let (callback, mut rx) = Callback::channel();

        let returned = panic::catch_unwind(AssertUnwindSafe(|| {
            function.call(context, event, callback)
        }));

        match returned {
            Ok(Ok(())) => match rx.await {
                Ok(completion) => completion,
                Err(_) => Err(InvocationError::CallbackDropped.into()),
            },
            Ok(Err(e)) => rx.try_recv().unwrap_or(Err(e)),
            Err(payload) => rx
                .try_recv()
                .unwrap_or_else(|_| Err(InvocationError::Panicked(panic_message(payload)).into())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::dispatch::Payload;
    use crate::event::Event;
    use crate::response::Response;
    use crate::result::InvocationResult;
    use crate::scope::ScopeDependencies;
    use crate::testing::{RecordingFactory, StaticDiscovery};
    use crate::twiml::VoiceResponse;
    use axum::http::header;
    use axum::response::IntoResponse;
    use serde_json::{json, Map, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    fn invoker() -> Invoker {
        let config = RuntimeConfig::new("https://example.com:8443/base", HashMap::new())
            .with_env("ACCOUNT_SID", "AC123")
            .with_env("AUTH_TOKEN", "token");
        let factory: Arc<dyn ClientFactory> = Arc::new(RecordingFactory::default());
        let scope = Arc::new(GlobalScope::new(
            &config,
            ScopeDependencies {
                factory: Arc::clone(&factory),
                discovery: Arc::new(StaticDiscovery::default()),
            },
        ));
        Invoker::new(config, scope, factory)
    }

    fn function<F>(f: F) -> Arc<dyn Function>
    where
        F: Fn(ExecutionContext, Event, Callback) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_text_result() {
        let hello = function(|_, _, callback| {
            callback.succeed("Hello World");
            Ok(())
        });

        let response = invoker()
            .invoke("hello", hello, InboundRequest::default())
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.payload(), &Payload::Text("Hello World".to_string()));
    }

    #[tokio::test]
    async fn test_event_and_context_reach_function() {
        let echo = function(|context, event, callback| {
            let mut body = event.into_inner();
            body.insert("domain".to_string(), json!(context.domain_name()));
            callback.succeed(Value::Object(body));
            Ok(())
        });
        let request = InboundRequest::new(
            Some(object(json!({"From": "+1555", "Body": "query"}))),
            Some(object(json!({"Body": "body"}))),
        );

        let response = invoker().invoke("echo", echo, request).await;

        assert_eq!(
            response.payload(),
            &Payload::Json(json!({
                "From": "+1555",
                "Body": "body",
                "domain": "example.com:8443"
            }))
        );
    }

    #[tokio::test]
    async fn test_scope_is_attached() {
        let sync = function(|context, _, callback| {
            let scope = context.scope()?;
            let service = scope.runtime().get_sync(None)?;
            let client = scope.client()?;
            callback.succeed(json!({
                "service": service.service_name,
                "accountSid": client.account_sid(),
            }));
            Ok(())
        });

        let response = invoker()
            .invoke("sync", sync, InboundRequest::default())
            .await;

        assert_eq!(
            response.payload(),
            &Payload::Json(json!({"service": "default", "accountSid": "AC123"}))
        );
    }

    #[tokio::test]
    async fn test_markup_result_is_xml() {
        let voice = function(|_, _, callback| {
            let mut twiml = VoiceResponse::new();
            twiml.say("Hello");
            callback.succeed(twiml);
            Ok(())
        });

        let response = invoker()
            .invoke("voice", voice, InboundRequest::default())
            .await
            .into_response();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");
    }

    #[tokio::test]
    async fn test_structured_result() {
        let created = function(|_, _, callback| {
            let mut response = Response::new();
            response
                .set_status_code(201)
                .append_header("X-Custom", "yes")
                .set_body(json!({"ok": true}));
            callback.succeed(response);
            Ok(())
        });

        let response = invoker()
            .invoke("created", created, InboundRequest::default())
            .await;

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.headers()["x-custom"], "yes");
        assert_eq!(response.payload(), &Payload::Json(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_callback_failure_is_500() {
        let failing = function(|_, _, callback| {
            callback.fail(anyhow::anyhow!("lookup failed"));
            Ok(())
        });

        let response = invoker()
            .invoke("failing", failing, InboundRequest::default())
            .await;

        assert_eq!(response.status_code(), 500);
        match response.payload() {
            Payload::Text(trace) => assert!(trace.contains("lookup failed")),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_synchronous_error_is_500() {
        let failing = function(|_, _, _callback| anyhow::bail!("bad input"));

        let response = invoker()
            .invoke("failing", failing, InboundRequest::default())
            .await;

        assert_eq!(response.status_code(), 500);
        assert!(matches!(response.payload(), Payload::Text(t) if t.contains("bad input")));
    }

    #[tokio::test]
    async fn test_first_signal_wins() {
        let both = function(|_, _, callback| {
            callback.succeed("already done");
            anyhow::bail!("too late")
        });

        let response = invoker()
            .invoke("both", both, InboundRequest::default())
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.payload(), &Payload::Text("already done".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_callback_is_500() {
        let forgetful = function(|_, _, callback| {
            drop(callback);
            Ok(())
        });

        let completion = invoker()
            .run(forgetful.clone(), InboundRequest::default())
            .await;
        let error = completion.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InvocationError>(),
            Some(InvocationError::CallbackDropped)
        ));

        let response = invoker()
            .invoke("forgetful", forgetful, InboundRequest::default())
            .await;
        assert_eq!(response.status_code(), 500);
    }

    #[tokio::test]
    async fn test_callback_from_spawned_task() {
        let deferred = function(|_, event, callback| {
            let name = event.get_str("name").unwrap_or("nobody").to_string();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                callback.succeed(format!("Hello {}", name));
            });
            Ok(())
        });
        let request = InboundRequest::new(Some(object(json!({"name": "Ada"}))), None);

        let response = invoker().invoke("deferred", deferred, request).await;

        assert_eq!(response.payload(), &Payload::Text("Hello Ada".to_string()));
    }

    #[tokio::test]
    async fn test_panic_is_500() {
        let panicking = function(|_, _, _callback| panic!("boom"));

        let completion = invoker()
            .run(panicking, InboundRequest::default())
            .await;

        match completion {
            Err(e) => assert_eq!(e.to_string(), "Function panicked: boom"),
            Ok(value) => panic!("unexpected success: {:?}", value),
        }
    }

    #[tokio::test]
    async fn test_invocation_result_passthrough() {
        let value = function(|_, _, callback| {
            callback.call(Ok(InvocationResult::Value(json!([1, 2, 3]))));
            Ok(())
        });

        let response = invoker()
            .invoke("value", value, InboundRequest::default())
            .await;

        assert_eq!(response.payload(), &Payload::Json(json!([1, 2, 3])));
    }
}
