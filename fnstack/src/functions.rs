//! Built-in sample functions

use fnstack_runtime::{FunctionRegistry, MessagingResponse, Response, VoiceResponse};
use serde_json::Value;

/// Register the sample functions served out of the box
pub fn register_samples(registry: &FunctionRegistry) {
    // Answers a call
    registry.register("hello-world", |context, event, callback| {
        let greeting = context.get("GREETING").unwrap_or("Hello World");
        let mut twiml = VoiceResponse::new();
        twiml.say(greeting);
        if let Some(to) = event.get_str("forwardTo") {
            twiml.dial(to);
        }
        callback.succeed(twiml);
        Ok(())
    });

    // Replies to an incoming message with its own body
    registry.register("sms/reply", |_context, event, callback| {
        let body = event.get_str("Body").unwrap_or_default();
        let mut twiml = MessagingResponse::new();
        if body.is_empty() {
            twiml.message("Send us a message and we will echo it back.");
        } else {
            twiml.message(&format!("You said: {}", body));
        }
        callback.succeed(twiml);
        Ok(())
    });

    // Hands the merged event back as JSON
    registry.register("echo", |_context, event, callback| {
        callback.succeed(Value::Object(event.into_inner()));
        Ok(())
    });

    registry.register("status", |context, event, callback| {
        let code = event
            .get_str("code")
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(200);
        let mut response = Response::new();
        response
            .set_status_code(code)
            .append_header("X-Domain-Name", context.domain_name())
            .set_body(serde_json::json!({ "status": code }));
        callback.succeed(response);
        Ok(())
    });
}
