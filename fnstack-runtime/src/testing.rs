//! Test doubles shared by the unit tests

use crate::client::{Client, ClientError, ClientFactory, ClientOptions};
use crate::discovery::{AssetInfo, DiscoveryError, FunctionInfo, ResourceDiscovery, SyncServiceRef};
use crate::dispatch::{Payload, ResponseSink};
use parking_lot::{const_mutex, Mutex};
use reqwest::{Method, RequestBuilder};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serializes tests touching the process-wide scope
pub static SCOPE_LOCK: Mutex<()> = const_mutex(());

#[derive(Debug)]
pub struct StubClient {
    pub account_sid: String,
}

impl Client for StubClient {
    fn account_sid(&self) -> &str {
        &self.account_sid
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        reqwest::Client::new().request(method, format!("http://stub.invalid/{}", path))
    }
}

type FactoryCall = (Option<String>, Option<String>, ClientOptions);

/// Factory recording every call; rejects a missing account sid
#[derive(Default)]
pub struct RecordingFactory {
    calls: Mutex<Vec<FactoryCall>>,
    created: AtomicUsize,
}

impl RecordingFactory {
    pub fn calls(&self) -> Vec<FactoryCall> {
        self.calls.lock().clone()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for RecordingFactory {
    fn create(
        &self,
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        options: &ClientOptions,
    ) -> Result<Arc<dyn Client>, ClientError> {
        self.calls.lock().push((
            account_sid.map(String::from),
            auth_token.map(String::from),
            options.clone(),
        ));
        let account_sid = account_sid.ok_or(ClientError::MissingUsername)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubClient {
            account_sid: account_sid.to_string(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Status(u16),
    Set(BTreeMap<String, String>),
    ContentType(String),
    Send(Payload),
}

/// Sink recording every operation in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn has_content_type(&self) -> bool {
        self.calls
            .iter()
            .any(|call| matches!(call, SinkCall::ContentType(_)))
    }
}

impl ResponseSink for RecordingSink {
    fn status(&mut self, code: u16) {
        self.calls.push(SinkCall::Status(code));
    }

    fn set(&mut self, headers: &BTreeMap<String, String>) {
        self.calls.push(SinkCall::Set(headers.clone()));
    }

    fn content_type(&mut self, media_type: &str) {
        self.calls.push(SinkCall::ContentType(media_type.to_string()));
    }

    fn send(&mut self, payload: Payload) {
        self.calls.push(SinkCall::Send(payload));
    }
}

/// Discovery returning fixed listings
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    pub assets: BTreeMap<String, AssetInfo>,
    pub functions: BTreeMap<String, FunctionInfo>,
}

impl ResourceDiscovery for StaticDiscovery {
    fn assets(&self) -> Result<BTreeMap<String, AssetInfo>, DiscoveryError> {
        Ok(self.assets.clone())
    }

    fn functions(&self) -> Result<BTreeMap<String, FunctionInfo>, DiscoveryError> {
        Ok(self.functions.clone())
    }

    fn sync_service(&self, service_name: &str) -> Result<SyncServiceRef, DiscoveryError> {
        Ok(SyncServiceRef::new(service_name))
    }
}
