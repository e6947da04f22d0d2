//! In-memory doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::token::{MemoryTokenStore, StorageError, TokenStore};
use crate::transport::Transport;

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    /// When set, the first request waits on this before answering.
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Transport(reason.to_string())));
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let (index, response) = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let response = self.responses.lock().unwrap().pop_front();
            (requests.len() - 1, response)
        };
        if index == 0 {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
        response.unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
    }
}

/// A store whose every operation fails.
pub(crate) struct BrokenStore;

#[async_trait]
impl TokenStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::ReadFailed("keychain locked".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteFailed("keychain locked".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::DeleteFailed("keychain locked".to_string()))
    }
}

/// An `ApiClient` over `transport` with a fresh in-memory token store.
pub(crate) fn api_with(
    transport: Arc<ScriptedTransport>,
) -> (ApiClient, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::new(&ClientConfig::default(), transport, tokens.clone());
    (api, tokens)
}
