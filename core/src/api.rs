//! Auth-intercepting API client.
//!
//! # Overview
//! `ApiClient` pairs the stateless [`PetcareClient`] with a host
//! [`Transport`] and an injected [`TokenStore`]. Every request passes through
//! [`ApiClient::send`], which is where the two cross-cutting behaviors live:
//!
//! - outgoing: the stored access token, if any, is attached as
//!   `authorization: Bearer <token>`;
//! - incoming: a 2xx body carrying `access_token` or `accessToken` replaces
//!   the stored token.
//!
//! A 401 is logged and handed to the [`UnauthorizedHandler`]. The default
//! handler does nothing; token refresh or a re-login prompt plug in there.
//!
//! Login, registration and logout each open a new auth epoch. A captured
//! token is written only if no newer auth call started while its request was
//! in flight, so a late response cannot bring back a token that a logout or a
//! newer login has replaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::PetcareClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::token::{StorageError, TokenStore, ACCESS_TOKEN_KEY};
use crate::transport::Transport;
use crate::types::{AuthSession, LoginRequest, NewPet, Pet, PetUpdate, RegisterRequest};

/// Called after a request comes back 401. The response is still returned to
/// the caller afterwards.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    async fn on_unauthorized(&self, request: &HttpRequest, response: &HttpResponse);
}

/// Default handler: no refresh, no retry.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreUnauthorized;

#[async_trait]
impl UnauthorizedHandler for IgnoreUnauthorized {
    async fn on_unauthorized(&self, _request: &HttpRequest, _response: &HttpResponse) {}
}

#[derive(Clone)]
pub struct ApiClient {
    endpoints: PetcareClient,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    unauthorized: Arc<dyn UnauthorizedHandler>,
    auth_epoch: Arc<AtomicU64>,
    /// Serializes token writes against the epoch check.
    token_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            endpoints: PetcareClient::new(&config.base_url),
            transport,
            tokens,
            unauthorized: Arc::new(IgnoreUnauthorized),
            auth_epoch: Arc::new(AtomicU64::new(0)),
            token_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_unauthorized_handler(mut self, handler: Arc<dyn UnauthorizedHandler>) -> Self {
        self.unauthorized = handler;
        self
    }

    /// Sends `request` with auth interception applied on both sides.
    ///
    /// Token-store failures never fail the request: a failed read sends the
    /// request unauthenticated and a failed write is only logged.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let epoch = self.auth_epoch.load(Ordering::SeqCst);
        self.send_in_epoch(request, epoch).await
    }

    async fn send_in_epoch(
        &self,
        mut request: HttpRequest,
        epoch: u64,
    ) -> Result<HttpResponse, ApiError> {
        self.attach_token(&mut request).await;
        debug!(method = request.method.as_str(), url = %request.path, "sending request");

        let response = self.transport.execute(request.clone()).await?;
        debug!(status = response.status, url = %request.path, "received response");

        if response.is_success() {
            self.capture_token(&response, epoch).await;
        } else if response.status == 401 {
            warn!(url = %request.path, "request rejected as unauthorized; no refresh configured");
            self.unauthorized.on_unauthorized(&request, &response).await;
        }
        Ok(response)
    }

    fn begin_auth(&self) -> u64 {
        self.auth_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn attach_token(&self, request: &mut HttpRequest) {
        match self.tokens.get(ACCESS_TOKEN_KEY).await {
            Ok(Some(token)) => request.set_header("authorization", format!("Bearer {token}")),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "could not read access token; sending request unauthenticated")
            }
        }
    }

    async fn capture_token(&self, response: &HttpResponse, epoch: u64) {
        let Some(token) = issued_token(&response.body) else {
            return;
        };
        let _guard = self.token_lock.lock().await;
        let current = self.auth_epoch.load(Ordering::SeqCst);
        if current != epoch {
            debug!(epoch, current, "dropping token issued to a superseded auth call");
            return;
        }
        match self.tokens.set(ACCESS_TOKEN_KEY, &token).await {
            Ok(()) => debug!(token = %redact(&token), "stored access token issued by server"),
            Err(err) => warn!(error = %err, "could not persist access token issued by server"),
        }
    }

    /// Stores `token` if `still_current` holds once the token lock is taken.
    /// Returns whether it was written.
    pub async fn store_token_if<F>(&self, token: &str, still_current: F) -> Result<bool, StorageError>
    where
        F: FnOnce() -> bool + Send,
    {
        let _guard = self.token_lock.lock().await;
        if !still_current() {
            return Ok(false);
        }
        self.tokens.set(ACCESS_TOKEN_KEY, token).await?;
        Ok(true)
    }

    /// Removes the stored token and invalidates tokens from auth calls still
    /// in flight.
    pub async fn clear_token(&self) -> Result<(), StorageError> {
        let _guard = self.token_lock.lock().await;
        self.begin_auth();
        self.tokens.remove(ACCESS_TOKEN_KEY).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let request = self.endpoints.build_login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let epoch = self.begin_auth();
        let response = self.send_in_epoch(request, epoch).await?;
        self.endpoints.parse_login(response)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, ApiError> {
        let request = self.endpoints.build_register(&RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let epoch = self.begin_auth();
        let response = self.send_in_epoch(request, epoch).await?;
        self.endpoints.parse_register(response)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let epoch = self.begin_auth();
        let response = self.send_in_epoch(self.endpoints.build_logout(), epoch).await?;
        self.endpoints.parse_logout(response)
    }

    pub async fn create_pet(&self, input: &NewPet) -> Result<(), ApiError> {
        let request = self.endpoints.build_create_pet(input)?;
        let response = self.send(request).await?;
        self.endpoints.parse_create_pet(response)
    }

    pub async fn list_pets(&self) -> Result<Vec<Pet>, ApiError> {
        let response = self.send(self.endpoints.build_list_pets()).await?;
        self.endpoints.parse_list_pets(response)
    }

    pub async fn get_pet(&self, id: &str) -> Result<Pet, ApiError> {
        let response = self.send(self.endpoints.build_get_pet(id)).await?;
        self.endpoints.parse_get_pet(response)
    }

    pub async fn update_pet(&self, id: &str, input: &PetUpdate) -> Result<(), ApiError> {
        let request = self.endpoints.build_update_pet(id, input)?;
        let response = self.send(request).await?;
        self.endpoints.parse_update_pet(response)
    }

    pub async fn delete_pet(&self, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.endpoints.build_delete_pet(id)).await?;
        self.endpoints.parse_delete_pet(response)
    }
}

/// A non-empty token under either spelling the server uses.
fn issued_token(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["access_token", "accessToken"]
        .iter()
        .filter_map(|field| value.get(field)?.as_str())
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}
