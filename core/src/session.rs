//! Session state machine: login, registration and logout.
//!
//! ```text
//! Anonymous --login/register--> Authenticating --ok--> Authenticated
//!                                     |                      |
//!                                     +--error--> Anonymous  +--logout--> Anonymous
//! ```
//!
//! Every operation ends with `loading == false` on all paths. Failures are
//! never returned to the caller; they become the `message` string.

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::store::{Reducer, Store};
use crate::types::User;

pub const MSG_AUTHENTICATED: &str = "Usuario autenticado.";
pub const MSG_LOGIN_FAILED: &str = "Error al iniciar sesión.";
pub const MSG_PASSWORD_MISMATCH: &str = "Las contraseñas no coinciden.";
pub const MSG_REGISTERED: &str = "Usuario registrado con éxito.";
pub const MSG_REGISTER_FAILED: &str = "Error al registrar el usuario.";
pub const MSG_LOGGED_OUT: &str = "Sesión cerrada.";
pub const MSG_LOGOUT_FAILED: &str = "No se pudo cerrar sesión.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub loading: bool,
    pub user: Option<User>,
    pub message: String,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    SetLoading(bool),
    /// Also ends loading.
    SetUser(Option<User>),
    SetMessage(String),
}

impl Reducer for SessionState {
    type Action = SessionAction;

    fn reduce(self, action: SessionAction) -> Self {
        match action {
            SessionAction::SetLoading(loading) => Self { loading, ..self },
            SessionAction::SetUser(user) => Self {
                user,
                loading: false,
                ..self
            },
            SessionAction::SetMessage(message) => Self { message, ..self },
        }
    }
}

/// Owns the session state and runs the auth operations against the API.
pub struct SessionMachine {
    api: ApiClient,
    store: Store<SessionState>,
}

impl SessionMachine {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub async fn login(&self, email: &str, password: &str) {
        let ticket = self.store.begin(SessionAction::SetLoading(true));

        match self.api.login(email, password).await {
            Ok(session) => {
                if let Some(token) = &session.access_token {
                    let stored = self
                        .api
                        .store_token_if(token, || self.store.is_current(ticket))
                        .await;
                    match stored {
                        Ok(true) => {}
                        Ok(false) => debug!("login superseded; not storing its token"),
                        Err(err) => warn!(error = %err, "could not persist access token after login"),
                    }
                }
                info!(email = %session.user.email, "logged in");
                self.store.dispatch(ticket, SessionAction::SetUser(Some(session.user)));
                self.store
                    .dispatch(ticket, SessionAction::SetMessage(MSG_AUTHENTICATED.to_string()));
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                let message = err.server_message().unwrap_or(MSG_LOGIN_FAILED).to_string();
                self.store.dispatch(ticket, SessionAction::SetMessage(message));
            }
        }

        self.store.dispatch(ticket, SessionAction::SetLoading(false));
    }

    /// Registers a new account. Mismatched passwords short-circuit before
    /// any request is made.
    pub async fn register(&self, name: &str, email: &str, password: &str, confirm_password: &str) {
        let ticket = self.store.begin(SessionAction::SetLoading(true));

        if password != confirm_password {
            self.store
                .dispatch(ticket, SessionAction::SetMessage(MSG_PASSWORD_MISMATCH.to_string()));
            self.store.dispatch(ticket, SessionAction::SetLoading(false));
            return;
        }

        match self.api.register(name, email, password).await {
            Ok(Some(session)) => {
                info!(email = %session.user.email, "registered");
                self.store.dispatch(ticket, SessionAction::SetUser(Some(session.user)));
                self.store
                    .dispatch(ticket, SessionAction::SetMessage(MSG_REGISTERED.to_string()));
            }
            Ok(None) => warn!("registration accepted but the response carried no user"),
            Err(err) => {
                warn!(error = %err, "registration failed");
                let message = err.server_message().unwrap_or(MSG_REGISTER_FAILED).to_string();
                self.store.dispatch(ticket, SessionAction::SetMessage(message));
            }
        }

        self.store.dispatch(ticket, SessionAction::SetLoading(false));
    }

    /// Ends the session. The server call is best-effort: the local token and
    /// user are cleared whatever it returns.
    pub async fn logout(&self) {
        let ticket = self.store.begin(SessionAction::SetLoading(true));

        let remote = self.api.logout().await;
        if let Err(err) = &remote {
            warn!(error = %err, "server logout failed; clearing local session anyway");
        }
        if let Err(err) = self.api.clear_token().await {
            warn!(error = %err, "could not remove stored access token");
        }

        let message = if remote.is_ok() {
            MSG_LOGGED_OUT
        } else {
            MSG_LOGOUT_FAILED
        };
        self.store.dispatch(ticket, SessionAction::SetUser(None));
        self.store
            .dispatch(ticket, SessionAction::SetMessage(message.to_string()));
        self.store.dispatch(ticket, SessionAction::SetLoading(false));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{api_with, ScriptedTransport};
    use crate::token::{MemoryTokenStore, TokenStore, ACCESS_TOKEN_KEY};

    fn machine(transport: &Arc<ScriptedTransport>) -> (SessionMachine, Arc<MemoryTokenStore>) {
        let (api, tokens) = api_with(transport.clone());
        (SessionMachine::new(api), tokens)
    }

    #[test]
    fn reducer_set_user_clears_loading() {
        let state = SessionState {
            loading: true,
            ..SessionState::default()
        };
        let next = state.reduce(SessionAction::SetUser(Some(User::new("a@b.com"))));
        assert!(!next.loading);
        assert_eq!(next.user, Some(User::new("a@b.com")));
    }

    #[test]
    fn reducer_message_overwrites() {
        let state = SessionState::default()
            .reduce(SessionAction::SetMessage("uno".to_string()))
            .reduce(SessionAction::SetMessage("dos".to_string()));
        assert_eq!(state.message, "dos");
    }

    #[tokio::test]
    async fn login_success_sets_user_and_persists_token() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"user":{"email":"a@b.com"},"access_token":"T1"}"#),
        );
        let (session, tokens) = machine(&transport);

        session.login("a@b.com", "x").await;

        assert_eq!(
            session.state(),
            SessionState {
                loading: false,
                user: Some(User::new("a@b.com")),
                message: "Usuario autenticado.".to_string(),
            }
        );
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("T1"));
        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "a@b.com");
    }

    #[tokio::test]
    async fn login_rejected_uses_server_message() {
        let transport =
            Arc::new(ScriptedTransport::new().respond(401, r#"{"message":"Credenciales inválidas."}"#));
        let (session, tokens) = machine(&transport);

        session.login("a@b.com", "wrong").await;

        let state = session.state();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(state.message, "Credenciales inválidas.");
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_transport_failure_uses_default_message() {
        let transport = Arc::new(ScriptedTransport::new().fail("connection refused"));
        let (session, _) = machine(&transport);

        session.login("a@b.com", "x").await;

        let state = session.state();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(state.message, MSG_LOGIN_FAILED);
    }

    #[tokio::test]
    async fn register_password_mismatch_never_calls_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let (session, _) = machine(&transport);

        session.register("Ana", "ana@example.com", "a", "b").await;

        assert!(transport.requests().is_empty());
        let state = session.state();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(state.message, "Las contraseñas no coinciden.");
    }

    #[tokio::test]
    async fn register_success_sets_user_and_stores_token() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            201,
            r#"{"user":{"name":"Ana","email":"ana@example.com"},"accessToken":"R1"}"#,
        ));
        let (session, tokens) = machine(&transport);

        session.register("Ana", "ana@example.com", "s", "s").await;

        let state = session.state();
        assert!(!state.loading);
        assert_eq!(state.user.as_ref().map(|u| u.email.as_str()), Some("ana@example.com"));
        assert_eq!(state.message, MSG_REGISTERED);
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn register_conflict_uses_server_message_or_default() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(409, r#"{"message":"El correo ya está registrado."}"#)
                .respond(500, "oops"),
        );
        let (session, _) = machine(&transport);

        session.register("Ana", "ana@example.com", "s", "s").await;
        assert_eq!(session.state().message, "El correo ya está registrado.");

        session.register("Ana", "ana@example.com", "s", "s").await;
        let state = session.state();
        assert_eq!(state.message, MSG_REGISTER_FAILED);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn logout_clears_user_and_token() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"user":{"email":"a@b.com"},"access_token":"T1"}"#)
                .respond(200, r#"{"message":"bye"}"#),
        );
        let (session, tokens) = machine(&transport);
        session.login("a@b.com", "x").await;

        session.logout().await;

        assert_eq!(
            transport.requests()[1].header("authorization"),
            Some("Bearer T1")
        );
        let state = session.state();
        assert!(state.user.is_none());
        assert!(!state.loading);
        assert_eq!(state.message, MSG_LOGGED_OUT);
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn logout_clears_locally_when_server_fails() {
        let transport = Arc::new(ScriptedTransport::new().fail("offline"));
        let (session, tokens) = machine(&transport);
        tokens.set(ACCESS_TOKEN_KEY, "T1").await.unwrap();

        session.logout().await;

        let state = session.state();
        assert!(state.user.is_none());
        assert!(!state.loading);
        assert_eq!(state.message, MSG_LOGOUT_FAILED);
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn superseded_login_does_not_overwrite_newer_result() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(
            ScriptedTransport::new()
                .gated(gate.clone())
                .respond(200, r#"{"user":{"email":"first@b.com"},"access_token":"T1"}"#)
                .respond(200, r#"{"user":{"email":"second@b.com"},"access_token":"T2"}"#),
        );
        let (session, tokens) = machine(&transport);

        let first = session.login("first@b.com", "x");
        let second = async {
            session.login("second@b.com", "y").await;
            gate.notify_one();
        };
        tokio::join!(first, second);

        let state = session.state();
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(state.user.as_ref().map(|u| u.email.as_str()), Some("second@b.com"));
        assert!(!state.loading);
        assert_eq!(state.message, MSG_AUTHENTICATED);
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn logout_during_login_keeps_token_cleared() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(
            ScriptedTransport::new()
                .gated(gate.clone())
                .respond(200, r#"{"user":{"email":"a@b.com"},"access_token":"T1"}"#)
                .respond(200, r#"{"message":"Sesión cerrada."}"#),
        );
        let (session, tokens) = machine(&transport);

        let login = session.login("a@b.com", "x");
        let logout = async {
            session.logout().await;
            gate.notify_one();
        };
        tokio::join!(login, logout);

        let state = session.state();
        assert_eq!(transport.requests().len(), 2);
        assert!(state.user.is_none());
        assert!(!state.loading);
        assert_eq!(state.message, MSG_LOGGED_OUT);
        assert_eq!(tokens.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscribers_observe_loading_transitions() {
        let transport = Arc::new(ScriptedTransport::new().respond(401, "{}"));
        let (session, _) = machine(&transport);
        let mut rx = session.subscribe();

        session.login("a@b.com", "x").await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(!state.loading);
        assert_eq!(state.message, MSG_LOGIN_FAILED);
    }
}
