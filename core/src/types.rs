//! Domain DTOs for the pet-care API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch drift between the two crates. Server payloads
//! are decoded into these structs at the HTTP boundary so the state machines
//! never branch on ad hoc field presence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An authenticated account as returned by the server.
///
/// Only `email` is guaranteed; other fields the server sends are kept in
/// `extra` so nothing is lost when the user is re-serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            extra: Map::new(),
        }
    }
}

/// A pet profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub birth_date: String,
}

/// Request payload for creating a pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPet {
    pub name: String,
    pub species: String,
    pub breed: String,
    pub birth_date: String,
    pub color: String,
}

/// Request payload for updating a pet. Only the fields present in the JSON
/// are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A decoded login or registration response.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: User,
    pub access_token: Option<String>,
}

/// Wire shape of `/auth/login` and `/users/register` responses. The server
/// spells the token field both ways depending on the endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthPayload {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "accessToken")]
    access_token_camel: Option<String>,
}

impl AuthPayload {
    pub fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token.or(self.access_token_camel);
        self.user.map(|user| AuthSession { user, access_token })
    }
}

/// Wire shape of `GET /pets/:id`.
#[derive(Debug, Deserialize)]
pub(crate) struct PetEnvelope {
    pub pet: Pet,
}
