//! Stateless HTTP request builder and response parser for the pet-care API.
//!
//! # Design
//! `PetcareClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Authentication headers are not added here; that is the `ApiClient`'s job.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthPayload, AuthSession, LoginRequest, NewPet, Pet, PetEnvelope, PetUpdate, RegisterRequest,
};

/// Synchronous, stateless client for the pet-care API.
#[derive(Debug, Clone)]
pub struct PetcareClient {
    base_url: String,
}

impl PetcareClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, path);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", input)
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/users/register", input)
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.request(HttpMethod::Post, "/logout")
    }

    pub fn build_create_pet(&self, input: &NewPet) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/pets", input)
    }

    pub fn build_list_pets(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/pets")
    }

    pub fn build_get_pet(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/pets/{id}"))
    }

    pub fn build_update_pet(&self, id: &str, input: &PetUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/pets/{id}"), input)
    }

    pub fn build_delete_pet(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/pets/{id}"))
    }

    /// A login response must name the user; one without is treated as malformed.
    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthSession, ApiError> {
        check_status(&response)?;
        let payload: AuthPayload = decode(&response)?;
        payload.into_session().ok_or_else(|| {
            ApiError::Deserialization("login response carried no user".to_string())
        })
    }

    /// Returns `None` when the server accepted the registration without
    /// echoing the user back.
    pub fn parse_register(&self, response: HttpResponse) -> Result<Option<AuthSession>, ApiError> {
        check_status(&response)?;
        let payload: AuthPayload = decode(&response)?;
        Ok(payload.into_session())
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_create_pet(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_list_pets(&self, response: HttpResponse) -> Result<Vec<Pet>, ApiError> {
        check_status(&response)?;
        decode(&response)
    }

    pub fn parse_get_pet(&self, response: HttpResponse) -> Result<Pet, ApiError> {
        check_status(&response)?;
        let envelope: PetEnvelope = decode(&response)?;
        Ok(envelope.pet)
    }

    pub fn parse_update_pet(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_delete_pet(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

/// Map non-2xx responses to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_response(response))
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
