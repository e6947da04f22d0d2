//! Client core for the pet-care records app.
//!
//! # Overview
//! Everything a mobile shell needs below its views: access-token storage, an
//! API client that injects and captures bearer tokens, and two reducer-driven
//! state machines (session, pet profile) that screens subscribe to.
//!
//! # Design
//! - `PetcareClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. The network round-trip is done by a
//!   host-supplied `Transport`, keeping the core deterministic under test.
//! - `ApiClient` adds auth interception around every round-trip. The
//!   `TokenStore` it uses is injected, never global.
//! - State machines never return errors. Every failure ends up as a message
//!   string in state, and a request-generation ticket discards results from
//!   operations that a newer one superseded.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod forms;
pub mod http;
pub mod pet_profile;
pub mod session;
pub mod store;
pub mod token;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, IgnoreUnauthorized, UnauthorizedHandler};
pub use client::PetcareClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use forms::{FormError, NewPetForm, PetEditForm, Species};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pet_profile::{PetProfileAction, PetProfileMachine, PetProfileState};
pub use session::{SessionAction, SessionMachine, SessionState};
pub use store::Reducer;
pub use token::{FileTokenStore, MemoryTokenStore, StorageError, TokenStore, ACCESS_TOKEN_KEY};
pub use transport::Transport;
pub use types::{AuthSession, NewPet, Pet, PetUpdate, User};
