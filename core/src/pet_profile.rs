//! Pet profile state machine: tracks a single pet and its edit modal.

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::store::{Reducer, Store, Ticket};
use crate::types::{Pet, PetUpdate};

pub const MSG_FETCH_FAILED: &str = "Error al cargar los detalles de la mascota.";
pub const MSG_UPDATED: &str = "Mascota actualizada exitosamente.";
pub const MSG_UPDATE_FAILED: &str = "Error al actualizar la mascota.";
pub const MSG_DELETED: &str = "Mascota eliminada exitosamente.";
pub const MSG_DELETE_FAILED: &str = "Error al eliminar la mascota.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetProfileState {
    pub pet: Option<Pet>,
    pub loading: bool,
    pub error: String,
    pub message: String,
    pub is_edit_modal_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetProfileAction {
    SetLoading(bool),
    /// Also ends loading.
    SetPet(Option<Pet>),
    /// Also ends loading.
    SetError(String),
    SetMessage(String),
    SetEditModalOpen(bool),
    ClearMessage,
    ClearError,
}

impl Reducer for PetProfileState {
    type Action = PetProfileAction;

    fn reduce(self, action: PetProfileAction) -> Self {
        match action {
            PetProfileAction::SetLoading(loading) => Self { loading, ..self },
            PetProfileAction::SetPet(pet) => Self {
                pet,
                loading: false,
                ..self
            },
            PetProfileAction::SetError(error) => Self {
                error,
                loading: false,
                ..self
            },
            PetProfileAction::SetMessage(message) => Self { message, ..self },
            PetProfileAction::SetEditModalOpen(is_edit_modal_open) => Self {
                is_edit_modal_open,
                ..self
            },
            PetProfileAction::ClearMessage => Self {
                message: String::new(),
                ..self
            },
            PetProfileAction::ClearError => Self {
                error: String::new(),
                ..self
            },
        }
    }
}

pub struct PetProfileMachine {
    api: ApiClient,
    store: Store<PetProfileState>,
}

impl PetProfileMachine {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::new(),
        }
    }

    pub fn state(&self) -> PetProfileState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<PetProfileState> {
        self.store.subscribe()
    }

    pub async fn fetch(&self, id: &str) {
        let ticket = self.store.begin(PetProfileAction::SetLoading(true));
        self.load(ticket, id).await;
    }

    /// Sends the partial update, then re-fetches the full pet rather than
    /// merging locally, and closes the edit modal.
    pub async fn update(&self, id: &str, changes: &PetUpdate) {
        let ticket = self.store.begin(PetProfileAction::SetLoading(true));

        match self.api.update_pet(id, changes).await {
            Ok(()) => {
                self.store
                    .dispatch(ticket, PetProfileAction::SetMessage(MSG_UPDATED.to_string()));
                self.load(ticket, id).await;
                self.store
                    .dispatch(ticket, PetProfileAction::SetEditModalOpen(false));
            }
            Err(err) => self.fail(ticket, "update", &err, MSG_UPDATE_FAILED),
        }

        self.store.dispatch(ticket, PetProfileAction::SetLoading(false));
    }

    /// Deletes the pet and stops tracking it. Navigating away is left to the
    /// screen.
    pub async fn delete(&self, id: &str) {
        let ticket = self.store.begin(PetProfileAction::SetLoading(true));

        match self.api.delete_pet(id).await {
            Ok(()) => {
                debug!(pet_id = id, "pet deleted");
                self.store
                    .dispatch(ticket, PetProfileAction::SetMessage(MSG_DELETED.to_string()));
                self.store.dispatch(ticket, PetProfileAction::SetPet(None));
            }
            Err(err) => self.fail(ticket, "delete", &err, MSG_DELETE_FAILED),
        }

        self.store.dispatch(ticket, PetProfileAction::SetLoading(false));
    }

    pub fn set_edit_modal_open(&self, open: bool) {
        self.store.apply(PetProfileAction::SetEditModalOpen(open));
    }

    pub fn clear_message(&self) {
        self.store.apply(PetProfileAction::ClearMessage);
    }

    pub fn clear_error(&self) {
        self.store.apply(PetProfileAction::ClearError);
    }

    async fn load(&self, ticket: Ticket, id: &str) {
        match self.api.get_pet(id).await {
            Ok(pet) => {
                self.store.dispatch(ticket, PetProfileAction::SetPet(Some(pet)));
                self.store.dispatch(ticket, PetProfileAction::ClearError);
            }
            Err(err) => self.fail(ticket, "fetch", &err, MSG_FETCH_FAILED),
        }
    }

    fn fail(&self, ticket: Ticket, operation: &str, err: &ApiError, default_message: &str) {
        let message = err.server_message().unwrap_or(default_message).to_string();
        warn!(operation, error = %err, %message, "pet request failed");
        self.store.dispatch(ticket, PetProfileAction::SetError(message));
    }
}
