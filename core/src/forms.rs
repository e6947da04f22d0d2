//! Form models behind the add-pet and edit-pet screens.
//!
//! Validation happens here, before any state-machine operation runs, and
//! failures are plain messages for the screen to show.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::session::SessionState;
use crate::types::{NewPet, Pet, PetUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Por favor, completa todos los campos.")]
    MissingFields,

    #[error("Fecha de nacimiento inválida: {0}. Usa el formato YYYY-MM-DD.")]
    InvalidBirthDate(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Species {
    #[default]
    Perro,
    Gato,
}

impl Species {
    pub fn as_str(self) -> &'static str {
        match self {
            Species::Perro => "Perro",
            Species::Gato => "Gato",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a `YYYY-MM-DD` date into the midnight-UTC ISO timestamp the API
/// stores, e.g. `2020-01-31` becomes `2020-01-31T00:00:00.000Z`.
pub fn iso_birth_date(input: &str) -> Result<String, FormError> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| FormError::InvalidBirthDate(input.trim().to_string()))?;
    Ok(format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")))
}

/// Input collected by the add-pet screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPetForm {
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub birth_date: String,
    pub color: String,
}

impl NewPetForm {
    pub fn to_new_pet(&self) -> Result<NewPet, FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingFields);
        }
        Ok(NewPet {
            name: self.name.trim().to_string(),
            species: self.species.as_str().to_string(),
            breed: self.breed.trim().to_string(),
            birth_date: iso_birth_date(&self.birth_date)?,
            color: self.color.trim().to_string(),
        })
    }
}

/// Edit-modal fields, prefilled from the tracked pet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetEditForm {
    pub name: String,
    pub species: String,
    pub breed: String,
    pub color: String,
    pub birth_date: String,
}

impl From<&Pet> for PetEditForm {
    fn from(pet: &Pet) -> Self {
        Self {
            name: pet.name.clone(),
            species: pet.species.clone(),
            breed: pet.breed.clone(),
            color: pet.color.clone(),
            birth_date: pet.birth_date.clone(),
        }
    }
}

impl PetEditForm {
    /// Every field is required; the result sends all of them.
    pub fn to_update(&self) -> Result<PetUpdate, FormError> {
        let fields = [
            &self.name,
            &self.species,
            &self.breed,
            &self.color,
            &self.birth_date,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(FormError::MissingFields);
        }
        Ok(PetUpdate {
            name: Some(self.name.trim().to_string()),
            species: Some(self.species.trim().to_string()),
            breed: Some(self.breed.trim().to_string()),
            color: Some(self.color.trim().to_string()),
            birth_date: Some(self.birth_date.trim().to_string()),
        })
    }
}

/// Whether a guarded screen must send the user to login.
pub fn requires_login(session: &SessionState) -> bool {
    !session.is_authenticated()
}
