use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: String,
    pub color: String,
    pub birth_date: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePet {
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub birth_date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePet {
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub birth_date: Option<String>,
}

/// `{message}` payload: every non-2xx response and the plain acknowledgements
/// of logout and pet deletion.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

struct Account {
    user: User,
    password: String,
}

struct StoredPet {
    owner: Uuid,
    pet: Pet,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Uuid>,
    pets: HashMap<Uuid, StoredPet>,
}

impl Store {
    fn open_session(&mut self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id);
        token
    }
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<MessageBody>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(MessageBody {
            message: message.to_string(),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth/login", post(login))
        .route("/logout", post(logout))
        .route("/users/register", post(register))
        .route("/pets", get(list_pets).post(create_pet))
        .route("/pets/{id}", get(get_pet).put(update_pet).delete(delete_pet))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller's user id from the bearer header.
fn authorize(store: &Store, headers: &HeaderMap) -> Result<Uuid, Failure> {
    let token =
        bearer_token(headers).ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "No autorizado."))?;
    store
        .sessions
        .get(token)
        .copied()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Token inválido o expirado."))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = match store.accounts.get(&input.email) {
        Some(account) if account.password == input.password => account.user.clone(),
        _ => {
            tracing::info!(email = %input.email, "rejected login");
            return Err(failure(StatusCode::UNAUTHORIZED, "Credenciales inválidas."));
        }
    };
    let token = store.open_session(user.id);
    tracing::info!(user_id = %user.id, "login");
    Ok(Json(json!({ "user": user, "access_token": token })))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Result<Json<MessageBody>, Failure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    if let Some(token) = bearer_token(&headers) {
        store.sessions.remove(token);
    }
    Ok(Json(MessageBody {
        message: "Sesión cerrada.".to_string(),
    }))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<Registration>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Todos los campos son obligatorios.",
        ));
    }
    let mut store = db.write().await;
    if store.accounts.contains_key(&input.email) {
        return Err(failure(StatusCode::CONFLICT, "El correo ya está registrado."));
    }
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    store.accounts.insert(
        user.email.clone(),
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    let token = store.open_session(user.id);
    tracing::info!(user_id = %user.id, "registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": user, "accessToken": token })),
    ))
}

async fn list_pets(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Pet>>, Failure> {
    let store = db.read().await;
    let owner = authorize(&store, &headers)?;
    let pets = store
        .pets
        .values()
        .filter(|stored| stored.owner == owner)
        .map(|stored| stored.pet.clone())
        .collect();
    Ok(Json(pets))
}

async fn create_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreatePet>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut store = db.write().await;
    let owner = authorize(&store, &headers)?;
    let pet = Pet {
        id: Uuid::new_v4(),
        name: input.name,
        species: input.species,
        breed: input.breed,
        color: input.color,
        birth_date: input.birth_date,
    };
    store.pets.insert(
        pet.id,
        StoredPet {
            owner,
            pet: pet.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(json!({ "pet": pet }))))
}

fn find_pet(store: &Store, owner: Uuid, id: Uuid) -> Result<&Pet, Failure> {
    match store.pets.get(&id) {
        Some(stored) if stored.owner == owner => Ok(&stored.pet),
        _ => Err(failure(StatusCode::NOT_FOUND, "Mascota no encontrada.")),
    }
}

fn owned_pet<'a>(store: &'a mut Store, owner: Uuid, id: Uuid) -> Result<&'a mut Pet, Failure> {
    match store.pets.get_mut(&id) {
        Some(stored) if stored.owner == owner => Ok(&mut stored.pet),
        _ => Err(failure(StatusCode::NOT_FOUND, "Mascota no encontrada.")),
    }
}

async fn get_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let owner = authorize(&store, &headers)?;
    let pet = find_pet(&store, owner, id)?;
    Ok(Json(json!({ "pet": pet })))
}

async fn update_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePet>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let owner = authorize(&store, &headers)?;
    let pet = owned_pet(&mut store, owner, id)?;
    if let Some(name) = input.name {
        pet.name = name;
    }
    if let Some(species) = input.species {
        pet.species = species;
    }
    if let Some(breed) = input.breed {
        pet.breed = breed;
    }
    if let Some(color) = input.color {
        pet.color = color;
    }
    if let Some(birth_date) = input.birth_date {
        pet.birth_date = birth_date;
    }
    Ok(Json(json!({ "pet": pet })))
}

async fn delete_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageBody>, Failure> {
    let mut store = db.write().await;
    let owner = authorize(&store, &headers)?;
    find_pet(&store, owner, id)?;
    store.pets.remove(&id);
    Ok(Json(MessageBody {
        message: "Mascota eliminada.".to_string(),
    }))
}
