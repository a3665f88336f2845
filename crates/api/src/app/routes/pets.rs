use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use petstore_core::{Entity, PetId};
use petstore_infra::EditOperation;
use petstore_pets::{NewPet, Pet, PetFilter, PetUpdate};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::app::to_payload;
use crate::context::AuthContext;
use crate::validation::{validate_query, Validated};

pub async fn list_pets(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Pet>>, ApiError> {
    let filter: PetFilter = validate_query(params)?;
    let pets = services.pets.list_pets(&filter).await?;
    Ok(Json(pets))
}

pub async fn get_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pet_id): Path<String>,
) -> Result<Json<Pet>, ApiError> {
    let pet_id: PetId = pet_id.parse()?;
    match services.pets.find_pet_by_id(pet_id).await? {
        Some(pet) => Ok(Json(pet)),
        None => Err(ApiError::not_found(format!("{pet_id} Id Not Found"))),
    }
}

pub async fn create_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Extension(Validated(body)): Extension<Validated<NewPet>>,
) -> Result<Response, ApiError> {
    let pet = Pet::create(body, Utc::now());
    services.pets.insert_pet(&pet).await?;

    services
        .audit
        .record(
            EditOperation::Create,
            Pet::collection(),
            pet.id,
            to_payload(&pet)?,
            Some(auth.claims()),
        )
        .await?;

    tracing::info!(pet_id = %pet.id, user_id = %auth.user_id(), "pet inserted");
    Ok(Json(json!({ "message": "Pet inserted.", "petId": pet.id })).into_response())
}

pub async fn update_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Extension(Validated(update)): Extension<Validated<PetUpdate>>,
    Path(pet_id): Path<String>,
) -> Result<Response, ApiError> {
    let pet_id: PetId = pet_id.parse()?;

    let outcome = services.pets.update_pet(pet_id, &update).await?;
    if outcome.matched_count == 0 {
        return Err(ApiError::not_found(format!("Pet {pet_id} Not Found.")));
    }

    services
        .audit
        .record(
            EditOperation::Update,
            Pet::collection(),
            pet_id,
            to_payload(&update)?,
            Some(auth.claims()),
        )
        .await?;

    Ok(Json(json!({ "message": format!("Pet {pet_id} Updated."), "petId": pet_id })).into_response())
}

pub async fn delete_pet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(pet_id): Path<String>,
) -> Result<Response, ApiError> {
    let pet_id: PetId = pet_id.parse()?;
    let not_found = || ApiError::not_found(format!("Pet {pet_id} Not Found."));

    let snapshot = services.pets.find_pet_by_id(pet_id).await?.ok_or_else(not_found)?;

    let outcome = services.pets.delete_pet(pet_id).await?;
    if outcome.deleted_count == 0 {
        return Err(not_found());
    }

    services
        .audit
        .record(
            EditOperation::Delete,
            Pet::collection(),
            pet_id,
            to_payload(&snapshot)?,
            Some(auth.claims()),
        )
        .await?;

    tracing::info!(pet_id = %pet_id, user_id = %auth.user_id(), "pet deleted");
    Ok(Json(json!({ "message": format!("Pet {pet_id} Deleted."), "petId": pet_id })).into_response())
}
