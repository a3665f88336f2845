use axum::{
    routing::{delete, get, post, put},
    Router,
};

use petstore_auth::permissions::names;
use petstore_auth::AccessPolicy;
use petstore_pets::{NewPet, PetUpdate};

use crate::app::dto::{LoginRequest, RegisterRequest, UserUpdateRequest};
use crate::authz::guard;
use crate::validation::with_body;

pub mod edits;
pub mod pets;
pub mod system;
pub mod users;

/// Every route with its validation schema and access policy.
///
/// Validation is layered outside the authorization gate, so a malformed
/// payload is rejected before the caller's permissions are checked.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/pet/list", get(pets::list_pets))
        .route(
            "/api/pet/new",
            with_body::<NewPet, _>(guard(
                put(pets::create_pet),
                AccessPolicy::permission(names::CAN_INSERT_PET),
            )),
        )
        .route(
            "/api/pet/:petId",
            get(pets::get_pet)
                .merge(with_body::<PetUpdate, _>(guard(
                    put(pets::update_pet),
                    AccessPolicy::permission(names::CAN_UPDATE_PET),
                )))
                .merge(guard(
                    delete(pets::delete_pet),
                    AccessPolicy::permission(names::CAN_DELETE_PET),
                )),
        )
        .route(
            "/api/user/register",
            with_body::<RegisterRequest, _>(post(users::register)),
        )
        .route("/api/user/login", with_body::<LoginRequest, _>(post(users::login)))
        .route(
            "/api/user/me",
            guard(get(users::me), AccessPolicy::authenticated()).merge(
                with_body::<UserUpdateRequest, _>(guard(
                    put(users::update_me),
                    AccessPolicy::authenticated(),
                )),
            ),
        )
        .route(
            "/api/user/:userId",
            with_body::<UserUpdateRequest, _>(guard(
                put(users::update_user),
                AccessPolicy::permission(names::CAN_UPDATE_USER),
            )),
        )
        .route(
            "/api/edits",
            guard(
                get(edits::list_edits),
                AccessPolicy::permission(names::CAN_VIEW_EDITS),
            ),
        )
        .fallback(system::not_found)
}
