use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    dto::auth::{AddPetRequest, SessionResponse, UpdateProfileRequest, VerifyOtpRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Pet, Profile, Role, User, collections::USERS},
    response::ApiResponse,
    services::load,
    state::AppState,
    store::{encode, fields},
};

/// Exchange a verified phone identity for a session, registering the user on
/// first sight.
pub async fn verify_otp(
    state: &AppState,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<SessionResponse>> {
    let id_token = payload.id_token.trim();
    if id_token.is_empty() {
        return Err(AppError::BadRequest("ID token is required".into()));
    }
    let identity = state.authorizer.verify(id_token).await?;
    let now = Utc::now();

    let user = match state.store.get(USERS, &identity.uid).await? {
        Some(_) => {
            let patch = fields(json!({ "updatedAt": now, "lastLogin": now }));
            state
                .store
                .update(USERS, &identity.uid, patch)
                .await?
                .decode::<User>()?
        }
        None => {
            let user = User {
                uid: identity.uid.clone(),
                phone_number: identity
                    .phone_number
                    .clone()
                    .or(payload.phone_number.filter(|p| !p.trim().is_empty())),
                role: Role::User,
                profile: Profile::default(),
                created_at: now,
                updated_at: now,
                last_login: None,
            };
            state.store.set(USERS, &user.uid, encode(&user)?).await?;
            tracing::info!(uid = %user.uid, "registered new user");
            user
        }
    };

    let token = state.authorizer.issue(&user).await?;
    Ok(ApiResponse::success(
        "Authentication successful",
        SessionResponse { user, token },
        None,
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let record: User = load(state, USERS, &user.uid, "User").await?;
    Ok(ApiResponse::success("Ok", record, None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let mut record: User = load(state, USERS, &user.uid, "User").await?;
    if let Some(name) = payload.name {
        record.profile.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        record.profile.email = email.trim().to_string();
    }
    if let Some(address) = payload.address {
        record.profile.address = address;
    }

    let patch = fields(json!({
        "profile": record.profile,
        "updatedAt": Utc::now(),
    }));
    let updated = state
        .store
        .update(USERS, &user.uid, patch)
        .await?
        .decode::<User>()?;
    Ok(ApiResponse::success("Profile updated successfully", updated, None))
}

pub async fn add_pet(
    state: &AppState,
    user: &AuthUser,
    payload: AddPetRequest,
) -> AppResult<ApiResponse<Pet>> {
    let mut record: User = load(state, USERS, &user.uid, "User").await?;

    let mut details = payload.details;
    details.remove("id");
    details.remove("createdAt");
    let pet = Pet {
        id: format!("pet_{}", Uuid::new_v4().simple()),
        created_at: Utc::now(),
        details,
    };
    record.profile.pets.push(pet.clone());

    let patch = fields(json!({
        "profile": record.profile,
        "updatedAt": Utc::now(),
    }));
    state.store.update(USERS, &user.uid, patch).await?;
    Ok(ApiResponse::success("Pet added successfully", pet, None))
}

/// Sessions are stateless tokens; the client discards its copy.
pub async fn logout(_user: &AuthUser) -> ApiResponse<Value> {
    ApiResponse::success("Logged out successfully", json!({}), None)
}
