use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Extra, User};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub id_token: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Arbitrary pet fields: name, species, breed, age...
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AddPetRequest {
    #[schema(value_type = Object)]
    pub details: Extra,
}
