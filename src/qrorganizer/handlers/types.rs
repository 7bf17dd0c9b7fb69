use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::{account::ports::IdentityError, subscription::SubscriptionLevel};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

/// Body returned when the identity store refuses a new account.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityResult {
    pub succeeded: bool,
    pub errors: Vec<IdentityError>,
}

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub name: String,
    pub version: String,
    pub restricted_environment: bool,
    pub subscription_levels: Vec<SubscriptionLevel>,
}
