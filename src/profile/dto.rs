use serde::{Deserialize, Serialize};

use crate::profile::model::Tier;

/// `GET /user/info/` body; tier fields live under `profile`.
#[derive(Debug, Deserialize)]
pub struct UserInfoPayload {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub profile: ProfilePayload,
}

#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    pub subscription_tier: Tier,
    #[serde(default)]
    pub checks_remaining: i64,
    #[serde(default)]
    pub total_checks_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest<'a> {
    pub plan_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentResponse {
    pub payment_url: String,
}
