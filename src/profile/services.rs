use tracing::{info, instrument, warn};

use crate::{
    api::{ApiClient, AuthMode},
    auth::services::MIN_PASSWORD_LEN,
    error::ClientError,
    navigation::Navigation,
    profile::{
        dto::{
            ChangePasswordRequest, CreatePaymentRequest, CreatePaymentResponse, MessageResponse,
            UserInfoPayload,
        },
        model::{Tier, UserProfile},
    },
};

#[instrument(skip(api))]
pub async fn user_info(api: &ApiClient) -> Result<UserProfile, ClientError> {
    let payload: UserInfoPayload = api.get_json("/user/info/", AuthMode::Required).await?;
    let profile = UserProfile::from(payload);
    info!(
        username = %profile.username,
        tier = %profile.subscription_tier,
        checks_remaining = profile.checks_remaining,
        "profile loaded"
    );
    Ok(profile)
}

#[instrument(skip_all)]
pub async fn change_password(
    api: &ApiClient,
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<String, ClientError> {
    if new_password != confirm_password {
        return Err(ClientError::Validation("Passwords do not match".into()));
    }
    if new_password.len() < MIN_PASSWORD_LEN {
        warn!("new password too short");
        return Err(ClientError::Validation("Password too short".into()));
    }
    let body = ChangePasswordRequest {
        current_password,
        new_password,
    };
    let resp: MessageResponse = api
        .post_json("/user/change-password/", AuthMode::Required, &body)
        .await?;
    info!("password changed");
    Ok(resp
        .message
        .unwrap_or_else(|| "Password changed successfully".into()))
}

/// Asks the backend for a checkout link for `plan`.
#[instrument(skip(api))]
pub async fn create_payment(api: &ApiClient, plan: Tier) -> Result<Navigation, ClientError> {
    if plan == Tier::Free {
        return Err(ClientError::Validation("The free plan cannot be purchased".into()));
    }
    if !api.sessions().is_authenticated() {
        return Ok(Navigation::Login);
    }
    let body = CreatePaymentRequest {
        plan_id: plan.as_str(),
    };
    let resp: CreatePaymentResponse = api
        .post_json("/payment/create/", AuthMode::Required, &body)
        .await?;
    if resp.payment_url.is_empty() {
        return Err(ClientError::InvalidPayload("empty payment_url".into()));
    }
    info!(%plan, "payment created");
    Ok(Navigation::External(resp.payment_url))
}
