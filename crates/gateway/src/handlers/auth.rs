//! Registration handlers

use axum::{extract::State, Json};

use crate::extract::ApiJson;
use crate::AppState;
use yamdb_common::{
    auth::{self, SignupPayload, SignupResponse, TokenPayload, TokenResponse},
    errors::Result,
};

/// Register (or re-register) and mail a confirmation code
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupPayload>,
) -> Result<Json<SignupResponse>> {
    let response = auth::register(
        &state.repo(),
        state.mailer.as_ref(),
        &state.config.mail.from_address,
        payload,
    )
    .await?;

    Ok(Json(response))
}

/// Exchange a confirmation code for a bearer token
pub async fn token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenPayload>,
) -> Result<Json<TokenResponse>> {
    let response = auth::obtain_token(&state.repo(), &state.jwt, payload).await?;
    Ok(Json(response))
}
