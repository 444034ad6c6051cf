//! Google federated-identity flow: PKCE redirect out, callback in,
//! upsert-or-login through the identity service.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::config::GoogleOAuthConfig;
use crate::dtos::FederatedAuthRequest;
use crate::services::ServiceError;
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    verified_email: bool,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

fn google_config(state: &AppState) -> Result<&GoogleOAuthConfig, AppError> {
    state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ServiceError::FeatureDisabled("Google sign-in").into())
}

/// GET /auth/google
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AppError> {
    let google = google_config(&state)?;

    let state_val = uuid::Uuid::new_v4().to_string();
    let code_verifier = {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        use rand::Rng;
        rng.fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    };

    let code_challenge = {
        let mut hasher = Sha256::new();
        hasher.update(code_verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    };

    let google_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}&code_challenge={}&code_challenge_method=S256",
        google.client_id, google.redirect_uri, state_val, code_challenge
    );

    let updated_jar = jar
        .add(
            Cookie::build(("oauth_state", state_val))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        )
        .add(
            Cookie::build(("code_verifier", code_verifier))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        );

    Ok((updated_jar, Redirect::to(&google_url).into_response()))
}

/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let google = google_config(&state)?.clone();

    let stored_state = jar.get("oauth_state").map(|c| c.value());
    if stored_state != Some(&query.state) {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid OAuth state")));
    }

    let code_verifier = jar
        .get("code_verifier")
        .map(|c| c.value())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing code verifier")))?;

    let client = reqwest::Client::new();
    let token_res = client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("client_id", &google.client_id),
            ("client_secret", &google.client_secret),
            ("code", &query.code),
            ("code_verifier", &code_verifier.to_string()),
            ("grant_type", &"authorization_code".to_string()),
            ("redirect_uri", &google.redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to exchange Google code");
            AppError::AuthError(anyhow::anyhow!("Authentication failed"))
        })?;

    if !token_res.status().is_success() {
        let status = token_res.status();
        let err_body = token_res.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %err_body, "Google token exchange error");
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Authentication failed"
        )));
    }

    let token_data: GoogleTokenResponse = token_res.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Google token response");
        AppError::InternalError(anyhow::anyhow!("Internal server error"))
    })?;

    let user_info_res = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(token_data.access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch Google user info");
            AppError::AuthError(anyhow::anyhow!("Authentication failed"))
        })?;

    let user_info: GoogleUserInfo = user_info_res.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Google user info");
        AppError::InternalError(anyhow::anyhow!("Internal server error"))
    })?;

    if !user_info.verified_email {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Google account email not verified"
        )));
    }

    let (first_name, last_name) = split_name(&user_info);

    let session = state
        .identity
        .federated_auth(FederatedAuthRequest {
            first_name,
            last_name,
            email: user_info.email,
            provider_id: user_info.id,
            photo_url: user_info.picture,
        })
        .await?;

    tracing::info!(staff_id = %session.staff.id, "Staff member logged in via Google");

    let redirect_url = format!(
        "{}/auth/callback?token={}",
        state.config.frontend_url.trim_end_matches('/'),
        session.session_token
    );

    let updated_jar = jar
        .remove(Cookie::from("oauth_state"))
        .remove(Cookie::from("code_verifier"));

    Ok((updated_jar, Redirect::to(&redirect_url).into_response()))
}

fn split_name(info: &GoogleUserInfo) -> (String, String) {
    match (&info.given_name, &info.family_name) {
        (Some(given), Some(family)) => (given.clone(), family.clone()),
        _ => {
            let full = info.name.clone().unwrap_or_else(|| {
                info.email.split('@').next().unwrap_or("Staff").to_string()
            });
            match full.split_once(' ') {
                Some((first, rest)) => (first.to_string(), rest.to_string()),
                None => (full, String::new()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(given: Option<&str>, family: Option<&str>, name: Option<&str>) -> GoogleUserInfo {
        GoogleUserInfo {
            id: "sub".to_string(),
            email: "ana.silva@example.com".to_string(),
            verified_email: true,
            given_name: given.map(String::from),
            family_name: family.map(String::from),
            name: name.map(String::from),
            picture: None,
        }
    }

    #[test]
    fn test_split_name_prefers_structured_fields() {
        let (first, last) = split_name(&info(Some("Ana"), Some("Silva"), Some("ignored")));
        assert_eq!((first.as_str(), last.as_str()), ("Ana", "Silva"));
    }

    #[test]
    fn test_split_name_falls_back_to_full_name() {
        let (first, last) = split_name(&info(None, None, Some("Ana Clara Silva")));
        assert_eq!((first.as_str(), last.as_str()), ("Ana", "Clara Silva"));
    }

    #[test]
    fn test_split_name_falls_back_to_email_local_part() {
        let (first, last) = split_name(&info(None, None, None));
        assert_eq!((first.as_str(), last.as_str()), ("ana.silva", ""));
    }
}
