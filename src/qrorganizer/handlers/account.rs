//! Account endpoints: login, create, logout.
//!
//! The session token only ever travels in the `qrorganizer_session` cookie;
//! response bodies carry the public session view.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use tracing::{error, instrument};

use super::{
    bad_request, internal_error,
    types::{ErrorResponse, IdentityResult, LoginRequest},
};
use crate::account::{AccountCredentials, AccountService, UserSession};

pub(crate) const SESSION_COOKIE_NAME: &str = "qrorganizer_session";

/// Session cookie attributes fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub ttl_seconds: i64,
    pub secure: bool,
}

impl CookieSettings {
    fn session_cookie(self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl_seconds
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    fn clear_cookie(self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie =
            format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = UserSession),
        (status = 400, description = "Unknown email or unconfirmed email", body = ErrorResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "account"
)]
#[instrument(skip(accounts, cookies, payload))]
pub async fn login(
    accounts: Extension<AccountService>,
    cookies: Extension<CookieSettings>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return bad_request("Missing payload");
    };

    let signed_in = match accounts.login(&request.email, &request.password).await {
        Ok(signed_in) => signed_in,
        Err(err) => return err.into_response(),
    };

    let cookie = match cookies.session_cookie(signed_in.session_token.expose_secret()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return internal_error();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    (StatusCode::OK, headers, Json(signed_in.session)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/create",
    request_body = AccountCredentials,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Validation or access code failure", body = ErrorResponse),
        (status = 401, description = "Password mismatch (empty body) or identity rejection", body = IdentityResult)
    ),
    tag = "account"
)]
#[instrument(skip(accounts, payload))]
pub async fn create(
    accounts: Extension<AccountService>,
    payload: Option<Json<AccountCredentials>>,
) -> impl IntoResponse {
    let Some(Json(creds)) = payload else {
        return bad_request("Missing payload");
    };

    match accounts.create_account(&creds).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session cleared")
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    accounts: Extension<AccountService>,
    cookies: Extension<CookieSettings>,
) -> impl IntoResponse {
    let token = extract_session_token(&headers);
    accounts.logout(token.as_deref()).await;

    // Always clear the cookie, even without a live session.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = cookies.clear_cookie() {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::OK, response_headers).into_response()
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}
