use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::{
    ChangePasswordRequest, LookupItem, LookupKind, LoginRequest, SignupRequest, SystemSettings,
    User,
};
use crate::engine::{accounts, EngineError};
use crate::AppState;

use super::error::ApiError;
use super::extract::ApiJson;
use super::validation::{validate_password, validate_signup};
use super::MessageResponse;

pub const TOKEN_COOKIE: &str = "token";

/// JWT claims carried in the `token` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(user: &User, auth: &AuthConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        role: user.role.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(auth.token_ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, auth: &AuthConfig) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::unauthorized("Session expired, please log in again"),
        _ => ApiError::unauthorized("Not authenticated"),
    })
}

fn session_cookie(token: String, auth: &AuthConfig) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(auth.secure_cookie)
        .build()
}

/// Extract the token: the session cookie first, then a Bearer header
fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Extractor for the current authenticated user. Refreshes `last_active`.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        let claims = decode_token(&token, &state.config.auth)?;

        let user = User::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        if !user.is_active {
            return Err(ApiError::unauthorized("Account is not active"));
        }

        User::touch(&state.db, &user.id, chrono::Utc::now()).await?;
        Ok(user)
    }
}

/// An authenticated HR admin or admin
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = User::from_request_parts(parts, state).await?;
        if !user.is_privileged() {
            return Err(EngineError::NotAuthorized.into());
        }
        Ok(AdminUser(user))
    }
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: User,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    validate_signup(&request, state.config.policy.min_password_length)?;
    let user = accounts::register(&state.db, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created. An administrator must activate it before you can log in."
                .to_string(),
            user,
        }),
    ))
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let user = accounts::authenticate(&state.db, &request.username, &request.password).await?;
    let token = issue_token(&user, &state.config.auth).map_err(|e| {
        tracing::error!("Failed to issue token: {}", e);
        ApiError::internal()
    })?;
    User::touch(&state.db, &user.id, chrono::Utc::now()).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(session_cookie(token.clone(), &state.config.auth));
    Ok((jar, Json(LoginResponse { token, user })))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/").build());
    (jar, Json(MessageResponse::new("Logged out")))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password(&request.new_password, state.config.policy.min_password_length)
        .map_err(|e| ApiError::validation_field("newPassword", e))?;

    accounts::change_password(
        &state.db,
        &user,
        &request.current_password,
        &request.new_password,
    )
    .await?;

    Ok(Json(MessageResponse::new("Password updated")))
}

pub async fn me(user: User) -> Json<User> {
    Json(user)
}

/// What the signup form needs before anyone is logged in
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub signup_enabled: bool,
    pub departments: Vec<String>,
    pub zones: Vec<String>,
    pub roles: Vec<String>,
}

pub async fn bootstrap(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BootstrapResponse>, ApiError> {
    let settings = SystemSettings::load(&state.db).await?;
    Ok(Json(BootstrapResponse {
        signup_enabled: settings.signup_enabled,
        departments: LookupItem::names(&state.db, LookupKind::Department).await?,
        zones: LookupItem::names(&state.db, LookupKind::Zone).await?,
        roles: LookupItem::names(&state.db, LookupKind::Role).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            ..AuthConfig::default()
        }
    }

    fn user() -> User {
        User {
            id: "u-1".into(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password_hash: String::new(),
            full_name: "Jane Doe".into(),
            employee_id: "EMP-2026-001-0001".into(),
            department: None,
            position: None,
            location: None,
            phone: None,
            role: "hr_admin".into(),
            is_active: true,
            last_active: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let config = auth_config();
        let token = issue_token(&user(), &config).unwrap();
        let claims = decode_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, "hr_admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_with_other_secret_is_rejected() {
        let token = issue_token(&user(), &auth_config()).unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        };
        let err = decode_token(&token, &other).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = AuthConfig {
            token_ttl_hours: -2,
            ..auth_config()
        };
        let token = issue_token(&user(), &config).unwrap();
        let err = decode_token(&token, &config).unwrap_err();
        assert!(err.message().contains("expired"));
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        let mut bearer_only = HeaderMap::new();
        bearer_only.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&bearer_only).as_deref(), Some("xyz"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".into(), &auth_config());
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
