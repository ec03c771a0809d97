use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use crewdesk_db::models::User;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub workspace_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub global_role: String,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            global_role: format!("{:?}", user.global_role).to_lowercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub timezone: Option<String>,
}

fn auth_cookie(token: &str, max_age: u64) -> String {
    format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        token, max_age
    )
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let password_hash = state.auth.hash_password(&body.password)?;

    let user = state
        .users
        .create(
            body.email.clone(),
            body.username.clone(),
            body.display_name.clone(),
            password_hash,
        )
        .await?;

    let user_id = user.id.ok_or_else(|| {
        ApiError::Internal("Created user has no id".to_string())
    })?;

    // Create an initial workspace if requested
    if let Some(workspace_name) = body.workspace_name {
        state.workspaces.create(workspace_name, None, user_id).await?;
    }

    let tokens = state.auth.generate_tokens(
        user_id,
        &user.email,
        &user.username,
        user.global_role,
    )?;

    let mut headers = HeaderMap::new();
    if let Ok(cookie) = auth_cookie(&tokens.access_token, tokens.expires_in).parse() {
        headers.insert(header::SET_COOKIE, cookie);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user: UserResponse::from_user(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let user = match (&body.email, &body.username) {
        (Some(email), _) => state.users.find_by_email(email).await,
        (None, Some(username)) => state.users.find_by_username(username).await,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "email or username is required".to_string(),
            ));
        }
    }
    .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !state.auth.verify_password(&body.password, hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User has no id".to_string()))?;
    state.users.touch_last_active(user_id).await?;

    let tokens = state.auth.generate_tokens(
        user_id,
        &user.email,
        &user.username,
        user.global_role,
    )?;

    let mut headers = HeaderMap::new();
    if let Ok(cookie) = auth_cookie(&tokens.access_token, tokens.expires_in).parse() {
        headers.insert(header::SET_COOKIE, cookie);
    }

    Ok((
        headers,
        Json(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user: UserResponse::from_user(&user),
        }),
    ))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;

    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;
    let user = state.users.base.find_by_id(user_id).await?;

    let tokens = state.auth.generate_tokens(
        user_id,
        &user.email,
        &user.username,
        user.global_role,
    )?;

    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse::from_user(&user),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(UserResponse::from_user(&user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .update_profile(auth.user_id, body.display_name, body.avatar, body.timezone)
        .await?;
    Ok(Json(UserResponse::from_user(&user)))
}
