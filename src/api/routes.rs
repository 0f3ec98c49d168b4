//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, CreateAccountParams, CreateUserParams, Currency, ListAccountsParams, User,
};
use crate::engine::{TransferCommand, TransferResult};
use crate::error::AppError;
use crate::password::{self, PasswordError};
use crate::token::{TokenError, TokenPayload};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

/// User as returned to clients; the password hash never leaves the server
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUserResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub owner: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    pub page_id: i64,
    pub page_size: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account: i64,
    pub to_account: i64,
    pub amount: i64,
    pub currency: String,
}

const MIN_PASSWORD_LEN: usize = 8;
const MIN_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 10;

// =========================================================================
// Validation
// =========================================================================

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidRequest(
            "username must be non-empty and alphanumeric".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(AppError::InvalidRequest(format!("invalid email '{}'", email)));
    }
    Ok(())
}

fn parse_currency(currency: &str) -> Result<Currency, AppError> {
    currency.parse::<Currency>().map_err(bad_request)
}

fn bad_request(rejection: impl std::fmt::Display) -> AppError {
    AppError::InvalidRequest(rejection.to_string())
}

// =========================================================================
// API Routers
// =========================================================================

/// Routes reachable without a token
pub fn create_public_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login_user))
}

/// Routes that require a verified bearer token
pub fn create_protected_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:id", get(get_account))
        .route("/transfers", post(create_transfer))
}

// =========================================================================
// POST /users
// =========================================================================

/// Register a new user
async fn create_user(
    State(state): State<AppState>,
    request: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(request) = request.map_err(bad_request)?;

    validate_username(&request.username)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if request.full_name.trim().is_empty() {
        return Err(AppError::InvalidRequest("full_name is required".to_string()));
    }
    validate_email(&request.email)?;

    let hashed_password =
        password::hash_password(&request.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let user = state
        .store
        .create_user(CreateUserParams {
            username: request.username,
            hashed_password,
            full_name: request.full_name,
            email: request.email,
        })
        .await?;

    tracing::info!(username = %user.username, "User created");

    Ok(Json(user.into()))
}

// =========================================================================
// POST /users/login
// =========================================================================

/// Exchange credentials for an access token
async fn login_user(
    State(state): State<AppState>,
    request: Result<Json<LoginUserRequest>, JsonRejection>,
) -> Result<Json<LoginUserResponse>, AppError> {
    let Json(request) = request.map_err(bad_request)?;
    validate_username(&request.username)?;

    let user = state
        .store
        .get_user(&request.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", request.username)))?;

    password::check_password(&request.password, &user.hashed_password).map_err(|e| match e {
        PasswordError::Mismatch => AppError::Unauthorized("incorrect password".to_string()),
        other => AppError::Internal(other.to_string()),
    })?;

    let access_token_expires_at = Utc::now()
        .checked_add_signed(state.access_token_duration)
        .ok_or(TokenError::DurationOutOfRange)?;
    let access_token = state
        .token_maker
        .create_token(&user.username, state.access_token_duration)?;

    Ok(Json(LoginUserResponse {
        access_token,
        access_token_expires_at,
        user: user.into(),
    }))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open an account for the authenticated user
async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<TokenPayload>,
    request: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<Json<Account>, AppError> {
    let Json(request) = request.map_err(bad_request)?;
    if request.owner.is_empty() {
        return Err(AppError::InvalidRequest("owner is required".to_string()));
    }
    let currency = parse_currency(&request.currency)?;

    if request.owner != auth.username {
        return Err(AppError::Unauthorized(
            "account owner does not match the authenticated user".to_string(),
        ));
    }

    let account = state
        .store
        .create_account(CreateAccountParams {
            owner: auth.username,
            balance: 0,
            currency,
        })
        .await?;

    Ok(Json(account))
}

// =========================================================================
// GET /accounts/:id
// =========================================================================

/// Fetch one of the caller's accounts
async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<TokenPayload>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Account>, AppError> {
    let Path(id) = id.map_err(bad_request)?;
    if id < 1 {
        return Err(AppError::InvalidRequest("id must be at least 1".to_string()));
    }

    let account = state
        .store
        .get_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", id)))?;

    if account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "account does not belong to the authenticated user".to_string(),
        ));
    }

    Ok(Json(account))
}

// =========================================================================
// GET /accounts
// =========================================================================

/// List the caller's accounts, one page at a time
async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<TokenPayload>,
    query: Result<Query<ListAccountsQuery>, QueryRejection>,
) -> Result<Json<Vec<Account>>, AppError> {
    let Query(query) = query.map_err(bad_request)?;
    if query.page_id < 1 {
        return Err(AppError::InvalidRequest("page_id must be at least 1".to_string()));
    }
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&query.page_size) {
        return Err(AppError::InvalidRequest(format!(
            "page_size must be between {} and {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE
        )));
    }

    let offset = (query.page_id - 1)
        .checked_mul(query.page_size)
        .ok_or_else(|| AppError::InvalidRequest("page_id is out of range".to_string()))?;

    let accounts = state
        .store
        .list_accounts(ListAccountsParams {
            owner: auth.username,
            limit: query.page_size,
            offset,
        })
        .await?;

    Ok(Json(accounts))
}

// =========================================================================
// POST /transfers
// =========================================================================

/// Move funds out of one of the caller's accounts
async fn create_transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<TokenPayload>,
    request: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferResult>, AppError> {
    let Json(request) = request.map_err(bad_request)?;

    if request.from_account < 1 || request.to_account < 1 {
        return Err(AppError::InvalidRequest(
            "account ids must be at least 1".to_string(),
        ));
    }
    if request.amount <= 0 {
        return Err(AppError::InvalidRequest("amount must be positive".to_string()));
    }
    if request.from_account == request.to_account {
        return Err(AppError::InvalidRequest(
            "cannot transfer to the same account".to_string(),
        ));
    }
    let currency = parse_currency(&request.currency)?;

    let from_account = state
        .store
        .get_account(request.from_account)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", request.from_account)))?;

    if from_account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "from account does not belong to the authenticated user".to_string(),
        ));
    }

    let result = state
        .engine
        .execute(TransferCommand::new(
            request.from_account,
            request.to_account,
            request.amount,
            currency,
        ))
        .await?;

    Ok(Json(result))
}
