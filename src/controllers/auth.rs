use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{middleware, models::User, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/* ---------- REGISTER ---------- */

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    name: String,
    #[validate(email(message = "email must be a valid address"))]
    email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    password: String,
    phone: Option<String>,
    birthday: Option<String>,
    address: Option<String>,
    gender: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // Optional fields arrive as empty strings from the web form
    let phone = req.phone.filter(|s| !s.is_empty());
    let address = req.address.filter(|s| !s.is_empty());
    let gender = req.gender.filter(|s| !s.is_empty()).unwrap_or_else(|| "other".to_string());
    let birthday = req
        .birthday
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| (StatusCode::BAD_REQUEST, "birthday must be YYYY-MM-DD".to_string()))?;

    let password_hash = bcrypt::hash(req.password.trim(), bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    let result = sqlx::query_as::<_, (i32, String, String)>(
        "INSERT INTO users (username, email, password_hash, phone, birthday, address, gender)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING user_id, username, email",
    )
    .bind(req.name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(phone)
    .bind(birthday)
    .bind(address)
    .bind(gender)
    .fetch_one(&state.db.pool)
    .await;

    match result {
        Ok((user_id, username, email)) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Account created successfully!",
                "user": { "user_id": user_id, "username": username, "email": email }
            })),
        )),
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => Err((
            StatusCode::BAD_REQUEST,
            "This email is already registered. Please use another one.".to_string(),
        )),
        Err(e) => {
            tracing::error!("register sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string()))
        }
    }
}

/* ---------- LOGIN ---------- */

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide an email and a password.".to_string(),
        ));
    }

    let user = User::find_by_email(&req.email.trim().to_lowercase(), &state.db)
        .await
        .map_err(|e| {
            tracing::error!("login sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
        })?;

    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Incorrect email or password.".to_string(),
        ));
    };

    if !user.verify_password(req.password.trim()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Incorrect email or password.".to_string(),
        ));
    }

    let token = middleware::issue_token(&user, &state.config.jwt).map_err(|e| {
        tracing::error!("token issuance failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error.".to_string())
    })?;

    Ok(Json(json!({
        "message": "Logged in successfully!",
        "token": token,
        "user": { "id": user.user_id, "name": user.username, "email": user.email }
    })))
}
