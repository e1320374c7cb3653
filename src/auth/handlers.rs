use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        repo::CreateUserError,
        repo_types::{NewUser, User},
        services::{hash_password, is_valid_email, normalize_email, verify_password},
    },
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);

    if name.is_empty() {
        warn!("missing name");
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.trim().is_empty() {
        warn!("missing password");
        return Err(ApiError::Validation("Password is required".into()));
    }

    // Ensure email is not taken
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::DuplicateUser);
    }

    let password_hash = hash_password(&payload.password)?;

    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::Duplicate => {
                warn!("email registered concurrently");
                ApiError::DuplicateUser
            }
            CreateUserError::Store(cause) => ApiError::Store(cause),
        })?;

    let token = state.keys.issue_token(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.keys.issue_token(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!("token refers to a missing user");
        ApiError::NotFound("User")
    })?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn ann() -> Value {
        json!({ "name": "Ann", "email": "ann@x.com", "password": "pw123" })
    }

    #[tokio::test]
    async fn register_returns_token_and_public_user() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, post_json("/api/register", ann())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User created successfully");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["name"], "Ann");
        assert_eq!(body["user"]["email"], "ann@x.com");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_and_not_stored() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let (first, _) = send(&app, post_json("/api/register", ann())).await;
        assert_eq!(first, StatusCode::CREATED);

        let again = json!({ "name": "Other", "email": " ANN@x.com ", "password": "x" });
        let (status, body) = send(&app, post_json("/api/register", again)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User already exists");

        let stored = state.users.find_by_email("ann@x.com").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ann");
    }

    #[tokio::test]
    async fn register_validates_fields() {
        let app = build_app(AppState::fake());
        for bad in [
            json!({ "name": " ", "email": "ann@x.com", "password": "pw" }),
            json!({ "name": "Ann", "email": "not-an-email", "password": "pw" }),
            json!({ "name": "Ann", "email": "ann@x.com", "password": "" }),
            json!({ "name": "Ann", "email": "ann@x.com" }),
            json!({ "name": "Ann", "email": "ann@x.com", "password": "pw", "admin": true }),
        ] {
            let (status, body) = send(&app, post_json("/api/register", bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn login_errors_are_undifferentiated() {
        let app = build_app(AppState::fake());
        send(&app, post_json("/api/register", ann())).await;

        let (s1, b1) = send(
            &app,
            post_json("/api/login", json!({ "email": "ann@x.com", "password": "wrong" })),
        )
        .await;
        let (s2, b2) = send(
            &app,
            post_json("/api/login", json!({ "email": "bob@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(s1, StatusCode::BAD_REQUEST);
        assert_eq!(s2, StatusCode::BAD_REQUEST);
        assert_eq!(b1, b2);
        assert_eq!(b1["error"], "Invalid credentials");

        let (ok, body) = send(
            &app,
            post_json("/api/login", json!({ "email": "ann@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(ok, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn profile_requires_a_valid_token() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        let anon = Request::get("/api/profile").body(Body::empty()).unwrap();
        let (status, body) = send(&app, anon).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access token required");

        let (status, _) = send(&app, get_with_token("/api/profile", "garbage")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, reg) = send(&app, post_json("/api/register", ann())).await;
        let token = reg["token"].as_str().unwrap();
        let (status, body) = send(&app, get_with_token("/api/profile", token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ann");
        assert_eq!(body["email"], "ann@x.com");
        assert!(body["createdAt"].is_string());
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn profile_of_vanished_user_is_not_found() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = state
            .keys
            .issue_token(uuid::Uuid::new_v4(), "ghost@x.com")
            .unwrap();
        let (status, body) = send(&app, get_with_token("/api/profile", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }
}
