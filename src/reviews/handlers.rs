use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiJson},
    reviews::{
        dto::{SubmitReviewRequest, SubmitReviewResponse, MAX_RATING, MIN_RATING},
        repo_types::{NewReview, Review},
    },
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new().route("/reviews", get(list_reviews).post(submit_review))
}

fn validate(payload: SubmitReviewRequest) -> Result<(String, i32, Option<String>), ApiError> {
    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::Validation("Description is required".into()));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&payload.rating) {
        return Err(ApiError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    let image = payload
        .image
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok((description, payload.rating, image))
}

#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn submit_review(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(payload): ApiJson<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<SubmitReviewResponse>), ApiError> {
    let (description, rating, image) = validate(payload).map_err(|e| {
        warn!(error = %e, "rejected review");
        e
    })?;

    let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!("token refers to a missing user");
        ApiError::NotFound("User")
    })?;

    let review = state
        .reviews
        .create(NewReview {
            user_id: user.id,
            name: user.name,
            email: user.email,
            description,
            rating,
            image,
        })
        .await?;

    info!(review_id = %review.id, rating = review.rating, "review submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmitReviewResponse {
            message: "Review submitted successfully".into(),
            review,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = state.reviews.list_recent().await?;
    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn list() -> Request<Body> {
        Request::get("/api/reviews").body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, name: &str, email: &str) -> String {
        let (status, body) = send(
            app,
            post_json(
                "/api/register",
                None,
                json!({ "name": name, "email": email, "password": "pw123" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn end_to_end_register_login_review_list() {
        let app = build_app(AppState::fake());
        register(&app, "Ann", "ann@x.com").await;

        let (status, body) = send(
            &app,
            post_json("/api/login", None, json!({ "email": "ann@x.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = send(
            &app,
            post_json("/api/login", None, json!({ "email": "ann@x.com", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post_json(
                "/api/reviews",
                Some(token.as_str()),
                json!({ "description": "Great service", "rating": 5 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Review submitted successfully");
        assert_eq!(body["review"]["name"], "Ann");
        assert_eq!(body["review"]["email"], "ann@x.com");
        assert_eq!(body["review"]["rating"], 5);
        assert!(body["review"]["userId"].is_string());
        assert!(body["review"]["image"].is_null());

        let (status, body) = send(&app, list()).await;
        assert_eq!(status, StatusCode::OK);
        let reviews = body.as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["name"], "Ann");
        assert_eq!(reviews[0]["description"], "Great service");
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_not_persisted() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = register(&app, "Ann", "ann@x.com").await;

        for rating in [json!(0), json!(6), json!(-1), json!(4.5), json!("5")] {
            let (status, body) = send(
                &app,
                post_json(
                    "/api/reviews",
                    Some(token.as_str()),
                    json!({ "description": "meh", "rating": rating }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "rating {rating}");
            assert!(body["error"].is_string());
        }
        assert!(state.reviews.list_recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let app = build_app(AppState::fake());
        let token = register(&app, "Ann", "ann@x.com").await;
        let (status, body) = send(
            &app,
            post_json("/api/reviews", Some(token.as_str()), json!({ "description": "  ", "rating": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Description is required");
    }

    #[tokio::test]
    async fn submitting_requires_a_token() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            post_json("/api/reviews", None, json!({ "description": "hi", "rating": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            post_json("/api/reviews", Some("nope"), json!({ "description": "hi", "rating": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reviewer_that_vanished_gets_not_found() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let token = state
            .keys
            .issue_token(uuid::Uuid::new_v4(), "ghost@x.com")
            .unwrap();
        let (status, body) = send(
            &app,
            post_json("/api/reviews", Some(token.as_str()), json!({ "description": "hi", "rating": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn reviews_are_listed_newest_first() {
        let app = build_app(AppState::fake());
        let ann = register(&app, "Ann", "ann@x.com").await;
        let bob = register(&app, "Bob", "bob@x.com").await;

        for (token, text, rating) in [(&ann, "first", 4), (&bob, "second", 2), (&ann, "third", 5)] {
            let (status, _) = send(
                &app,
                post_json(
                    "/api/reviews",
                    Some(token.as_str()),
                    json!({ "description": text, "rating": rating, "image": "" }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(&app, list()).await;
        let reviews: Vec<Review> = serde_json::from_value(body).unwrap();
        assert_eq!(reviews.len(), 3);
        assert!(reviews
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(reviews[0].description, "third");
        assert_eq!(reviews[1].name, "Bob");
        assert!(reviews.iter().all(|r| r.image.is_none()));
    }

    #[test]
    fn validate_keeps_non_blank_image() {
        let (_, _, image) = validate(SubmitReviewRequest {
            description: "ok".into(),
            rating: 1,
            image: Some(" https://img.example/a.png ".into()),
        })
        .unwrap();
        assert_eq!(image.as_deref(), Some("https://img.example/a.png"));
    }
}
