use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    repo_types::User,
};
use crate::reviews::{
    dto::{SubmitReviewRequest, SubmitReviewResponse},
    repo_types::Review,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body; `message` is shown verbatim.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// An action that needs a session was attempted without one.
    #[error("Please login to {0}")]
    NotSignedIn(&'static str),

    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Thin HTTP client for the review API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send<T: DeserializeOwned>(
        req: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let res: Response = req.send().await?;
        let status = res.status();
        debug!(%status, url = %res.url(), "api response");
        if status.is_success() {
            return Ok(res.json::<T>().await?);
        }
        let message = res
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| fallback.to_string());
        Err(ClientError::Api { status, message })
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        Self::send(
            self.http.post(self.url("/api/register")).json(body),
            "Registration failed",
        )
        .await
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<AuthResponse, ClientError> {
        Self::send(self.http.post(self.url("/api/login")).json(body), "Login failed").await
    }

    pub async fn profile(&self, token: &str) -> Result<User, ClientError> {
        Self::send(
            self.http.get(self.url("/api/profile")).bearer_auth(token),
            "Failed to load profile",
        )
        .await
    }

    pub async fn submit_review(
        &self,
        token: &str,
        body: &SubmitReviewRequest,
    ) -> Result<SubmitReviewResponse, ClientError> {
        Self::send(
            self.http
                .post(self.url("/api/reviews"))
                .bearer_auth(token)
                .json(body),
            "Failed to submit review",
        )
        .await
    }

    pub async fn list_reviews(&self) -> Result<Vec<Review>, ClientError> {
        Self::send(self.http.get(self.url("/api/reviews")), "Failed to load reviews").await
    }
}
