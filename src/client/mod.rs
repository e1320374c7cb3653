//! Client side of the review service: session handling, API calls and
//! review rendering, driven by the `reviewdesk-client` binary.

pub mod api;
pub mod render;
pub mod session;

use tracing::info;

use crate::auth::dto::{LoginRequest, PublicUser, RegisterRequest};
use crate::auth::repo_types::User;
use crate::reviews::dto::SubmitReviewRequest;
use crate::reviews::repo_types::Review;

pub use api::{ApiClient, ClientError};
pub use session::{Navigation, Page, Session, SessionState, SessionStorage};

/// What a page shows after load: where to go, and any content to display.
#[derive(Debug, PartialEq, Eq)]
pub struct PageView {
    pub navigation: Navigation,
    pub body: Option<String>,
}

pub struct ClientController<S> {
    api: ApiClient,
    session: Session<S>,
}

impl<S: SessionStorage> ClientController<S> {
    pub fn new(api: ApiClient, storage: S) -> Self {
        Self {
            api,
            session: Session::new(storage),
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn current_user(&self) -> Option<PublicUser> {
        match self.session.state() {
            SessionState::Authenticated { user, .. } => Some(user),
            SessionState::Anonymous => None,
        }
    }

    /// Applies the load-time redirect rules; the review page also fetches reviews.
    pub async fn open(&self, page: &Page) -> Result<PageView, ClientError> {
        let navigation = self.session.on_load(page);
        let body = match (&navigation, page) {
            (Navigation::Stay, Page::Review) => Some(self.load_reviews().await?),
            _ => None,
        };
        Ok(PageView { navigation, body })
    }

    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Navigation, ClientError> {
        let auth = self
            .api
            .register(&RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(user_id = %auth.user.id, "registered");
        Ok(self.session.sign_in(&auth)?)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Navigation, ClientError> {
        let auth = self
            .api
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(user_id = %auth.user.id, "logged in");
        Ok(self.session.sign_in(&auth)?)
    }

    pub fn logout(&mut self) -> Result<Navigation, ClientError> {
        Ok(self.session.logout()?)
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        let token = self
            .session
            .token()
            .ok_or(ClientError::NotSignedIn("view your profile"))?;
        self.api.profile(&token).await
    }

    /// Submits a review and returns the refreshed list.
    pub async fn submit_review(
        &self,
        description: &str,
        rating: i32,
        image: Option<&str>,
    ) -> Result<(Review, String), ClientError> {
        let token = self
            .session
            .token()
            .ok_or(ClientError::NotSignedIn("submit a review"))?;
        let created = self
            .api
            .submit_review(
                &token,
                &SubmitReviewRequest {
                    description: description.to_string(),
                    rating,
                    image: image.map(str::to_string),
                },
            )
            .await?;
        let list = self.load_reviews().await?;
        Ok((created.review, list))
    }

    pub async fn load_reviews(&self) -> Result<String, ClientError> {
        let reviews = self.api.list_reviews().await?;
        Ok(render::render_reviews(&reviews))
    }
}
