use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::{CreateUserError, UserStore};
use crate::auth::repo_types::{NewUser, User};
use crate::reviews::repo::ReviewStore;
use crate::reviews::repo_types::{NewReview, Review};

/// Process-local store for development and tests. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    reviews: RwLock<Vec<Review>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        // check and insert under one write lock
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(CreateUserError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create(&self, new: NewReview) -> anyhow::Result<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            email: new.email,
            description: new.description,
            rating: new.rating,
            image: new.image,
            created_at: OffsetDateTime::now_utc(),
        };
        self.reviews.write().await.push(review.clone());
        Ok(review)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<Review>> {
        let reviews = self.reviews.read().await;
        // newest insertion first; the stable sort keeps that order on equal timestamps
        let mut out: Vec<Review> = reviews.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
