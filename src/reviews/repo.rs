use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::reviews::repo_types::{NewReview, Review};

/// Persistence for reviews. Reviews are append-only.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create(&self, new: NewReview) -> anyhow::Result<Review>;
    /// All reviews, newest first.
    async fn list_recent(&self) -> anyhow::Result<Vec<Review>>;
}

#[derive(Clone)]
pub struct PgReviewStore {
    db: PgPool,
}

impl PgReviewStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn create(&self, new: NewReview) -> anyhow::Result<Review> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, name, email, description, rating, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, email, description, rating, image, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.description)
        .bind(new.rating)
        .bind(&new.image)
        .fetch_one(&self.db)
        .await
        .context("insert review")?;
        Ok(review)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, name, email, description, rating, image, created_at
            FROM reviews
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list reviews")?;
        Ok(rows)
    }
}
