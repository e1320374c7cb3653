use time::macros::format_description;

use crate::reviews::dto::MAX_RATING;
use crate::reviews::repo_types::Review;

pub const PLACEHOLDER_AVATAR: &str = "https://images.unsplash.com/photo-1534528741775-53994a69daeb?ixlib=rb-4.0.3&auto=format&fit=crop&w=100&q=80";
pub const NO_REVIEWS: &str = "No reviews yet. Be the first to share your experience!";

/// `rating` filled stars followed by the remaining empty ones.
pub fn stars(rating: i32) -> String {
    let filled = rating.clamp(0, MAX_RATING) as usize;
    let empty = MAX_RATING as usize - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

pub fn render_review(review: &Review) -> String {
    let date = review
        .created_at
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default();
    let avatar = review.image.as_deref().unwrap_or(PLACEHOLDER_AVATAR);
    format!(
        "{stars}  {name} ({date})\n  {description}\n  avatar: {avatar}",
        stars = stars(review.rating),
        name = review.name,
        description = review.description,
    )
}

pub fn render_reviews(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return NO_REVIEWS.to_string();
    }
    reviews
        .iter()
        .map(render_review)
        .collect::<Vec<_>>()
        .join("\n\n")
}
