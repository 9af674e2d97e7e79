use tracing::info;

use super::SessionContext;
use crate::api::MoveToFalsePositiveRequest;
use crate::error::DugongError;

/// The class the backend swaps an image into when it is flagged.
pub fn opposite_class(image_class: &str) -> &'static str {
    if image_class.trim().eq_ignore_ascii_case("resting") {
        "feeding"
    } else {
        "resting"
    }
}

/// Flag an image as a poor detection. Returns the class it was moved to.
pub async fn mark_poor_quality(
    ctx: &SessionContext,
    image_name: &str,
) -> Result<String, DugongError> {
    let session_id = ctx
        .current_session_id()
        .ok_or_else(|| DugongError::Session("No active session".to_string()))?;
    let image = ctx
        .images
        .find_by_name(image_name)
        .ok_or_else(|| DugongError::Validation(format!("Unknown image: {}", image_name)))?;

    let target = opposite_class(&image.image_class);
    let request = MoveToFalsePositiveRequest {
        session_id,
        image_name: image_name.to_string(),
        target_class: target.to_string(),
    };
    ctx.api.move_to_false_positive(&request).await?;

    ctx.images.set_image_class(image_name, target);
    ctx.publish_results();
    info!("Marked {} as poor quality, moved to {}", image_name, target);
    Ok(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::ImageResult;
    use crate::testing::{test_context, MockBackend};
    use chrono::Utc;
    use std::sync::Arc;

    fn image(name: &str, class: &str) -> ImageResult {
        ImageResult {
            image_id: "0".into(),
            image_url: String::new(),
            image_name: name.into(),
            dugong_count: 1,
            mother_calf_count: 0,
            image_class: class.into(),
            created_at: String::new(),
            captured_date: None,
        }
    }

    #[test]
    fn test_opposite_class() {
        assert_eq!(opposite_class("resting"), "feeding");
        assert_eq!(opposite_class(" Resting "), "feeding");
        assert_eq!(opposite_class("feeding"), "resting");
        assert_eq!(opposite_class("N/A"), "resting");
    }

    #[tokio::test]
    async fn test_mark_poor_moves_and_updates_store() {
        let api = Arc::new(MockBackend::new());
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(ManualClock::new(Utc::now())));
        ctx.uploads.set_session_id("s1");
        ctx.images.replace_all("s1", vec![image("a.jpg", "resting")]);

        let target = mark_poor_quality(&ctx, "a.jpg").await.unwrap();

        assert_eq!(target, "feeding");
        let moves = api.moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].session_id, "s1");
        assert_eq!(moves[0].target_class, "feeding");
        assert_eq!(ctx.images.find_by_name("a.jpg").unwrap().image_class, "feeding");
    }

    #[tokio::test]
    async fn test_mark_poor_unknown_image() {
        let api = Arc::new(MockBackend::new());
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(ManualClock::new(Utc::now())));
        ctx.uploads.set_session_id("s1");
        assert!(mark_poor_quality(&ctx, "ghost.jpg").await.is_err());
        assert!(api.moves().is_empty());
    }
}
