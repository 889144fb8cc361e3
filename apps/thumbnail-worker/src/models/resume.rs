use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the resume list, as served by the backend and held in the cache.
///
/// `thumbnail_generated_at` and `thumbnail_url` are the two derived fields the
/// regeneration core rewrites on completion. Everything else is owned upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub thumbnail_generated_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

impl ResumeSummary {
    /// A thumbnail is stale when it was never generated, or was generated
    /// before the last content update.
    pub fn is_stale(&self) -> bool {
        match self.thumbnail_generated_at {
            None => true,
            Some(generated_at) => generated_at < self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_resume(generated_offset_secs: Option<i64>) -> ResumeSummary {
        let updated_at = Utc::now();
        ResumeSummary {
            id: "resume-1".to_string(),
            title: "Backend Engineer".to_string(),
            updated_at,
            thumbnail_generated_at: generated_offset_secs
                .map(|s| updated_at + Duration::seconds(s)),
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_missing_thumbnail_is_stale() {
        assert!(make_resume(None).is_stale());
    }

    #[test]
    fn test_thumbnail_older_than_update_is_stale() {
        assert!(make_resume(Some(-10)).is_stale());
    }

    #[test]
    fn test_thumbnail_at_or_after_update_is_fresh() {
        assert!(!make_resume(Some(0)).is_stale());
        assert!(!make_resume(Some(5)).is_stale());
    }

    #[test]
    fn test_deserializes_backend_row() {
        let row: ResumeSummary = serde_json::from_str(
            r#"{"id":"r1","updatedAt":"2024-05-01T10:00:00Z","thumbnailGeneratedAt":null,"thumbnailUrl":null}"#,
        )
        .unwrap();
        assert_eq!(row.id, "r1");
        assert_eq!(row.title, "");
        assert!(row.is_stale());
    }
}
