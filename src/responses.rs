use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fixed textual rendering for every timestamp leaving the API.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Rows that were never updated render as an empty string, not a
/// placeholder date.
pub fn format_updated(t: Option<DateTime<Utc>>) -> String {
    t.map(format_timestamp).unwrap_or_default()
}

/// Response envelope shared by every endpoint: a `result` plus optional
/// `totalRow`/`pagination` (list endpoints) and `error`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub result: T,
    #[serde(rename = "totalRow", skip_serializing_if = "Option::is_none")]
    pub total_row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result,
            total_row: None,
            pagination: None,
            error: None,
        }
    }

    pub fn page(result: T, total_row: i64, offset: i64) -> Self {
        Self {
            result,
            total_row: Some(total_row),
            pagination: Some(offset),
            error: None,
        }
    }

    /// 200-with-error shape used when a list matches nothing.
    pub fn empty_page(result: T, entity: &str) -> Self {
        Self {
            result,
            total_row: Some(0),
            pagination: None,
            error: Some(format!("{entity} Not Found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_use_the_fixed_format() {
        let t = Utc.with_ymd_and_hms(2026, 8, 7, 9, 5, 1).unwrap();
        assert_eq!(format_timestamp(t), "2026-08-07 09:05:01");
    }

    #[test]
    fn never_updated_renders_as_empty_string() {
        assert_eq!(format_updated(None), "");
    }

    #[test]
    fn updated_renders_like_created() {
        let t = Utc.with_ymd_and_hms(2026, 8, 7, 23, 59, 0).unwrap();
        assert_eq!(format_updated(Some(t)), "2026-08-07 23:59:00");
    }

    #[test]
    fn ok_envelope_omits_optional_fields() {
        let body = serde_json::to_value(ApiResponse::ok("done")).unwrap();
        assert_eq!(body, serde_json::json!({ "result": "done" }));
    }

    #[test]
    fn page_envelope_carries_total_row_and_pagination() {
        let body = serde_json::to_value(ApiResponse::page(vec![1, 2], 5, 20)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "result": [1, 2], "totalRow": 5, "pagination": 20 })
        );
    }

    #[test]
    fn empty_page_answers_with_error_field() {
        let body =
            serde_json::to_value(ApiResponse::empty_page(Vec::<i64>::new(), "Order")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "result": [], "totalRow": 0, "error": "Order Not Found" })
        );
    }
}
