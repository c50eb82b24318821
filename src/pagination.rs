use serde::Deserialize;
use utoipa::ToSchema;

/// Offset pagination parsed from the query string.
///
/// TODO: `limit` has no upper bound, so a caller can request arbitrarily
/// large pages; adding a ceiling changes the public contract and needs to
/// be coordinated with API consumers.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}
