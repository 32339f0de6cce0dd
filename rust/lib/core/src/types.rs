use serde::{Deserialize, Deserializer, Serialize};

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size used when the client omits `pageSize` or sends an out-of-range one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Page-number pagination as sent by the wall clients (`?page=1&pageSize=20`).
///
/// Raw values are kept signed so that garbage like `page=-3` deserializes
/// and is clamped instead of rejected. Values that are not integers at all
/// (`page=abc`, `page=`) read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub page: Option<i64>,

    #[serde(default, rename = "pageSize", deserialize_with = "lenient_i64")]
    pub page_size: Option<i64>,
}

/// Accepts a number or a numeric string; anything else becomes `None`.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
        Other(#[allow(dead_code)] serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Int(n) => Some(n),
        Raw::Str(s) => s.trim().parse().ok(),
        Raw::Other(_) => None,
    })
}

impl PageParams {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Page number, 1-based. Anything below 1 becomes 1.
    pub fn page(&self) -> usize {
        match self.page {
            Some(p) if p >= 1 => p as usize,
            _ => 1,
        }
    }

    /// Page size in `1..=MAX_PAGE_SIZE`, otherwise [`DEFAULT_PAGE_SIZE`].
    pub fn page_size(&self) -> usize {
        match self.page_size {
            Some(s) if s >= 1 && s as usize <= MAX_PAGE_SIZE => s as usize,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    /// Rows to skip. Saturates at `i64::MAX` so huge page numbers yield
    /// an empty page instead of overflowing.
    pub fn offset(&self) -> i64 {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        (page - 1).saturating_mul(self.page_size() as i64)
    }
}

/// Result wrapper for paged list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
///
/// Fixed microsecond precision in UTC, so stored timestamps sort
/// correctly as plain strings.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
