use serde::{Deserialize, Serialize};

/// Configured bounds for list page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBounds {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self { default_limit: 20, max_limit: 100 }
    }
}

/// Bounded result window: `1 <= limit <= max_limit`, `offset >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub limit: i64,
    pub offset: i64,
}

impl PageSpec {
    pub fn to_sql(&self) -> String {
        format!("LIMIT {} OFFSET {}", self.limit, self.offset)
    }
}

/// Clamp a requested window into the configured bounds. Never fails.
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>, bounds: &PageBounds) -> PageSpec {
    let max_limit = bounds.max_limit.max(1);
    let requested = limit.unwrap_or(bounds.default_limit);
    if requested > max_limit {
        tracing::debug!("Limit {} exceeds max {}, capping to max", requested, max_limit);
    }
    PageSpec {
        limit: requested.clamp(1, max_limit),
        offset: offset.unwrap_or(0).max(0),
    }
}
