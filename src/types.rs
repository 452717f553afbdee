//! Shared types used across the codebase.

use serde::Serialize;
use uuid::Uuid;

/// Addresses one owned resource. Every read and write below the service layer
/// is scoped by both halves, so a wrong owner behaves exactly like a wrong id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub id: Uuid,
    pub owner: String,
}

impl ResourceKey {
    pub fn new(id: Uuid, owner: impl Into<String>) -> Self {
        Self { id, owner: owner.into() }
    }
}

/// Normalized `limit` / `offset` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: i64,
    offset: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    /// Non-positive limits fall back to the default, oversized ones are capped,
    /// negative offsets become zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        };
        let offset = match offset {
            Some(o) if o >= 0 => o,
            _ => 0,
        };
        Self { limit, offset }
    }

    /// Lenient parse of raw query values; anything unparsable counts as absent.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(parse(limit), parse(offset))
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of an owner's resources, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub total_pages: i64,
    pub current: i64,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let limit = request.limit();
        let total_pages = if total <= 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            page_size: items.len(),
            items,
            total,
            total_pages,
            current: request.offset() / limit + 1,
        }
    }
}
