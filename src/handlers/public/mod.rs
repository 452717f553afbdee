// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus every read endpoint. Reads are not owner-gated:
// any caller may fetch a resource by owner and id.

pub mod auth;
pub mod resources;
pub mod users;

use crate::types::PageRequest;

/// Raw `?limit=&offset=`. Parsing never fails: repeated keys keep the first
/// value and anything unparsable falls back to defaults.
#[derive(Debug, Default)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::from_query(query.limit.as_deref(), query.offset.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_wins_on_repeats() {
        let query = PageQuery::from_raw(Some("limit=5&limit=50&offset=10&offset=x"));
        assert_eq!(query.limit.as_deref(), Some("5"));
        assert_eq!(query.offset.as_deref(), Some("10"));
    }

    #[test]
    fn junk_and_missing_queries_parse() {
        let empty = PageQuery::from_raw(None);
        assert!(empty.limit.is_none() && empty.offset.is_none());

        let junk = PageQuery::from_raw(Some("&&=&limit&offset=%ZZ&sort=desc"));
        assert_eq!(junk.limit.as_deref(), Some(""));
        let page: PageRequest = junk.into();
        assert_eq!(page, PageRequest::default());
    }
}
