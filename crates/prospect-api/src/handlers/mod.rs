//! HTTP handlers for prospect-api.

pub mod health;
pub mod leads;
pub mod searches;
pub mod settings;
pub mod webhooks;

use serde::Deserialize;

use prospect_core::defaults::clamp_limit;

/// `?limit=&offset=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Clamped limit and non-negative offset.
    pub fn bounds(&self) -> (i64, i64) {
        (clamp_limit(self.limit), self.offset.unwrap_or(0).max(0))
    }
}
