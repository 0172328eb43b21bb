//! Centralized default constants for prospect.
//!
//! Configuration loading and the repositories reference these instead of
//! repeating literals.

// =============================================================================
// OUTBOUND TRIGGER
// =============================================================================

/// Timeout for one outbound trigger POST. The automation tool only
/// acknowledges receipt, so this stays short.
pub const TRIGGER_TIMEOUT_SECS: u64 = 15;

/// Lower bound for a configured trigger timeout.
pub const TRIGGER_TIMEOUT_MIN_SECS: u64 = 1;

/// Upper bound for a configured trigger timeout.
pub const TRIGGER_TIMEOUT_MAX_SECS: u64 = 120;

/// Maximum number of response body characters kept in an error message.
pub const TRIGGER_ERROR_BODY_CHARS: usize = 500;

/// Compare-and-swap attempts before a search write gives up.
pub const SEARCH_WRITE_ATTEMPTS: usize = 3;

/// Stored when the automation tool reports `error` without a message.
pub const UNSPECIFIED_REMOTE_ERROR: &str = "Automation tool reported an error without details";

// =============================================================================
// INBOUND WEBHOOKS
// =============================================================================

/// Header carrying the shared secret for the lead webhook.
pub const LEAD_WEBHOOK_SECRET_HEADER: &str = "x-lead-webhook-secret";

/// Header carrying the shared secret for the search update webhook.
pub const SEARCH_UPDATE_SECRET_HEADER: &str = "x-search-update-secret";

/// Maximum accepted request body size (2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Maximum page size for list endpoints.
pub const PAGE_LIMIT_MAX: i64 = 500;

// =============================================================================
// MESSAGES
// =============================================================================

pub const WHATSAPP_MESSAGE: &str =
    "Hello, we came across your company's activity and would like to talk.";

pub const EMAIL_SUBJECT: &str = "Regarding your company";

pub const EMAIL_BODY: &str = "Hello,\n\nWe are writing regarding your company's activity.\n\nBest regards,\nThe Team\n";

/// Brazil; local numbers without a country code get this prefix.
pub const WHATSAPP_COUNTRY_CODE: &str = "55";

/// Numbers with at most this many digits are treated as local.
pub const WHATSAPP_LOCAL_MAX_DIGITS: usize = 11;

/// Clamp a caller-supplied page size into the accepted range.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(PAGE_LIMIT).clamp(1, PAGE_LIMIT_MAX)
}
