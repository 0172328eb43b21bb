//! Outbound trigger configuration.

use std::time::Duration;

use prospect_core::defaults::{
    TRIGGER_TIMEOUT_MAX_SECS, TRIGGER_TIMEOUT_MIN_SECS, TRIGGER_TIMEOUT_SECS,
};
use serde::Serialize;

/// How a trigger POST relates to the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDispatch {
    /// Wait for the automation tool's acknowledgement before answering.
    #[default]
    Inline,
    /// Answer immediately; a spawned task records the acknowledgement.
    Background,
}

impl TriggerDispatch {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(TriggerDispatch::Inline),
            "background" => Some(TriggerDispatch::Background),
            _ => None,
        }
    }
}

/// Configuration for the outbound trigger.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Automation endpoint. Searches cannot start without one.
    pub url: Option<String>,
    pub timeout: Duration,
    pub dispatch: TriggerDispatch,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(TRIGGER_TIMEOUT_SECS),
            dispatch: TriggerDispatch::Inline,
        }
    }
}

impl TriggerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `TRIGGER_URL` | unset | Automation endpoint receiving search triggers |
    /// | `TRIGGER_TIMEOUT_SECS` | `15` | Per-request timeout, clamped to 1..=120 |
    /// | `TRIGGER_DISPATCH` | `inline` | `inline` or `background` |
    pub fn from_env() -> Self {
        let url = std::env::var("TRIGGER_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let timeout_secs = std::env::var("TRIGGER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(TRIGGER_TIMEOUT_SECS);

        let dispatch = std::env::var("TRIGGER_DISPATCH")
            .ok()
            .and_then(|v| TriggerDispatch::parse(&v))
            .unwrap_or_default();

        Self {
            url,
            timeout: clamp_timeout(timeout_secs),
            dispatch,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = clamp_timeout(timeout.as_secs());
        self
    }

    pub fn with_dispatch(mut self, dispatch: TriggerDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// A trigger must never wait forever.
pub fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(TRIGGER_TIMEOUT_MIN_SECS, TRIGGER_TIMEOUT_MAX_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_parse() {
        assert_eq!(TriggerDispatch::parse("inline"), Some(TriggerDispatch::Inline));
        assert_eq!(
            TriggerDispatch::parse(" Background "),
            Some(TriggerDispatch::Background)
        );
        assert_eq!(TriggerDispatch::parse("async"), None);
    }

    #[test]
    fn test_timeout_is_clamped() {
        assert_eq!(clamp_timeout(0), Duration::from_secs(TRIGGER_TIMEOUT_MIN_SECS));
        assert_eq!(clamp_timeout(30), Duration::from_secs(30));
        assert_eq!(
            clamp_timeout(u64::MAX),
            Duration::from_secs(TRIGGER_TIMEOUT_MAX_SECS)
        );
    }

    #[test]
    fn test_builder() {
        let config = TriggerConfig::default()
            .with_url("http://automation.local/hook")
            .with_timeout(Duration::from_secs(500))
            .with_dispatch(TriggerDispatch::Background);
        assert_eq!(config.url.as_deref(), Some("http://automation.local/hook"));
        assert_eq!(config.timeout, Duration::from_secs(TRIGGER_TIMEOUT_MAX_SECS));
        assert_eq!(config.dispatch, TriggerDispatch::Background);
    }
}
