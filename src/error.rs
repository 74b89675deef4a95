// 2.0: error taxonomy. everything above the venue boundary sees only these kinds.
// fatal kinds abort one trade action. transient kinds are retried by retry.rs.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// Bad setup: missing market metadata, missing liquidation inputs,
    /// unsupported trading mode, impossible stoploss limits.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Parameters rejected by the venue.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Rate limited by the venue. Retried with backoff.
    #[error("DDoS protection: {0}")]
    DDosProtection(String),

    /// Network or venue hiccup. Surfaced once the retry budget is spent.
    #[error("Temporary error: {0}")]
    Temporary(String),

    /// Unclassified venue failure.
    #[error("Operational error: {0}")]
    Operational(String),

    /// Internal state that should be unreachable.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Shutdown requested before the call could be issued.
    #[error("Shutdown requested")]
    Shutdown,
}

impl ExchangeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::DDosProtection(_) | ExchangeError::Temporary(_))
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_transient() && *self != ExchangeError::Shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ExchangeError::DDosProtection("429".into()).is_transient());
        assert!(ExchangeError::Temporary("timeout".into()).is_transient());
        assert!(!ExchangeError::InvalidOrder("bad".into()).is_transient());
        assert!(ExchangeError::InsufficientFunds("low".into()).is_fatal());
        assert!(!ExchangeError::Shutdown.is_fatal());
        assert!(!ExchangeError::Shutdown.is_transient());
    }

    #[test]
    fn messages_carry_context() {
        let err = ExchangeError::Configuration("Market XYZ/USDT not loaded".into());
        assert_eq!(err.to_string(), "Configuration error: Market XYZ/USDT not loaded");
    }
}
