//! Token and IP-lock gates in front of the swarm operations.
//!
//! The token is a shared plain-text secret and the IP-lock trusts whatever
//! address the transport reports for the client.

use crate::config::AccessConfig;
use crate::error::{Result, SwarmError};

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    config: AccessConfig,
}

impl AccessPolicy {
    pub fn new(config: AccessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Reject the request unless it carries the configured token.
    pub fn check_token(&self, token: Option<&str>) -> Result<()> {
        match &self.config.auth_token {
            Some(expected) if token != Some(expected.as_str()) => Err(SwarmError::InvalidToken),
            _ => Ok(()),
        }
    }

    /// Reject the request if IP-lock is on and the client did not create the
    /// swarm.
    pub fn check_owner(&self, client_ip: &str, owner_ip: &str) -> Result<()> {
        if self.config.ip_lock && client_ip != owner_ip {
            return Err(SwarmError::IpMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_configured_allows_everything() {
        let policy = AccessPolicy::default();
        assert!(policy.check_token(None).is_ok());
        assert!(policy.check_token(Some("anything")).is_ok());
    }

    #[test]
    fn token_must_match_exactly() {
        let policy = AccessPolicy::new(AccessConfig::default().with_token("s3cret"));
        assert!(policy.check_token(Some("s3cret")).is_ok());
        assert!(matches!(
            policy.check_token(Some("S3CRET")),
            Err(SwarmError::InvalidToken)
        ));
        assert!(matches!(
            policy.check_token(None),
            Err(SwarmError::InvalidToken)
        ));
    }

    #[test]
    fn ip_lock_rejects_other_clients() {
        let policy = AccessPolicy::default();
        assert!(policy.check_owner("10.0.0.1", "10.0.0.1").is_ok());
        assert!(matches!(
            policy.check_owner("10.0.0.2", "10.0.0.1"),
            Err(SwarmError::IpMismatch)
        ));
    }

    #[test]
    fn ip_lock_can_be_disabled() {
        let policy = AccessPolicy::new(AccessConfig {
            ip_lock: false,
            ..AccessConfig::default()
        });
        assert!(policy.check_owner("10.0.0.2", "10.0.0.1").is_ok());
    }
}
