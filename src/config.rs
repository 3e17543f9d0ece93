use std::net::SocketAddr;
use std::path::PathBuf;

/// Request gates applied before any swarm is touched.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Shared token every mutating request must carry. `None` disables the
    /// check. This is plain-text shared-secret auth, not real security.
    pub auth_token: Option<String>,

    /// Only the client that created a swarm may claim or finish its shafts.
    pub ip_lock: bool,

    /// Take the client IP from `X-Forwarded-For` when the header is present.
    pub trust_forwarded_for: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            ip_lock: true,
            trust_forwarded_for: true,
        }
    }
}

impl AccessConfig {
    /// Set the token; an empty token disables authentication.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.is_empty() { None } else { Some(token) };
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// JSON snapshot of every swarm.
    pub data_file: PathBuf,
    pub access: AccessConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_file: PathBuf::from("data.json"),
            access: AccessConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr, data_file: impl Into<PathBuf>) -> Self {
        Self {
            listen_addr,
            data_file: data_file.into(),
            ..Default::default()
        }
    }

    pub fn with_access(mut self, access: AccessConfig) -> Self {
        self.access = access;
        self
    }
}
