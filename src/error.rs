use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("Invalid auth token")]
    InvalidToken,

    #[error("Client IP does not match the swarm owner")]
    IpMismatch,

    #[error("Swarm not found: {0}")]
    SwarmNotFound(String),

    #[error("Swarm already exists: {0}")]
    SwarmExists(String),

    #[error("Missing parameters: {0}")]
    MissingParameters(&'static str),

    #[error("No remaining shafts")]
    NoRemainingShafts,

    #[error("Shaft ({x}, {z}) is not claimed")]
    ShaftNotFound { x: u32, z: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl SwarmError {
    /// The short error string clients see in the `error` field of a response.
    pub fn wire_message(&self) -> &'static str {
        match self {
            SwarmError::InvalidToken => "invalid token",
            SwarmError::IpMismatch => "ip mismatch",
            SwarmError::SwarmNotFound(_) => "swarm does not exist",
            SwarmError::SwarmExists(_) => "swarm exists",
            SwarmError::MissingParameters(_) => "missing parameters",
            SwarmError::NoRemainingShafts => "no remaining shafts",
            SwarmError::ShaftNotFound { .. } => "shaft not found",
            SwarmError::Io(_) | SwarmError::Snapshot(_) | SwarmError::CorruptSnapshot(_) => {
                "internal error"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_messages_match_protocol() {
        assert_eq!(SwarmError::InvalidToken.wire_message(), "invalid token");
        assert_eq!(SwarmError::IpMismatch.wire_message(), "ip mismatch");
        assert_eq!(
            SwarmError::SwarmNotFound("q1".into()).wire_message(),
            "swarm does not exist"
        );
        assert_eq!(
            SwarmError::SwarmExists("q1".into()).wire_message(),
            "swarm exists"
        );
        assert_eq!(
            SwarmError::MissingParameters("w").wire_message(),
            "missing parameters"
        );
        assert_eq!(
            SwarmError::NoRemainingShafts.wire_message(),
            "no remaining shafts"
        );
        assert_eq!(
            SwarmError::ShaftNotFound { x: 1, z: 2 }.wire_message(),
            "shaft not found"
        );
    }

    #[test]
    fn display_includes_context() {
        let err = SwarmError::ShaftNotFound { x: 3, z: 4 };
        assert_eq!(err.to_string(), "Shaft (3, 4) is not claimed");
        let err = SwarmError::SwarmNotFound("quarry".into());
        assert_eq!(err.to_string(), "Swarm not found: quarry");
    }
}
