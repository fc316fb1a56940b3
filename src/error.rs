use thiserror::Error;

/// The four error categories the room coordinator distinguishes.
///
/// Worker death (resource exhaustion, see the facade) is deliberately not a
/// variant here: it is handled as a log-then-exit, not a recoverable `Result`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed frame, unknown message type, or an operation attempted in
    /// the wrong session state (e.g. produce before the second JOIN).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The SFU facade rejected an operation: transport not found, cannot
    /// consume with the given capabilities, produce on a disconnected
    /// transport, and so on.
    #[error("sfu facade error: {0}")]
    Facade(String),

    /// A session send or close failed because the peer is gone.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CoreError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        CoreError::Protocol(msg.into())
    }

    pub fn facade(msg: impl Into<String>) -> Self {
        CoreError::Facade(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        CoreError::Transport(msg.into())
    }
}
