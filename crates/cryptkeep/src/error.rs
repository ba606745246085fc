//! Unified error type for the Cryptkeep server.

use cryptkeep_lobby::LobbyError;
use cryptkeep_map::MapError;
use cryptkeep_protocol::ProtocolError;
use cryptkeep_transport::TransportError;

/// Top-level error that wraps every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum CryptkeepError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The registry actor is gone.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The level could not be loaded. Fatal at startup.
    #[error(transparent)]
    Map(#[from] MapError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::HandshakeFailed("not a websocket".into());
        let err: CryptkeepError = err.into();
        assert!(matches!(err, CryptkeepError::Transport(_)));
        assert!(err.to_string().contains("not a websocket"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: CryptkeepError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, CryptkeepError::Protocol(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err: CryptkeepError = LobbyError::Unavailable.into();
        assert!(matches!(err, CryptkeepError::Lobby(_)));
    }

    #[test]
    fn test_from_map_error_keeps_message() {
        let err: CryptkeepError = MapError::NoWallLayer("walls".into()).into();
        assert!(matches!(err, CryptkeepError::Map(_)));
        assert_eq!(err.to_string(), r#"map has no wall layer named "walls""#);
    }
}
