use thiserror::Error;

/// Domain failures that are fatal to one connection, never to the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("player {0} is not registered")]
    UnknownPlayer(u16),

    #[error("player {0} is already connected")]
    AlreadyConnected(u16),
}
