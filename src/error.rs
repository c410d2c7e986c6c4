use std::io;

use thiserror::Error;

use crate::protocol::{dispatch::DispatchError, packet::DecodeError};

/// Errors surfaced by the server and its handle.
#[derive(Error, Debug)]
pub enum RaknetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The server loop has stopped and no longer accepts commands.
    #[error("The server is no longer running.")]
    ServerClosed,
}
