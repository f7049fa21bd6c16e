use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

/// An error produced by the command/telemetry link.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    /// The connection attempt did not complete within the allowed time.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Address of the controller.
        addr: SocketAddr,
        /// Configured connect timeout.
        timeout: Duration,
    },
    /// The operation requires a connected link.
    #[error("not connected")]
    NotConnected,
    /// The connection closed while an operation was in progress.
    #[error("connection closed")]
    ConnectionClosed,
    /// The controller replied NO_ACK.
    #[error("command {counter} rejected: {reason}")]
    CommandRejected {
        /// Counter of the rejected command.
        counter: u32,
        /// Failure text from the NO_ACK reply.
        reason: String,
    },
    /// No matching acknowledgement arrived within the timeout window.
    ///
    /// The connection is left as-is; the caller may retry or close.
    #[error("no acknowledgement for command {counter} within {timeout:?}")]
    CommandTimeout {
        /// Counter of the unacknowledged command.
        counter: u32,
        /// Configured acknowledgement timeout.
        timeout: Duration,
    },
    /// Transport-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
