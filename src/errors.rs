use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- HandlerError ----------------------------------------------------------

/// What a handler callback may return to signal failure. For a stream
/// session this ends the session; for a datagram dispatch it is only logged.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

// -----------------------------------------------------------------------------
// ----- StartError ------------------------------------------------------------

/// Fatal startup failures. `start()` returns one of these before entering
/// its loop, or never returns at all.
#[derive(Debug, Error)]
pub enum StartError {
    /// Configuration error: the bind address is empty. No socket was bound.
    #[error("bind address is empty")]
    EmptyBindAddress,

    /// No handler callback was configured. No socket was bound.
    #[error("no handler configured; set one before calling start")]
    HandlerMissing,

    /// Address resolution, bind, or listen failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

// -----------------------------------------------------------------------------
// ----- SessionError ----------------------------------------------------------

/// Why one stream session ended. Sessions log these and close; they never
/// cross the task boundary back to the accept loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("read deadline expired")]
    ReadTimeout,

    #[error("write deadline expired during handler")]
    WriteTimeout,

    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_messages() {
        assert_eq!(
            StartError::EmptyBindAddress.to_string(),
            "bind address is empty"
        );

        let e = StartError::Bind {
            addr: "127.0.0.1:99999".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(e.to_string().contains("127.0.0.1:99999"));
    }

    #[test]
    fn session_error_wraps_io() {
        let e: SessionError = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(e, SessionError::Io(_)));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
