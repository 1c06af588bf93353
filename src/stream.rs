//! stream.rs
//!
//! TCP listener half of the crate. `StreamProxy::start` binds, then accepts
//! forever; every accepted connection gets its own session task with a
//! private 4 KB buffer. The session alternates one read and one handler
//! call under per-iteration wall-clock deadlines until the peer goes away,
//! a deadline expires, or the handler says stop.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout_at};

use crate::errors::{HandlerError, SessionError, StartError};
use crate::fault::spawn_isolated;
use crate::{trace_error, trace_info};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const RECV_BUFFER_SIZE: usize = 4096;

// -----------------------------------------------------------------------------
// ----- StreamHandler ---------------------------------------------------------

/// User callback for stream payloads. Runs on the session task; `data` is
/// the bytes of one read, and replies may be written straight to `conn`.
/// Returning an error ends that session (the connection is closed).
pub trait StreamHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        conn: &'a mut TcpStream,
        peer: SocketAddr,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;
}

// -----------------------------------------------------------------------------
// ----- StreamProxy -----------------------------------------------------------

/// A TCP listener that hands every read to a [`StreamHandler`].
///
/// Timeouts are whole minutes applied as fresh wall-clock deadlines on each
/// session iteration: the read deadline bounds the next read, the write
/// deadline bounds the handler invocation (the session's write phase). A
/// value of 0 makes the deadline "now", so the next operation fails with a
/// timeout immediately; use a large value for an effectively idle-tolerant
/// session.
pub struct StreamProxy {
    /// Advisory label used as the log prefix. Not required to be unique.
    pub name: String,
    /// "host:port" to listen on. Empty is a startup error.
    pub addr: String,
    pub read_timeout_mins: u64,
    pub write_timeout_mins: u64,
    handler: Option<Arc<dyn StreamHandler>>,
}

// -----------------------------------------------------------------------------
// ----- StreamProxy: Builder --------------------------------------------------

impl StreamProxy {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            read_timeout_mins: 0,
            write_timeout_mins: 0,
            handler: None,
        }
    }

    pub fn with_read_timeout_mins(mut self, mins: u64) -> Self {
        self.read_timeout_mins = mins;
        self
    }

    pub fn with_write_timeout_mins(mut self, mins: u64) -> Self {
        self.write_timeout_mins = mins;
        self
    }

    pub fn with_handler(mut self, handler: impl StreamHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

// -----------------------------------------------------------------------------
// ----- StreamProxy: Public ---------------------------------------------------

impl StreamProxy {
    /// Validate, bind, listen, and accept forever.
    ///
    /// Returns only on startup failure; on success this call is the running
    /// service and never completes (hence [`Infallible`]). Accept errors are
    /// logged and the loop continues; they are never fatal.
    pub async fn start(self) -> Result<Infallible, StartError> {
        if self.addr.is_empty() {
            return Err(StartError::EmptyBindAddress);
        }
        let handler = self.handler.ok_or(StartError::HandlerMissing)?;

        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| StartError::Bind {
                addr: self.addr.clone(),
                source,
            })?;

        let name: Arc<str> = self.name.into();
        let read_timeout = mins(self.read_timeout_mins);
        let write_timeout = mins(self.write_timeout_mins);

        trace_info!("[{name}] listening on {}", self.addr);

        loop {
            let (conn, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    trace_error!("[{name}] accept failed: {e}");
                    continue;
                }
            };

            let name = name.clone();
            let handler = handler.clone();
            spawn_isolated("stream", async move {
                trace_info!("[{name}] new connection: -> {peer}");

                match run_session(conn, peer, handler, read_timeout, write_timeout).await {
                    Ok(()) => trace_info!("[{name}] client close: <- {peer}"),
                    Err(e) => trace_error!("[{name}] session {peer} ended: {e}"),
                }
            });
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Session ---------------------------------------------------------------

/// One accepted connection, owned exclusively until return. The connection
/// closes when `conn` drops, on every exit path.
async fn run_session(
    mut conn: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn StreamHandler>,
    read_timeout: Duration,
    write_timeout: Duration,
) -> Result<(), SessionError> {
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    loop {
        let read_deadline = deadline_after(read_timeout);

        let n = timeout_at(read_deadline, conn.read(&mut buf))
            .await
            .map_err(|_| SessionError::ReadTimeout)??;
        if n == 0 {
            return Ok(()); // EOF
        }

        let write_deadline = deadline_after(write_timeout);

        timeout_at(write_deadline, handler.handle(&mut conn, peer, &buf[..n]))
            .await
            .map_err(|_| SessionError::WriteTimeout)?
            .map_err(SessionError::Handler)?;
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn mins(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

/// Deadline `timeout` from now, clamped so absurd timeouts cannot overflow
/// the instant arithmetic. Thirty years out counts as never.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(30 * 365 * 86400))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl StreamHandler for Noop {
        fn handle<'a>(
            &'a self,
            _conn: &'a mut TcpStream,
            _peer: SocketAddr,
            _data: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn empty_addr_is_a_config_error() {
        let res = StreamProxy::new("t", "").with_handler(Noop).start().await;
        assert!(matches!(res, Err(StartError::EmptyBindAddress)));
    }

    #[tokio::test]
    async fn missing_handler_is_rejected_before_binding() {
        let res = StreamProxy::new("t", "127.0.0.1:0").start().await;
        assert!(matches!(res, Err(StartError::HandlerMissing)));
    }

    #[tokio::test]
    async fn unresolvable_addr_is_a_bind_error() {
        let res = StreamProxy::new("t", "no-such-host.invalid:0")
            .with_handler(Noop)
            .start()
            .await;
        assert!(matches!(res, Err(StartError::Bind { .. })));
    }

    #[test]
    fn absurd_timeout_still_yields_a_future_deadline() {
        let d = deadline_after(Duration::from_secs(u64::MAX));
        assert!(d > Instant::now());

        let d = deadline_after(mins(u64::MAX));
        assert!(d > Instant::now());
    }

    #[test]
    fn builder_keeps_timeouts() {
        let p = StreamProxy::new("echo", "127.0.0.1:7")
            .with_read_timeout_mins(3)
            .with_write_timeout_mins(5);
        assert_eq!(p.read_timeout_mins, 3);
        assert_eq!(p.write_timeout_mins, 5);
        assert_eq!(mins(3), Duration::from_secs(180));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
