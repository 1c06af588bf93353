//! datagram.rs
//!
//! UDP half of the crate. One bound socket, one receive loop whose only job
//! is recv_from + spawn: each datagram is copied into a fresh buffer and
//! handed to its own dispatch task, so a slow or faulty handler never
//! delays the next receive. Datagrams have no session identity.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::errors::{HandlerError, StartError};
use crate::fault::spawn_isolated;
use crate::{trace_error, trace_info};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const RECV_BUFFER_SIZE: usize = 4096;

// -----------------------------------------------------------------------------
// ----- DatagramHandler -------------------------------------------------------

/// User callback for one datagram. `data` is exactly the received bytes;
/// replies go out via `socket.send_to(.., peer)` (the one bound socket,
/// shared across dispatches; concurrent sends are fine). The returned
/// error is observed only for logging.
pub trait DatagramHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        socket: &'a UdpSocket,
        peer: SocketAddr,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;
}

// -----------------------------------------------------------------------------
// ----- DatagramProxy ---------------------------------------------------------

/// A UDP listener that dispatches every received packet to a
/// [`DatagramHandler`] on its own task.
pub struct DatagramProxy {
    /// Advisory label used as the log prefix. Not required to be unique.
    pub name: String,
    /// "host:port" to bind. Empty is a startup error.
    pub addr: String,
    handler: Option<Arc<dyn DatagramHandler>>,
}

// -----------------------------------------------------------------------------
// ----- DatagramProxy: Builder ------------------------------------------------

impl DatagramProxy {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: impl DatagramHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

// -----------------------------------------------------------------------------
// ----- DatagramProxy: Public -------------------------------------------------

impl DatagramProxy {
    /// Validate, bind one connectionless socket, and receive forever.
    ///
    /// Returns only on startup failure. Receive errors are logged and the
    /// loop continues; handler outcomes never reach this loop.
    pub async fn start(self) -> Result<Infallible, StartError> {
        if self.addr.is_empty() {
            return Err(StartError::EmptyBindAddress);
        }
        let handler = self.handler.ok_or(StartError::HandlerMissing)?;

        let socket = UdpSocket::bind(&self.addr)
            .await
            .map_err(|source| StartError::Bind {
                addr: self.addr.clone(),
                source,
            })?;
        let socket = Arc::new(socket);

        let name: Arc<str> = self.name.into();
        trace_info!("[{name}] bound on {}", self.addr);

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let (n, peer) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    trace_error!("[{name}] receive failed: {e}");
                    continue;
                }
            };

            // Private copy of exactly the received bytes; the loop's buffer
            // is reused for the next datagram right away.
            let data = Bytes::copy_from_slice(&buf[..n]);

            let name = name.clone();
            let socket = socket.clone();
            let handler = handler.clone();
            spawn_isolated("datagram", async move {
                dispatch(&name, &socket, peer, &data, handler.as_ref()).await;
            });
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Dispatch --------------------------------------------------------------

/// Exactly one handler invocation per datagram. Failures stop here.
async fn dispatch(
    name: &str,
    socket: &UdpSocket,
    peer: SocketAddr,
    data: &[u8],
    handler: &dyn DatagramHandler,
) {
    if let Err(e) = handler.handle(socket, peer, data).await {
        trace_error!("[{name}] handler failed for {peer}: {e}");
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
