//! netrelay: callback-driven TCP/UDP listeners.
//!
//! Two self-contained server types: [`StreamProxy`] accepts connections and
//! runs one read→handle session loop per client; [`DatagramProxy`] binds one
//! socket and dispatches each packet on its own task. Payloads are opaque
//! bytes; what they mean is the handler's business. Diagnostics go through
//! the process-wide [`trace`] sink, which is off until enabled.

pub mod datagram;
pub mod errors;
pub mod stream;
pub mod trace;

mod fault;

pub use datagram::{DatagramHandler, DatagramProxy};
pub use errors::{HandlerError, SessionError, StartError};
pub use stream::{StreamHandler, StreamProxy};
pub use trace::{TraceLevel, TraceSink};
