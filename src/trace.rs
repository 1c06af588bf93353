//! trace.rs
//!
//! Process-wide trace sink. Callers may install their own sink function and
//! flip the global toggle; the library itself only emits at the
//! Informational and Error levels. When no sink is installed, messages fall
//! through to `tracing` at the closest severity.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

// -----------------------------------------------------------------------------
// ----- Globals ---------------------------------------------------------------

static ENABLED: AtomicBool = AtomicBool::new(false);
static SINK: RwLock<Option<TraceSink>> = RwLock::new(None);

// -----------------------------------------------------------------------------
// ----- TraceSink -------------------------------------------------------------

/// A user-supplied destination for leveled trace messages. Must tolerate
/// concurrent invocation from arbitrarily many tasks.
pub type TraceSink = Box<dyn Fn(fmt::Arguments<'_>, TraceLevel) + Send + Sync>;

// -----------------------------------------------------------------------------
// ----- TraceLevel ------------------------------------------------------------

/// Syslog-style severities. Lower rank is more severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum TraceLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl TraceLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TraceLevel::Emergency => "EMERG",
            TraceLevel::Alert => "ALERT",
            TraceLevel::Critical => "CRIT",
            TraceLevel::Error => "ERROR",
            TraceLevel::Warning => "WARNING",
            TraceLevel::Notice => "NOTICE",
            TraceLevel::Informational => "INFO",
            TraceLevel::Debug => "DEBUG",
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Public ----------------------------------------------------------------

/// Turn tracing on or off for the whole process. Off by default.
pub fn set_enabled(enable: bool) {
    ENABLED.store(enable, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Install a user sink. Replaces any previous sink.
pub fn set_sink(sink: TraceSink) {
    *SINK.write() = Some(sink);
}

/// Remove the user sink; emission falls back to the default text logger.
pub fn clear_sink() {
    *SINK.write() = None;
}

/// Emit one message. No-op while tracing is disabled.
pub fn emit(level: TraceLevel, args: fmt::Arguments<'_>) {
    if !is_enabled() {
        return;
    }

    let sink = SINK.read();
    match sink.as_ref() {
        Some(f) => f(args, level),
        None => emit_default(level, args),
    }
}

// -----------------------------------------------------------------------------
// ----- Private ---------------------------------------------------------------

fn emit_default(level: TraceLevel, args: fmt::Arguments<'_>) {
    match level {
        TraceLevel::Emergency | TraceLevel::Alert | TraceLevel::Critical | TraceLevel::Error => {
            tracing::error!("{args}")
        }
        TraceLevel::Warning => tracing::warn!("{args}"),
        TraceLevel::Notice | TraceLevel::Informational => tracing::info!("{args}"),
        TraceLevel::Debug => tracing::debug!("{args}"),
    }
}

// -----------------------------------------------------------------------------
// ----- Macros ----------------------------------------------------------------

/// Emit at Informational severity.
#[macro_export]
macro_rules! trace_info {
    ($($arg:tt)*) => {
        $crate::trace::emit($crate::trace::TraceLevel::Informational, format_args!($($arg)*))
    };
}

/// Emit at Error severity.
#[macro_export]
macro_rules! trace_error {
    ($($arg:tt)*) => {
        $crate::trace::emit($crate::trace::TraceLevel::Error, format_args!($($arg)*))
    };
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
