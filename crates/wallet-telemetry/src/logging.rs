//! Structured logging helpers.
//!
//! Every event carries a `component` field so log lines from the session,
//! the runtime and the wallet adapter can be filtered apart.

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a session-related event with the connection, account and chain of a
/// session snapshot.
///
/// `$state` must expose `connection()`, `account()` and `chain_id()`.
#[macro_export]
macro_rules! log_session_event {
    ($level:ident, $component:expr, $msg:expr, $state:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            connection = ?$state.connection(),
            account = $state.account().map(|a| a.to_string()).as_deref(),
            chain_id = $state.chain_id().map(|c| c.to_string()).as_deref(),
            $($($field)*,)?
            $msg
        )
    };
}
