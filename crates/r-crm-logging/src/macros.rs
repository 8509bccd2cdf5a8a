//! ---
//! crm_section: "03-logging"
//! crm_subsection: "module"
//! crm_type: "source"
//! crm_scope: "code"
//! crm_description: "Structured logging context and access-event helpers."
//! crm_version: "v0.0.0-prealpha"
//! crm_owner: "tbd"
//! ---
/// Internal helper shared by the level-specific macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __crm_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            role = ctx.role.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            permission = ctx.permission.unwrap_or(""),
            guard = ctx.guard.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with access-control context.
#[macro_export]
macro_rules! crm_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with access-control context.
#[macro_export]
macro_rules! crm_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning log enriched with access-control context.
#[macro_export]
macro_rules! crm_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__crm_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
