//! Logging macros: a message, optionally a `Code`, then `"key" => value`
//! pairs where each value is anything `Display`.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_context {
    ($($key:expr => $value:expr),*) => {
        &[$(($key, &$value as &dyn ::std::fmt::Display)),*]
    };
}

/// Error with a code; kept per file when a file context is active
#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr, span = $span:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logging::log_error_with_context(
            $code,
            $message,
            Some($span),
            $crate::__log_context!($($key => $value),*),
        )
    };

    ($code:expr, $message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logging::log_error_with_context(
            $code,
            $message,
            None,
            $crate::__log_context!($($key => $value),*),
        )
    };
}

#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logging::log_success_with_context(
            $code,
            $message,
            $crate::__log_context!($($key => $value),*),
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logging::log_level_with_context(
            $crate::logging::LogLevel::Info,
            $message,
            $crate::__log_context!($($key => $value),*),
        )
    };
}

#[macro_export]
macro_rules! log_warning {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logging::log_level_with_context(
            $crate::logging::LogLevel::Warning,
            $message,
            $crate::__log_context!($($key => $value),*),
        )
    };
}

/// Arguments are not evaluated unless debug output is enabled
#[macro_export]
macro_rules! log_debug {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::logging::config::get_min_log_level() >= $crate::logging::LogLevel::Debug {
            $crate::logging::log_level_with_context(
                $crate::logging::LogLevel::Debug,
                $message,
                $crate::__log_context!($($key => $value),*),
            )
        }
    };
}
