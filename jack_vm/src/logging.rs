//! Stack-machine tooling events, routed into the compiler's global logger
//!
//! Events carry the current file context when one is set, so translation of
//! a directory groups its errors per `.vm` file in the cargo-style summary.

use jack_compiler::logging::{log_error_with_context, log_level_with_context, Code, LogLevel};
use std::fmt::Display;

/// Codes for the stack-machine tooling, registered with the compiler's metadata
pub mod codes {
    pub use jack_compiler::logging::codes::vm::*;
}

fn pairs<'a>(context: &'a [(&'a str, &'a str)]) -> Vec<(&'a str, &'a dyn Display)> {
    context
        .iter()
        .map(|(key, value)| (*key, value as &dyn Display))
        .collect()
}

pub fn log_vm_error(code: Code, message: &str, context: &[(&str, &str)]) {
    log_error_with_context(code, message, None, &pairs(context));
    #[cfg(feature = "logging")]
    log::error!("[{}] {} {:?}", code, message, context);
}

pub fn log_vm_debug(message: &str, context: &[(&str, &str)]) {
    if jack_compiler::logging::config::get_min_log_level() >= LogLevel::Debug {
        log_level_with_context(LogLevel::Debug, message, &pairs(context));
    }
    #[cfg(feature = "logging")]
    log::debug!("{} {:?}", message, context);
}

pub fn log_vm_info(message: &str, context: &[(&str, &str)]) {
    log_level_with_context(LogLevel::Info, message, &pairs(context));
    #[cfg(feature = "logging")]
    log::info!("{} {:?}", message, context);
}
