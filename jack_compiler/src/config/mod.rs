//! Configuration for the Jack compiler
//!
//! Compile-time limits are generated by `build.rs` from `config/<profile>.toml`
//! and exposed as `config::compile_time::*`. Runtime preferences come from
//! `JACK_*` environment variables (see [`runtime`]).

include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

pub use runtime::RuntimeConfig;

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("JACK_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("JACK_CONFIG_DIR").unwrap_or("config")
    }

    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}
