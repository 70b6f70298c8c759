//! # Bifrost Runtime
//!
//! Process-level services around the array descriptor core:
//!
//! - build-time capability queries ([`debug_enabled`],
//!   [`accelerator_support_enabled`], [`capabilities`])
//! - run-time configuration ([`RuntimeConfig`], [`config`], [`set_config`])
//! - optional structured logging ([`init_logging`])
//! - the C ABI in [`ffi`]
//!
//! Capability queries read only `cfg!` constants. They are safe to call
//! from any thread before anything else is initialized and never log.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod ffi;

pub use config::RuntimeConfig;

use bf_array::MAX_DIM;
use bf_memory::{HostOnlyCopy, Transfer};
use bf_status::BfResult;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Returns true if this binary was built with debugging support.
#[must_use]
pub const fn debug_enabled() -> bool {
    cfg!(feature = "debug")
}

/// Returns true if this binary was built with accelerator support.
#[must_use]
pub const fn accelerator_support_enabled() -> bool {
    cfg!(feature = "cuda")
}

/// Static facts about this build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// See [`debug_enabled`].
    pub debug: bool,
    /// See [`accelerator_support_enabled`].
    pub accelerator: bool,
    /// Maximum descriptor rank.
    pub max_dim: usize,
    /// Crate version.
    pub version: &'static str,
}

/// All capability flags in one value.
#[must_use]
pub const fn capabilities() -> Capabilities {
    Capabilities {
        debug: debug_enabled(),
        accelerator: accelerator_support_enabled(),
        max_dim: MAX_DIM,
        version: env!("CARGO_PKG_VERSION"),
    }
}

static CONFIG: RwLock<Option<RuntimeConfig>> = RwLock::new(None);
static TRANSFER: OnceLock<Transfer> = OnceLock::new();

/// The current configuration.
///
/// Defaults apply until [`set_config`] is called; the environment is not
/// read implicitly.
#[must_use]
pub fn config() -> RuntimeConfig {
    CONFIG.read().clone().unwrap_or_default()
}

/// Install a configuration for the whole process.
///
/// # Errors
///
/// Returns the error from [`RuntimeConfig::validate`]; the previous
/// configuration stays in place.
pub fn set_config(config: RuntimeConfig) -> BfResult<()> {
    config.validate()?;
    debug!(default_space = %config.default_space, "installing runtime config");
    transfer().set_resolver(config.resolver());
    *CONFIG.write() = Some(config);
    Ok(())
}

/// The process-wide transfer engine used by the C ABI.
pub fn transfer() -> &'static Transfer {
    TRANSFER.get_or_init(|| Transfer::new(config().resolver(), HostOnlyCopy))
}

/// Install a stderr `tracing` subscriber.
///
/// The filter comes from `BF_LOG` if set, else from the current
/// configuration. Returns false if a global subscriber already exists,
/// so repeated calls are harmless.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env(config::LOG_VAR)
        .or_else(|_| EnvFilter::try_new(config().log_filter))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
