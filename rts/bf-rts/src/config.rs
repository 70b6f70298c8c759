//! Run-time configuration.
//!
//! | Variable           | Field           | Default  |
//! |--------------------|-----------------|----------|
//! | `BF_DEFAULT_SPACE` | `default_space` | `system` |
//! | `BF_LOG`           | `log_filter`    | `warn`   |

use crate::accelerator_support_enabled;
use bf_array::ResolvedSpace;
use bf_memory::HostResolver;
use bf_status::{BfError, BfResult};
use serde::{Deserialize, Serialize};

/// Environment variable naming the space `Auto` resolves to.
pub const DEFAULT_SPACE_VAR: &str = "BF_DEFAULT_SPACE";

/// Environment variable holding the log filter directive.
pub const LOG_VAR: &str = "BF_LOG";

/// Filter used when `BF_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Process-wide runtime settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Space that `Auto` descriptors resolve to.
    pub default_space: ResolvedSpace,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_space: ResolvedSpace::System,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RuntimeConfig::from_lookup`].
    pub fn from_env() -> BfResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the default space is unknown or `auto`
    /// - `Unsupported` if it names an accelerator space in a build
    ///   without accelerator support
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BfResult<Self> {
        let mut config = Self::default();
        if let Some(space) = lookup(DEFAULT_SPACE_VAR) {
            config.default_space = space.parse()?;
        }
        if let Some(filter) = lookup(LOG_VAR) {
            config.log_filter = filter;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration against the build.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` for an accelerator default space without
    /// accelerator support.
    pub fn validate(&self) -> BfResult<()> {
        if self.default_space.is_accelerator() && !accelerator_support_enabled() {
            return Err(BfError::Unsupported);
        }
        Ok(())
    }

    /// The resolver this configuration describes.
    #[must_use]
    pub fn resolver(&self) -> HostResolver {
        HostResolver::new(self.default_space)
    }
}
