//! Per-instance configuration: step size and maximum tower level.
//!
//! Both values are fixed for the lifetime of a list. Out-of-range values
//! are never rejected; they are replaced by the defaults.

/// Default step size. A node is promoted one level with probability `1/4`.
pub const DEFAULT_STEP_SIZE: usize = 4;

/// Default maximum level. The head carries `DEFAULT_MAX_LEVEL + 1` links.
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// Hard cap on the maximum level.
pub const MAX_LEVEL_CAP: usize = 64;

/// Shape of a skip list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "ConfigRepr"))]
pub struct Config {
    step_size: usize,
    max_level: usize,
}

impl Config {
    /// Build a configuration, replacing a `step_size` below 2 with
    /// [`DEFAULT_STEP_SIZE`] and a `max_level` above [`MAX_LEVEL_CAP`]
    /// with [`DEFAULT_MAX_LEVEL`].
    pub fn new(step_size: usize, max_level: usize) -> Config {
        let mut config = Config { step_size, max_level };

        if step_size < 2 {
            tracing::debug!(
                step_size,
                fallback = DEFAULT_STEP_SIZE,
                "step size below 2, using default"
            );
            config.step_size = DEFAULT_STEP_SIZE;
        }

        if max_level > MAX_LEVEL_CAP {
            tracing::debug!(
                max_level,
                cap = MAX_LEVEL_CAP,
                fallback = DEFAULT_MAX_LEVEL,
                "max level above cap, using default"
            );
            config.max_level = DEFAULT_MAX_LEVEL;
        }

        config
    }

    /// Reciprocal of the per-level promotion probability.
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Highest level a tower may reach. Levels run `0..=max_level`.
    pub fn max_level(&self) -> usize {
        self.max_level
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            step_size: DEFAULT_STEP_SIZE,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

/// Wire form of [`Config`]; deserialized values go through [`Config::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default)]
struct ConfigRepr {
    step_size: usize,
    max_level: usize,
}

#[cfg(feature = "serde")]
impl Default for ConfigRepr {
    fn default() -> Self {
        ConfigRepr {
            step_size: DEFAULT_STEP_SIZE,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

#[cfg(feature = "serde")]
impl From<ConfigRepr> for Config {
    fn from(repr: ConfigRepr) -> Self {
        Config::new(repr.step_size, repr.max_level)
    }
}
