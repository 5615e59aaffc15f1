use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    /// Remaining depth given to the seed, a depth of 0 fetches nothing
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_throttle")]
    pub throttle: Option<Throttle>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            throttle: default_throttle(),
        }
    }
}

impl CrawlerConfig {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }
}

fn default_max_depth() -> usize {
    4
}

fn default_throttle() -> Option<Throttle> {
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Throttle {
    /// The maximum number of concurrent fetches
    Concurrent(NonZeroUsize),
    /// The number of fetches per second
    PerSecond(NonZeroUsize),
    /// The delay in seconds between fetches
    Delay(f32),
}

impl Default for Throttle {
    fn default() -> Self {
        Self::Concurrent(NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN))
    }
}
