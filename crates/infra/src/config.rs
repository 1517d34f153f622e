//! Fan-out tunables.

use tracing::warn;

/// Default incoming-follow count at which an author is treated as a
/// celebrity (posts indexed instead of fanned out).
pub const DEFAULT_CELEBRITY_THRESHOLD: usize = 1000;

/// Default bound on a materialized timeline.
pub const DEFAULT_MAX_TIMELINE: usize = 800;

/// Design-time constants with environment overrides.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tunables {
    pub celebrity_threshold: usize,
    pub max_timeline: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            celebrity_threshold: DEFAULT_CELEBRITY_THRESHOLD,
            max_timeline: DEFAULT_MAX_TIMELINE,
        }
    }
}

impl Tunables {
    /// Read `CELEBRITY_THRESHOLD` and `MAX_TIMELINE` from the environment,
    /// falling back to the defaults (with a warning) on malformed values.
    pub fn from_env() -> Self {
        Self {
            celebrity_threshold: env_usize("CELEBRITY_THRESHOLD", DEFAULT_CELEBRITY_THRESHOLD),
            max_timeline: env_usize("MAX_TIMELINE", DEFAULT_MAX_TIMELINE),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "malformed tunable; using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_design_constants() {
        let t = Tunables::default();
        assert_eq!(t.celebrity_threshold, 1000);
        assert_eq!(t.max_timeline, 800);
    }
}
