//! Arena configuration parameters.

use crate::error::ArenaError;
use crate::header::{HEADER_SIZE, MAX_BLOCK_SIZE};

/// What the arena does when handed a handle it did not mint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidHandlePolicy {
    /// Silently ignore the call (logged at `debug`).
    #[default]
    Ignore,
    /// Fire a `debug_assert!`. Behaves like [`InvalidHandlePolicy::Ignore`]
    /// in release builds.
    Assert,
}

/// Configuration for a [`BlockArena`](crate::BlockArena).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Total size of the backing buffer in bytes, headers included.
    ///
    /// Default: 2048. Must leave room for one header plus a payload of at
    /// least one byte, and the payload must fit the 31-bit size field.
    pub capacity: usize,

    /// Handling of foreign handles passed to `release`/`destroy`.
    ///
    /// Default: [`InvalidHandlePolicy::Ignore`].
    pub invalid_handles: InvalidHandlePolicy,
}

impl ArenaConfig {
    /// Default buffer size in bytes.
    pub const DEFAULT_CAPACITY: usize = 2048;

    /// Smallest accepted capacity: one header and a one-byte payload.
    pub const MIN_CAPACITY: usize = HEADER_SIZE + 1;

    /// Largest accepted capacity: one header and a maximal payload.
    pub const MAX_CAPACITY: usize = HEADER_SIZE + MAX_BLOCK_SIZE;

    /// Create a config for the given capacity with default policies.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            invalid_handles: InvalidHandlePolicy::default(),
        }
    }

    /// Set the invalid-handle policy.
    pub fn with_invalid_handles(mut self, policy: InvalidHandlePolicy) -> Self {
        self.invalid_handles = policy;
        self
    }

    /// Check the capacity bounds.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if !(Self::MIN_CAPACITY..=Self::MAX_CAPACITY).contains(&self.capacity) {
            return Err(ArenaError::InvalidCapacity {
                capacity: self.capacity,
                min: Self::MIN_CAPACITY,
                max: Self::MAX_CAPACITY,
            });
        }
        Ok(())
    }

    /// Largest payload a single block can ever have in this arena.
    pub fn max_payload(&self) -> usize {
        self.capacity.saturating_sub(HEADER_SIZE)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_2048() {
        let config = ArenaConfig::default();
        assert_eq!(config.capacity, 2048);
        assert_eq!(config.invalid_handles, InvalidHandlePolicy::Ignore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_payload_excludes_header() {
        assert_eq!(ArenaConfig::new(2048).max_payload(), 2044);
    }

    #[test]
    fn capacity_too_small_for_header_is_rejected() {
        for capacity in 0..=HEADER_SIZE {
            assert!(matches!(
                ArenaConfig::new(capacity).validate(),
                Err(ArenaError::InvalidCapacity { .. })
            ));
        }
        assert!(ArenaConfig::new(HEADER_SIZE + 1).validate().is_ok());
    }

    #[test]
    fn payload_of_2_pow_31_is_rejected() {
        let config = ArenaConfig::new(HEADER_SIZE + (1 << 31));
        assert_eq!(
            config.validate(),
            Err(ArenaError::InvalidCapacity {
                capacity: HEADER_SIZE + (1 << 31),
                min: ArenaConfig::MIN_CAPACITY,
                max: ArenaConfig::MAX_CAPACITY,
            })
        );
        assert!(ArenaConfig::new(ArenaConfig::MAX_CAPACITY).validate().is_ok());
    }

    #[test]
    fn builder_sets_policy() {
        let config = ArenaConfig::new(128).with_invalid_handles(InvalidHandlePolicy::Assert);
        assert_eq!(config.invalid_handles, InvalidHandlePolicy::Assert);
    }
}
