//! Property-based test generators using proptest.

use diskbuf_core::Config;
use proptest::prelude::*;

/// Strategy for a single write payload.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for a sequence of writes.
pub fn write_sequence_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 0..48)
}

/// Strategy for configurations with count and/or byte triggers and no
/// interval, so results do not depend on timing.
pub fn count_config_strategy() -> impl Strategy<Value = Config> {
    (0u64..8, 0u64..256, prop::bool::ANY)
        .prop_filter("at least one trigger", |(writes, bytes, _)| {
            *writes != 0 || *bytes != 0
        })
        .prop_map(|(writes, bytes, buffered)| {
            Config::new()
                .flush_writes(writes)
                .flush_bytes(bytes)
                .buffer_size(if buffered { 32 } else { 0 })
                .verbosity(0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_configs_validate(config in count_config_strategy()) {
            prop_assert!(config.validate().is_ok());
            prop_assert!(config.flush_interval.is_zero());
        }
    }
}
