//! Property tests over arbitrary write sequences.

use diskbuf_core::{Config, Reason};
use diskbuf_storage::InMemoryStore;
use diskbuf_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_byte_lands_in_exactly_one_closed_segment(
        config in count_config_strategy(),
        payloads in write_sequence_strategy(),
    ) {
        let (flushes, store) = with_memory_buffer(config, |buffer, _| {
            for payload in &payloads {
                buffer.write(payload).unwrap();
            }
        });

        let written: Vec<u8> = payloads.concat();
        let mut stored = Vec::new();
        for flush in &flushes {
            stored.extend(store.contents(&flush.path).unwrap());
        }

        prop_assert_eq!(stored, written);
        prop_assert_eq!(flushes.iter().map(|f| f.writes).sum::<u64>(), payloads.len() as u64);
        prop_assert!(store
            .paths()
            .iter()
            .all(|p| p.to_string_lossy().ends_with(".closed")));
        prop_assert_eq!(store.paths().len(), flushes.len());
    }

    #[test]
    fn segments_rotate_exactly_at_thresholds(
        config in count_config_strategy(),
        payloads in write_sequence_strategy(),
    ) {
        let flushes = run(config.clone(), &payloads);

        let Some((last, rotated)) = flushes.split_last() else {
            prop_assert!(payloads.is_empty());
            return Ok(());
        };
        for flush in rotated {
            prop_assert_ne!(flush.reason, Reason::Forced);
        }
        for flush in &flushes {
            match flush.reason {
                Reason::Writes => prop_assert_eq!(flush.writes, config.flush_writes),
                Reason::Bytes => prop_assert!(flush.bytes >= config.flush_bytes),
                Reason::Forced => {}
                Reason::Interval => prop_assert!(false, "no interval configured"),
            }
            if config.flush_writes != 0 {
                prop_assert!(flush.writes <= config.flush_writes);
            }
            prop_assert!(flush.writes > 0);
        }
        if last.reason == Reason::Forced {
            prop_assert!(config.flush_writes == 0 || last.writes < config.flush_writes);
            prop_assert!(config.flush_bytes == 0 || last.bytes < config.flush_bytes);
        }
    }
}

fn run(config: Config, payloads: &[Vec<u8>]) -> Vec<diskbuf_core::Flush> {
    let store = InMemoryStore::new();
    let test = TestBuffer::memory(config, &store);
    for payload in payloads {
        test.write(payload).unwrap();
    }
    test.finish().0
}
