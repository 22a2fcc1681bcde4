//! Property-based tests for rust_hierlog using proptest

use proptest::prelude::*;
use rust_hierlog::handlers::{msgpack, ForwardBuffer};
use rust_hierlog::prelude::*;
use rust_hierlog::{Formatter, FullFormatter, LevelOnlyFormatter};
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::Off),
        Just(Level::Err),
        Just(Level::Warn),
        Just(Level::Info),
        Just(Level::Debug),
        Just(Level::All),
    ]
}

/// Decode one msgpack integer written by `msgpack::write_int`.
fn decode_int(bytes: &[u8]) -> (i64, usize) {
    match bytes[0] {
        0xd0 => (bytes[1] as i8 as i64, 2),
        0xd1 => (i16::from_be_bytes([bytes[1], bytes[2]]) as i64, 3),
        0xd2 => (i32::from_be_bytes(bytes[1..5].try_into().unwrap()) as i64, 5),
        0xd3 => (i64::from_be_bytes(bytes[1..9].try_into().unwrap()), 9),
        other => panic!("unexpected marker {:#x}", other),
    }
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Labels parse back to the same level regardless of case
    #[test]
    fn test_level_label_roundtrip(level in any_level(), lowercase in any::<bool>()) {
        let label = if lowercase {
            level.to_str().to_lowercase()
        } else {
            level.to_str().to_string()
        };
        prop_assert_eq!(Level::value_of(&label).unwrap(), level);
    }

    /// Exactly one of higher / lower / equal holds
    #[test]
    fn test_level_trichotomy(a in any_level(), b in any_level()) {
        let relations = [a.higher(b), a.lower(b), a == b];
        prop_assert_eq!(relations.iter().filter(|r| **r).count(), 1);
        prop_assert_eq!(a.higher(b), b.lower(a));
    }

    /// A threshold admits exactly the records that are not lower than it
    #[test]
    fn test_threshold_admits(threshold in any_level(), record in any_level()) {
        prop_assert_eq!(threshold.admits(record), !record.lower(threshold));
        prop_assert!(Level::All.admits(record));
        prop_assert_eq!(Level::Off.admits(record), record == Level::Off);
    }

    /// Unknown labels are rejected
    #[test]
    fn test_unknown_label_rejected(label in "[a-z]{6,12}") {
        let known = Level::values().any(|lv| lv.to_str().eq_ignore_ascii_case(&label));
        prop_assume!(!known);
        let is_unknown_level = matches!(Level::value_of(&label), Err(LoggerError::UnknownLevel { .. }));
        prop_assert!(is_unknown_level);
    }
}

// ============================================================================
// Record and Formatter Tests
// ============================================================================

proptest! {
    /// Every formatted record is exactly one line
    #[test]
    fn test_formatted_record_is_one_line(
        level in any_level(),
        message in "\\PC*( |\n|\r|\t)*\\PC*",
        line in 1u32..100_000
    ) {
        let record = LogRecord::new(level, "src/main.rs", line, &message);
        for bytes in [FullFormatter::utc().format(&record), LevelOnlyFormatter.format(&record)] {
            let text = String::from_utf8(bytes).unwrap();
            prop_assert!(text.ends_with('\n'));
            prop_assert_eq!(text.matches('\n').count(), 1);
            prop_assert!(!text.contains('\r'));
        }
    }
}

// ============================================================================
// Msgpack Tests
// ============================================================================

proptest! {
    /// Integers use the smallest signed encoding that holds them
    #[test]
    fn test_int_smallest_encoding(value in any::<i64>()) {
        let mut buf = Vec::new();
        msgpack::write_int(&mut buf, value);

        let expected_len = if i8::try_from(value).is_ok() {
            2
        } else if i16::try_from(value).is_ok() {
            3
        } else if i32::try_from(value).is_ok() {
            5
        } else {
            9
        };
        prop_assert_eq!(buf.len(), expected_len);
        prop_assert_eq!(decode_int(&buf), (value, expected_len));
    }

    /// String headers carry the byte length and the bytes follow verbatim
    #[test]
    fn test_str_header_length(value in "\\PC{0,300}") {
        let mut buf = Vec::new();
        msgpack::write_str(&mut buf, &value).unwrap();

        let len = value.len();
        let header = match buf[0] {
            m if m & 0xe0 == 0xa0 => {
                prop_assert!(len < 32);
                prop_assert_eq!((m & 0x1f) as usize, len);
                1
            }
            0xd9 => {
                prop_assert!(len >= 32);
                prop_assert_eq!(buf[1] as usize, len);
                2
            }
            0xda => {
                prop_assert!(len > u8::MAX as usize);
                prop_assert_eq!(u16::from_be_bytes([buf[1], buf[2]]) as usize, len);
                3
            }
            other => panic!("unexpected marker {:#x}", other),
        };
        prop_assert_eq!(&buf[header..], value.as_bytes());
    }
}

// ============================================================================
// Forward Buffer Tests
// ============================================================================

proptest! {
    /// After trimming, the buffer fits its limit and holds the newest entries
    #[test]
    fn test_forward_buffer_keeps_newest_within_limit(
        limit in 16usize..512,
        sizes in prop::collection::vec(1usize..128, 1..60)
    ) {
        let diagnostics = Diagnostics::with_callback(Arc::new(|_: &str| {}));
        let mut buffer = ForwardBuffer::new(limit);

        for (i, size) in sizes.iter().enumerate() {
            buffer.push(vec![i as u8; *size], format!("entry {}", i));
            buffer.trim(&diagnostics);
            prop_assert!(buffer.len_bytes() <= limit);
        }

        let mut delivered = Vec::new();
        buffer.deliver(|payload| {
            delivered.push(payload[0] as usize);
            Ok(())
        }).unwrap();

        // Survivors are a contiguous run ending at the newest entry
        if let Some(&first) = delivered.first() {
            let expected: Vec<usize> = (first..sizes.len()).collect();
            prop_assert_eq!(&delivered, &expected);
        }
    }
}

// ============================================================================
// Registry Tests
// ============================================================================

proptest! {
    /// A record reaches the nearest registered ancestor's handlers
    #[test]
    fn test_nearest_ancestor_receives(
        segments in prop::collection::vec("[a-z]{1,6}", 1..6),
        ancestor_depth in 0usize..6
    ) {
        let registry = Registry::new();
        let memory = Arc::new(MemoryHandler::new());

        let depth = ancestor_depth.min(segments.len() - 1);
        let ancestor_name = segments[..depth].join("/");
        let ancestor = registry.logger(&ancestor_name);
        ancestor.set_level(Level::All);
        ancestor.add_handler("memory", memory.clone());

        let leaf = registry.logger(&segments.join("/"));
        leaf.debug("probe");

        prop_assert_eq!(memory.len(), 1);
    }
}
