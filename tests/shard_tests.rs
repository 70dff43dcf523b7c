//! Tests for ShardLog
//!
//! These tests verify:
//! - Append layout and cursor movement
//! - Replay on reopen (memory and file backed)
//! - Torn tail handling
//! - Window queries, including out-of-order writes
//! - Closed-shard behavior and partial query failures

mod common;

use common::FlakyStore;
use mergelog::shard::{FileStore, FrameHeader, MemoryStore, ShardLog, HEADER_SIZE};
use mergelog::{MergeError, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_memory(store: &MemoryStore) -> ShardLog<MemoryStore> {
    ShardLog::open(store.clone(), SyncStrategy::Never).unwrap()
}

fn payloads(log: &ShardLog<MemoryStore>, offset: u64, len: u64) -> Vec<(u64, Vec<u8>)> {
    log.query(offset, len)
        .unwrap()
        .into_iter()
        .map(|f| (f.offset(), f.payload.to_vec()))
        .collect()
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_open_empty_store() {
    let store = MemoryStore::new();
    let log = open_memory(&store);

    assert_eq!(log.frame_count(), 0);
    assert_eq!(log.extent(), 0);
    assert_eq!(log.next_position(), 0);
}

#[test]
fn test_write_appends_header_and_payload() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);

    let n = log.write(b"hello", 100).unwrap();

    assert_eq!(n, 5);
    assert_eq!(log.next_position(), HEADER_SIZE + 5);

    let mut expected = FrameHeader::new(100, 5).encode().to_vec();
    expected.extend_from_slice(b"hello");
    assert_eq!(store.contents(), expected);
}

#[test]
fn test_write_never_rewrites() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);

    log.write(b"aaaa", 0).unwrap();
    log.write(b"bb", 0).unwrap();

    assert_eq!(log.frame_count(), 2);
    assert_eq!(store.contents().len() as u64, 2 * HEADER_SIZE + 6);
}

#[test]
fn test_descriptor_positions() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);

    log.write(b"abc", 0).unwrap();
    log.write(b"defg", 3).unwrap();

    let frames = log.frames();
    assert_eq!(frames[0].position, 16);
    assert_eq!(frames[1].position, 16 + 3 + 16);
    assert_eq!(log.extent(), 7);
}

#[test]
fn test_empty_write_is_recorded() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);

    assert_eq!(log.write(b"", 5).unwrap(), 0);
    assert_eq!(log.frame_count(), 1);
    assert_eq!(log.next_position(), HEADER_SIZE);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_reopen_replays_frames() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"first", 0).unwrap();
        log.write(b"second", 5).unwrap();
        log.close().unwrap();
    }

    let log = open_memory(&store);

    assert_eq!(log.frame_count(), 2);
    assert_eq!(log.extent(), 11);
    assert_eq!(log.next_position(), 2 * HEADER_SIZE + 11);
    assert_eq!(
        payloads(&log, 0, 11),
        vec![(0, b"first".to_vec()), (5, b"second".to_vec())]
    );
}

#[test]
fn test_replay_stops_at_torn_header() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"whole", 0).unwrap();
    }
    store.append_raw(&[1, 2, 3, 4, 5, 6, 7]);

    let (log, stats) = ShardLog::open_with_stats(store.clone(), SyncStrategy::Never).unwrap();

    assert_eq!(log.frame_count(), 1);
    assert_eq!(stats.frames_recovered, 1);
    assert_eq!(stats.torn_bytes, 7);
    assert_eq!(stats.next_position, HEADER_SIZE + 5);
}

#[test]
fn test_replay_stops_at_torn_payload() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"kept", 0).unwrap();
        log.write(b"lost-payload", 4).unwrap();
    }
    // Cut the second payload short
    store.truncate((2 * HEADER_SIZE + 4 + 3) as usize);

    let (log, stats) = ShardLog::open_with_stats(store.clone(), SyncStrategy::Never).unwrap();

    assert_eq!(log.frame_count(), 1);
    assert_eq!(log.extent(), 4);
    assert_eq!(stats.torn_bytes, HEADER_SIZE + 3);
}

#[test]
fn test_append_after_torn_tail_overwrites_it() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"one", 0).unwrap();
    }
    store.append_raw(&[0xFF; 10]);

    {
        let mut log = open_memory(&store);
        log.write(b"two", 3).unwrap();
    }

    let log = open_memory(&store);
    assert_eq!(log.frame_count(), 2);
    assert_eq!(
        payloads(&log, 0, 6),
        vec![(0, b"one".to_vec()), (3, b"two".to_vec())]
    );
}

/// A torn record whose payload bytes themselves look like a complete record
fn torn_record_hiding_frame() -> Vec<u8> {
    let mut tail = FrameHeader::new(500, 1000).encode().to_vec();
    let mut payload = FrameHeader::new(0, 4).encode().to_vec();
    payload.extend_from_slice(b"EVIL");
    payload.resize(40, 0);
    tail.extend_from_slice(&payload);
    tail
}

#[test]
fn test_open_truncates_torn_tail() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"good", 0).unwrap();
    }
    store.append_raw(&torn_record_hiding_frame());

    let (log, stats) = ShardLog::open_with_stats(store.clone(), SyncStrategy::Never).unwrap();

    assert_eq!(log.frame_count(), 1);
    assert_eq!(stats.torn_bytes, HEADER_SIZE + 40);
    assert_eq!(store.contents().len() as u64, stats.next_position);
    assert_eq!(stats.next_position, HEADER_SIZE + 4);
}

#[test]
fn test_short_append_over_long_torn_tail_leaves_no_phantom() {
    let store = MemoryStore::new();
    {
        let mut log = open_memory(&store);
        log.write(b"good", 0).unwrap();
    }
    store.append_raw(&torn_record_hiding_frame());

    {
        let mut log = open_memory(&store);
        log.write(b"abcd", 100).unwrap();
    }

    let log = open_memory(&store);
    assert_eq!(log.frame_count(), 2);
    assert_eq!(store.contents().len() as u64, 2 * (HEADER_SIZE + 4));
    assert_eq!(payloads(&log, 0, 4), vec![(0, b"good".to_vec())]);
    assert_eq!(payloads(&log, 100, 4), vec![(100, b"abcd".to_vec())]);
}

#[test]
fn test_file_store_torn_tail_is_truncated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shard-0");

    {
        let store = FileStore::open(&path).unwrap();
        let mut log = ShardLog::open(store, SyncStrategy::Never).unwrap();
        log.write(b"good", 0).unwrap();
        log.close().unwrap();
    }
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, &torn_record_hiding_frame()).unwrap();
    }

    {
        let store = FileStore::open(&path).unwrap();
        let mut log = ShardLog::open(store, SyncStrategy::Never).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_SIZE + 4);
        log.write(b"abcd", 100).unwrap();
        log.close().unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let log = ShardLog::open(store, SyncStrategy::Never).unwrap();
    assert_eq!(log.frame_count(), 2);
    let frames = log.query(0, 4).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0].payload[..], b"good");
}

#[test]
fn test_replay_file_store() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shard-0");

    {
        let store = FileStore::open(&path).unwrap();
        let mut log = ShardLog::open(store, SyncStrategy::EveryWrite).unwrap();
        log.write(b"on disk", 10).unwrap();
        log.close().unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let log = ShardLog::open(store, SyncStrategy::Never).unwrap();

    assert_eq!(log.frame_count(), 1);
    let frames = log.query(10, 7).unwrap();
    assert_eq!(&frames[0].payload[..], b"on disk");
}

#[test]
fn test_missing_file_opens_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("not-there");

    let store = FileStore::open(&path).unwrap();
    let log = ShardLog::open(store, SyncStrategy::Never).unwrap();

    assert!(path.exists());
    assert_eq!(log.frame_count(), 0);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_query_empty_shard_is_end_of_data() {
    let store = MemoryStore::new();
    let log = open_memory(&store);

    assert!(matches!(log.query(0, 10), Err(MergeError::EndOfData)));
}

#[test]
fn test_query_past_extent_is_end_of_data() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(b"0123456789", 0).unwrap();

    assert!(matches!(log.query(10, 5), Err(MergeError::EndOfData)));
    assert!(matches!(log.query(1000, 5), Err(MergeError::EndOfData)));
}

#[test]
fn test_query_window_boundaries() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(&[0u8; 10], 0).unwrap();
    log.write(&[1u8; 10], 10).unwrap();
    log.write(&[2u8; 10], 20).unwrap();

    let offsets = |o, l| -> Vec<u64> {
        log.query(o, l).unwrap().iter().map(|f| f.offset()).collect()
    };

    assert_eq!(offsets(0, 10), vec![0]);
    assert_eq!(offsets(5, 10), vec![0, 10]);
    assert_eq!(offsets(10, 10), vec![10]);
    assert_eq!(offsets(9, 12), vec![0, 10, 20]);
    assert_eq!(offsets(25, 100), vec![20]);
    assert_eq!(offsets(15, 0), Vec::<u64>::new());
}

#[test]
fn test_query_finds_long_frame_starting_far_back() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(&[9u8; 1000], 0).unwrap();
    log.write(&[1u8; 5], 10).unwrap();
    log.write(&[2u8; 5], 20).unwrap();

    let frames = log.query(500, 10).unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].offset(), 0);
    assert_eq!(frames[0].length(), 1000);
}

#[test]
fn test_query_out_of_order_writes() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(b"later", 100).unwrap();
    log.write(b"early", 0).unwrap();
    log.write(b"middle", 50).unwrap();

    let offsets: Vec<u64> = log.frames().iter().map(|d| d.offset).collect();
    assert_eq!(offsets, vec![0, 50, 100]);

    assert_eq!(
        payloads(&log, 0, 200),
        vec![
            (0, b"early".to_vec()),
            (50, b"middle".to_vec()),
            (100, b"later".to_vec()),
        ]
    );
}

#[test]
fn test_query_same_offset_ordered_by_length_then_position() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(b"longer", 0).unwrap();
    log.write(b"ab", 0).unwrap();
    log.write(b"cd", 0).unwrap();

    assert_eq!(
        payloads(&log, 0, 6),
        vec![
            (0, b"ab".to_vec()),
            (0, b"cd".to_vec()),
            (0, b"longer".to_vec()),
        ]
    );
}

#[test]
fn test_query_skips_empty_frames() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(b"data", 0).unwrap();
    log.write(b"", 2).unwrap();

    assert_eq!(payloads(&log, 0, 4), vec![(0, b"data".to_vec())]);
}

#[test]
fn test_query_failure_returns_partial_frames() {
    let memory = MemoryStore::new();
    let flaky = FlakyStore::new(memory);
    let mut log = ShardLog::open(flaky.clone(), SyncStrategy::Never).unwrap();
    log.write(b"good", 0).unwrap();
    log.write(b"bad!", 4).unwrap();

    // Second payload lives past this position
    flaky.fail_reads_from(HEADER_SIZE + 4 + HEADER_SIZE);

    match log.query(0, 8) {
        Err(MergeError::PartialQuery { frames, .. }) => {
            assert_eq!(frames.len(), 1);
            assert_eq!(&frames[0].payload[..], b"good");
        }
        other => panic!("expected PartialQuery, got {:?}", other),
    }
}

#[test]
fn test_open_fails_on_read_error() {
    let memory = MemoryStore::new();
    let flaky = FlakyStore::new(memory);
    {
        let mut log = ShardLog::open(flaky.clone(), SyncStrategy::Never).unwrap();
        log.write(b"x", 0).unwrap();
    }
    flaky.fail_reads_from(0);

    let result = ShardLog::open(flaky, SyncStrategy::Never);

    assert!(matches!(result, Err(MergeError::Io(_))));
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_operations_after_close_fail() {
    let store = MemoryStore::new();
    let mut log = open_memory(&store);
    log.write(b"data", 0).unwrap();

    log.close().unwrap();

    assert!(log.is_closed());
    assert!(matches!(log.write(b"more", 4), Err(MergeError::Closed)));
    assert!(matches!(log.query(0, 4), Err(MergeError::Closed)));
    assert!(matches!(log.close(), Err(MergeError::Closed)));
}
