//! Tests for the WAL
//!
//! These tests verify:
//! - Line format of SET/RM entries, including escaping
//! - Writer appends and reader reads back in order
//! - Replay applies SET as insert and RM as evict
//! - Malformed lines are skipped, a missing WAL is empty
//! - Checkpoint atomically replaces the file

use std::fs;
use std::path::PathBuf;

use ledgerkv::cache::Cache;
use ledgerkv::record::Command;
use ledgerkv::wal::{replay, ReplayStats, WalEntry, WalReader, WalWriter};
use ledgerkv::LedgerError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn set(key: &str, value: &str) -> WalEntry {
    WalEntry::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn rm(key: &str) -> WalEntry {
    WalEntry::Rm {
        key: key.to_string(),
    }
}

// =============================================================================
// Entry format
// =============================================================================

#[test]
fn test_line_format() {
    assert_eq!(set("user", "alice").to_line(), "SET user alice");
    assert_eq!(rm("user").to_line(), "RM user");
}

#[test]
fn test_parse_line() {
    assert_eq!(WalEntry::parse_line("SET a 1").unwrap(), set("a", "1"));
    assert_eq!(WalEntry::parse_line("RM a\n").unwrap(), rm("a"));
    assert_eq!(WalEntry::parse_line("SET a 1\r\n").unwrap(), set("a", "1"));
}

#[test]
fn test_spaces_and_newlines_are_escaped() {
    let entry = set("my key", "hello world\nsecond line\\end");
    let line = entry.to_line();

    assert_eq!(line.matches(' ').count(), 2);
    assert!(!line.contains('\n'));
    assert_eq!(WalEntry::parse_line(&line).unwrap(), entry);
}

#[test]
fn test_empty_value_round_trips() {
    let entry = set("k", "");
    assert_eq!(entry.to_line(), "SET k ");
    assert_eq!(WalEntry::parse_line(&entry.to_line()).unwrap(), entry);
}

#[test]
fn test_malformed_lines_rejected() {
    for line in ["", "SET", "SET onlykey", "RM", "RM a b", "PUT a b", "SET a b c"] {
        assert!(
            matches!(WalEntry::parse_line(line), Err(LedgerError::Wal(_))),
            "line {:?} should be rejected",
            line
        );
    }
}

#[test]
fn test_entry_from_command() {
    assert_eq!(WalEntry::from(&Command::set("a", "1")), set("a", "1"));
    assert_eq!(WalEntry::from(&Command::remove("a")), rm("a"));
}

// =============================================================================
// Writer / Reader
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let _writer = WalWriter::open(&wal_path).unwrap();
    assert!(wal_path.exists());
}

#[test]
fn test_write_then_read() {
    let (_temp, wal_path) = setup_temp_wal();

    let entries = vec![set("a", "1"), set("b", "2"), rm("a")];
    {
        let mut writer = WalWriter::open(&wal_path).unwrap();
        for entry in &entries {
            writer.append(entry).unwrap();
        }
        assert_eq!(writer.appended(), 3);
    }

    assert_eq!(fs::read_to_string(&wal_path).unwrap(), "SET a 1\nSET b 2\nRM a\n");

    let read: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(read, entries);
}

#[test]
fn test_reopen_appends() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path).unwrap();
        writer.append(&set("a", "1")).unwrap();
    }
    {
        let mut writer = WalWriter::open(&wal_path).unwrap();
        writer.append(&set("b", "2")).unwrap();
    }

    let count = WalReader::open(&wal_path).unwrap().entries().count();
    assert_eq!(count, 2);
}

#[test]
fn test_reader_reports_line_numbers() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, "SET a 1\ngarbage\n").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    let err = reader.next_entry().unwrap_err();
    assert!(err.to_string().contains("line 2"));
    assert_eq!(reader.line_no(), 2);
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_checkpoint_replaces_contents() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path).unwrap();
    for i in 0..10 {
        writer.append(&set("k", &i.to_string())).unwrap();
    }

    writer.checkpoint(&[set("k", "9"), set("other", "x")]).unwrap();
    assert_eq!(writer.appended(), 0);
    writer.append(&rm("other")).unwrap();

    assert_eq!(
        fs::read_to_string(&wal_path).unwrap(),
        "SET k 9\nSET other x\nRM other\n"
    );
    assert!(!wal_path.with_file_name("wal.log.tmp").exists());
}

#[test]
fn test_checkpoint_to_empty() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path).unwrap();
    writer.append(&set("a", "1")).unwrap();

    writer.checkpoint(&[]).unwrap();
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn test_replay_applies_set_and_rm() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, "SET a 1\nSET b 2\nRM a\nSET b 3\n").unwrap();

    let cache = Cache::new();
    let stats = replay(&wal_path, &cache).unwrap();

    assert_eq!(
        stats,
        ReplayStats {
            entries_applied: 4,
            entries_skipped: 0
        }
    );
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), Some("3".to_string()));
}

#[test]
fn test_replay_missing_file_is_empty() {
    let (_temp, wal_path) = setup_temp_wal();
    let cache = Cache::new();

    let stats = replay(&wal_path, &cache).unwrap();
    assert_eq!(stats, ReplayStats::default());
    assert!(cache.is_empty());
}

#[test]
fn test_replay_skips_malformed_lines() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = b"SET a 1\nNOPE x\n".to_vec();
    bytes.extend_from_slice(&[0xFF, 0xFE, b'\n']);
    bytes.extend_from_slice(b"SET b 2\nSET torn");
    fs::write(&wal_path, bytes).unwrap();

    let cache = Cache::new();
    let stats = replay(&wal_path, &cache).unwrap();

    assert_eq!(stats.entries_applied, 2);
    assert_eq!(stats.entries_skipped, 3);
    assert_eq!(cache.get("a"), Some("1".to_string()));
    assert_eq!(cache.get("b"), Some("2".to_string()));
}

#[test]
fn test_replay_after_writer_round_trip_with_escapes() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path).unwrap();
        writer.append(&set("greeting", "hello there\nfriend")).unwrap();
    }

    let cache = Cache::new();
    replay(&wal_path, &cache).unwrap();
    assert_eq!(cache.get("greeting"), Some("hello there\nfriend".to_string()));
}

// =============================================================================
// Torn Tail
// =============================================================================

#[test]
fn test_replay_skips_torn_last_line() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, "SET k longvalue\nSET k lon").unwrap();

    let cache = Cache::new();
    let stats = replay(&wal_path, &cache).unwrap();

    assert_eq!(stats.entries_applied, 1);
    assert_eq!(stats.entries_skipped, 1);
    assert_eq!(cache.get("k"), Some("longvalue".to_string()));
}

#[test]
fn test_reader_reports_torn_line() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, "RM a").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    let err = reader.next_entry().unwrap_err();
    assert!(matches!(err, LedgerError::Wal(_)));
    assert!(err.to_string().contains("torn"));
}

#[test]
fn test_writer_drops_torn_last_line() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, "SET a 1\nSET b tor").unwrap();

    let mut writer = WalWriter::open(&wal_path).unwrap();
    writer.append(&set("c", "3")).unwrap();

    assert_eq!(fs::read_to_string(&wal_path).unwrap(), "SET a 1\nSET c 3\n");
}

#[test]
fn test_writer_drops_torn_only_line() {
    let (_temp, wal_path) = setup_temp_wal();
    // Longer than one read chunk, with no newline anywhere
    fs::write(&wal_path, format!("SET big {}", "x".repeat(10_000))).unwrap();

    let _writer = WalWriter::open(&wal_path).unwrap();
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}
