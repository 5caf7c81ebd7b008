//! Ledger files and ranking
//!
//! Each (player, level) pair owns one file, `<player>.<level>.json`, whose
//! name parts are escaped so no key can reach outside the ledger root or
//! share a file with another key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ScoreEntry, ScoreError, ScoreKey};
use crate::storage::LocalStorage;

/// Current on-disk ledger schema
pub const LEDGER_VERSION: u32 = 1;

/// Ledger file extension, without the dot
pub const LEDGER_EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    player: String,
    level: String,
    entries: Vec<ScoreEntry>,
}

/// Longest escaped key part kept verbatim in a file name.
///
/// Two parts, two dots and the extension stay under the usual 255-byte
/// file name limit.
pub const MAX_COMPONENT_LEN: usize = 112;

/// Hex digits of the SHA-256 suffix on shortened parts
const DIGEST_HEX_LEN: usize = 32;

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hash = hasher.finalize();
    hash.iter().take(DIGEST_HEX_LEN / 2).map(|b| format!("{:02x}", b)).collect()
}

/// Escape a key part for use in a file name.
///
/// ASCII alphanumerics and `-` pass through; every other byte (including `_`
/// and `.`) becomes `_XX`. Escaped parts longer than [`MAX_COMPONENT_LEN`]
/// are cut and tagged `~<sha256 of the full part>`; escaping never emits `~`,
/// so shortened and verbatim parts cannot collide. The result never contains
/// a path separator.
pub fn sanitize_component(part: &str) -> String {
    if part.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(part.len());
    for b in part.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02X}", b));
        }
    }
    if out.len() > MAX_COMPONENT_LEN {
        // Escaped output is pure ASCII, so any byte index is a char boundary
        out.truncate(MAX_COMPONENT_LEN - DIGEST_HEX_LEN - 1);
        out.push('~');
        out.push_str(&sha256_hex(part));
    }
    out
}

/// Ledger file name for a key
pub fn ledger_file_name(key: &ScoreKey) -> String {
    format!(
        "{}.{}.{}",
        sanitize_component(&key.player),
        sanitize_component(&key.level),
        LEDGER_EXTENSION
    )
}

/// Persisted completion times, ranked on demand.
///
/// Single writer per ledger file: the per-key lock only serializes callers
/// inside this process.
#[derive(Debug)]
pub struct ScoreLedger {
    root: PathBuf,
    storage: LocalStorage,
    locks: Mutex<HashMap<ScoreKey, Arc<Mutex<()>>>>,
}

impl ScoreLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            storage: LocalStorage::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ScoreKey) -> PathBuf {
        self.root.join(ledger_file_name(key))
    }

    fn key_lock(&self, key: &ScoreKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// All entries for `key` in insertion order; empty if the ledger is
    /// missing or unreadable
    pub fn load(&self, key: &ScoreKey) -> Vec<ScoreEntry> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load_unlocked(key)
    }

    fn load_unlocked(&self, key: &ScoreKey) -> Vec<ScoreEntry> {
        let path = self.path_for(key);
        let contents = match self.storage.read_string(&path) {
            Ok(c) => c,
            Err(e) if e.is_not_found() => {
                log::debug!("No scores yet for {}/{}", key.player, key.level);
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let file: LedgerFile = match serde_json::from_str(&contents) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        if file.version != LEDGER_VERSION {
            log::warn!("Unsupported ledger version {} in {}", file.version, path.display());
            return Vec::new();
        }
        if file.player != key.player || file.level != key.level {
            log::warn!("Ledger {} belongs to {}/{}", path.display(), file.player, file.level);
            return Vec::new();
        }
        file.entries
    }

    /// Append `entry` and rewrite the whole ledger file
    pub fn append(&self, key: &ScoreKey, entry: ScoreEntry) -> Result<(), ScoreError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut entries = self.load_unlocked(key);
        entries.push(entry);

        let file = LedgerFile {
            version: LEDGER_VERSION,
            player: key.player.clone(),
            level: key.level.clone(),
            entries,
        };
        let json = serde_json::to_string_pretty(&file)?;
        self.storage.write(self.path_for(key), json.as_bytes())?;
        Ok(())
    }

    /// The `n` fastest entries, fastest first; equal times keep insertion order
    pub fn best_n(&self, key: &ScoreKey, n: usize) -> Vec<ScoreEntry> {
        let mut entries = self.load(key);
        entries.sort_by_key(|e| e.time);
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::CompletionTime;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(time: &str, minute: u32) -> ScoreEntry {
        ScoreEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            time: time.parse::<CompletionTime>().unwrap(),
        }
    }

    fn setup() -> (TempDir, ScoreLedger) {
        let dir = TempDir::new().unwrap();
        let ledger = ScoreLedger::new(dir.path().join("scores"));
        (dir, ledger)
    }

    #[test]
    fn test_empty_ledger() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        assert!(ledger.load(&key).is_empty());
        assert!(ledger.best_n(&key, 3).is_empty());
    }

    #[test]
    fn test_append_then_best() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        let e = entry("12.34", 0);
        ledger.append(&key, e.clone()).unwrap();
        assert_eq!(ledger.best_n(&key, 3), vec![e]);
    }

    #[test]
    fn test_append_keeps_previous_entries() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        ledger.append(&key, entry("20.00", 0)).unwrap();
        ledger.append(&key, entry("15.50", 1)).unwrap();

        let before = ledger.load(&key);
        let new = entry("30.01", 2);
        ledger.append(&key, new.clone()).unwrap();
        let after = ledger.load(&key);

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last(), Some(&new));
    }

    #[test]
    fn test_best_n_sorts_and_limits() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Bob", "Level2");
        for (i, t) in ["14.00", "9.99", "12.50", "9.99", "30.00"].iter().enumerate() {
            ledger.append(&key, entry(t, i as u32)).unwrap();
        }

        let best = ledger.best_n(&key, 3);
        let times: Vec<String> = best.iter().map(|e| e.time.to_string()).collect();
        assert_eq!(times, vec!["9.99", "9.99", "12.50"]);
        // Stable: equal times keep insertion order
        assert_eq!(best[0].timestamp, entry("9.99", 1).timestamp);
        assert_eq!(best[1].timestamp, entry("9.99", 3).timestamp);

        assert_eq!(ledger.best_n(&key, 10).len(), 5);
        assert!(ledger.best_n(&key, 0).is_empty());

        // Stored order is untouched
        let stored: Vec<String> = ledger.load(&key).iter().map(|e| e.time.to_string()).collect();
        assert_eq!(stored, vec!["14.00", "9.99", "12.50", "9.99", "30.00"]);
    }

    #[test]
    fn test_keys_are_isolated() {
        let (_dir, ledger) = setup();
        ledger.append(&ScoreKey::new("Alice", "Level1"), entry("10.00", 0)).unwrap();
        assert!(ledger.load(&ScoreKey::new("Alice", "Level2")).is_empty());
        assert!(ledger.load(&ScoreKey::new("Bob", "Level1")).is_empty());
    }

    #[test]
    fn test_corrupt_ledger_reads_as_empty() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        std::fs::create_dir_all(ledger.root()).unwrap();
        std::fs::write(ledger.path_for(&key), "\u{0}\u{1}garbage").unwrap();

        assert!(ledger.load(&key).is_empty());

        // Appending over a corrupt file starts a fresh history
        ledger.append(&key, entry("11.00", 0)).unwrap();
        assert_eq!(ledger.load(&key).len(), 1);
    }

    #[test]
    fn test_unknown_version_reads_as_empty() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        std::fs::create_dir_all(ledger.root()).unwrap();
        std::fs::write(
            ledger.path_for(&key),
            r#"{"version": 99, "player": "Alice", "level": "Level1", "entries": []}"#,
        )
        .unwrap();
        assert!(ledger.load(&key).is_empty());
    }

    #[test]
    fn test_file_format_is_versioned_json() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("Alice", "Level1");
        ledger.append(&key, entry("12.34", 0)).unwrap();

        let text = std::fs::read_to_string(ledger.path_for(&key)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["player"], "Alice");
        assert_eq!(json["entries"][0]["time"], "12.34");
        assert_eq!(json["entries"][0]["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_sanitize_blocks_traversal() {
        let key = ScoreKey::new("../../etc", "passwd");
        let name = ledger_file_name(&key);
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
        assert!(!name.contains(".."));

        let (_dir, ledger) = setup();
        assert_eq!(ledger.path_for(&key).parent(), Some(ledger.root()));
    }

    #[test]
    fn test_sanitize_is_collision_free() {
        let keys = [
            ScoreKey::new("a.b", "c"),
            ScoreKey::new("a", "b.c"),
            ScoreKey::new("a_2E", "b"),
            ScoreKey::new("a.", "b"),
            ScoreKey::new("a/b", "c"),
            ScoreKey::new("a\\b", "c"),
            ScoreKey::new("", "x"),
            ScoreKey::new("_", "x"),
        ];
        let names: std::collections::HashSet<String> = keys.iter().map(ledger_file_name).collect();
        assert_eq!(names.len(), keys.len());
    }

    #[test]
    fn test_long_names_fit_file_name_limit() {
        let (_dir, ledger) = setup();
        let key = ScoreKey::new("山田太郎".repeat(8), "Level1");
        let name = ledger_file_name(&key);
        assert!(name.len() <= 255, "file name is {} bytes", name.len());

        let e = entry("12.34", 0);
        ledger.append(&key, e.clone()).unwrap();
        assert_eq!(ledger.load(&key), vec![e]);

        // Both parts long at once
        let both = ScoreKey::new("é".repeat(200), "ü".repeat(200));
        assert!(ledger_file_name(&both).len() <= 255);
        ledger.append(&both, entry("9.00", 1)).unwrap();
        assert_eq!(ledger.load(&both).len(), 1);
    }

    #[test]
    fn test_shortened_names_stay_distinct() {
        let base = "山田太郎".repeat(8);
        let a = ScoreKey::new(format!("{}a", base), "Level1");
        let b = ScoreKey::new(format!("{}b", base), "Level1");
        assert_ne!(ledger_file_name(&a), ledger_file_name(&b));

        // A verbatim part can never look like a shortened one
        let short = sanitize_component("short~name");
        assert!(!short.contains('~'));
        assert!(sanitize_component(&base).contains('~'));
        assert_eq!(sanitize_component(&base).len(), MAX_COMPONENT_LEN);
    }

    #[test]
    fn test_concurrent_appends_to_one_key() {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(ScoreLedger::new(dir.path().join("scores")));
        let key = ScoreKey::new("Alice", "Level1");

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                let key = key.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let time = CompletionTime::from_hundredths(t * 100 + i).unwrap();
                        ledger.append(&key, ScoreEntry::now(time)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = ledger.load(&key);
        assert_eq!(entries.len(), 80);
        let mut times: Vec<i64> = entries.iter().map(|e| e.time.hundredths()).collect();
        times.sort();
        times.dedup();
        assert_eq!(times.len(), 80);
    }

    #[test]
    fn test_unwritable_root_fails_append() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blocker"), "x").unwrap();
        let ledger = ScoreLedger::new(dir.path().join("blocker"));
        let result = ledger.append(&ScoreKey::new("Alice", "Level1"), entry("1.00", 0));
        assert!(matches!(result, Err(ScoreError::Io(_))));
    }
}
