//! Identity index rebuilt from an existing JSONL output file.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{info, warn};

use crate::error::HarvestError;
use crate::record::IdentityKey;

/// Counters from [`DedupIndex::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Non-blank lines that were not a UTF-8 JSON object.
    pub malformed: usize,
    /// Objects with no derivable identity.
    pub unkeyed: usize,
}

/// Set of identity keys already persisted. Grows during a run and is never
/// written back; the output file is the durable copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupIndex {
    keys: HashSet<IdentityKey>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every line of `path`. A missing file yields an empty index.
    pub fn load(path: &Path) -> Result<(Self, LoadStats), HarvestError> {
        let mut index = Self::new();
        let mut stats = LoadStats::default();

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((index, stats)),
            Err(e) => return Err(e.into()),
        };

        // Split on raw bytes so a line with invalid UTF-8 is skipped, not fatal.
        for (lineno, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let value = match serde_json::from_slice::<serde_json::Value>(&line) {
                Ok(v) if v.is_object() => v,
                _ => {
                    warn!(path = %path.display(), line = lineno + 1, "skipping malformed line");
                    stats.malformed += 1;
                    continue;
                }
            };
            match IdentityKey::from_json(&value) {
                Some(key) => {
                    index.keys.insert(key);
                }
                None => stats.unkeyed += 1,
            }
        }

        info!(
            path = %path.display(),
            loaded = index.len(),
            malformed = stats.malformed,
            unkeyed = stats.unkeyed,
            "loaded existing posts"
        );
        Ok((index, stats))
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns true when the key was not already present.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
