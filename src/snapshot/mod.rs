//! Profile snapshots
//!
//! A snapshot freezes a heap together with the profiles of the code blocks
//! that refer into it, so classification can be replayed offline.
//!
//! Files ending in `.json` are written as pretty-printed JSON. Anything else
//! uses the binary format: a magic tag, a little-endian format version, then
//! the bincode-encoded snapshot.
//!
//! # Example
//! ```text
//! icstatus dump profile.json
//! icstatus classify profile.ics --block main --index 4
//! ```

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::heap::Heap;
use crate::profile::{CodeBlockProfile, ProfiledBlock};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes of the binary snapshot format
const SNAPSHOT_MAGIC: &[u8; 4] = b"ICS\x01";

/// Binary format version
const SNAPSHOT_VERSION: u32 = 1;

/// A heap plus the profiles of the code blocks that reference it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub heap: Heap,
    pub code_blocks: Vec<CodeBlockProfile>,
}

impl ProfileSnapshot {
    pub fn new(heap: Heap) -> Self {
        Self {
            heap,
            code_blocks: Vec::new(),
        }
    }

    pub fn add_code_block(&mut self, profile: CodeBlockProfile) -> &mut Self {
        self.code_blocks.push(profile);
        self
    }

    /// Look up a code block by name
    pub fn code_block(&self, name: &str) -> Result<&CodeBlockProfile> {
        self.code_blocks
            .iter()
            .find(|block| block.name() == name)
            .ok_or_else(|| Error::UnknownCodeBlock(name.to_string()))
    }

    /// A classification view over one code block
    pub fn profiled_block<'a>(&'a self, name: &str, config: &'a ClassifierConfig) -> Result<ProfiledBlock<'a>> {
        let profile = self.code_block(name)?;
        Ok(ProfiledBlock::new(&self.heap, profile, config))
    }

    /// Check that every id in the snapshot resolves
    pub fn validate(&self) -> Result<()> {
        self.heap.check_integrity().map_err(Error::InvalidSnapshot)?;
        for block in &self.code_blocks {
            block.check_integrity(&self.heap)?;
        }
        Ok(())
    }

    /// Load a snapshot, picking the format from the file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = if is_json(path) {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader(reader)?
        } else {
            Self::from_bytes(&std::fs::read(path)?)?
        };
        tracing::debug!(
            path = %path.display(),
            code_blocks = snapshot.code_blocks.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Save a snapshot, picking the format from the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(&mut writer, self)?;
        } else {
            writer.write_all(&self.to_bytes()?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Encode in the binary format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bincode::serialize_into(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Decode the binary format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(Error::InvalidSnapshot("not a profile snapshot".to_string()));
        }

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version > SNAPSHOT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "snapshot version {} is newer than supported version {}",
                version, SNAPSHOT_VERSION
            )));
        }

        Ok(bincode::deserialize(reader)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
