//! DocumentStore - one loaded Secret manifest
//!
//! Usage is always the same shape:
//!
//! ```text
//! let mut store = DocumentStore::new();
//! store.load(bytes)?;                  // parse + `kind: Secret` check
//! store.transform(Direction::Decode)?; // or Encode
//! let out = store.serialize()?;
//! ```
//!
//! Anything other than `load` on an empty store fails with `NotLoaded`.

use crate::document::{self, OrderedMap};
use crate::error::{Result, SecretError};
use crate::munger::{self, Direction};
use std::io::{Read, Write};
use tracing::debug;

#[derive(Debug, Default)]
pub struct DocumentStore {
    document: OrderedMap,
    loaded: bool,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The loaded document, if any
    pub fn document(&self) -> Option<&OrderedMap> {
        self.loaded.then_some(&self.document)
    }

    /// Parse `bytes` and check that it is a Secret.
    ///
    /// Replaces whatever was loaded before. On failure the store is left
    /// empty.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        self.loaded = false;
        self.document = OrderedMap::new();

        let document = document::parse(bytes)?;
        munger::ensure_is_secret(&document)?;

        debug!(keys = document.len(), "loaded secret manifest");
        self.document = document;
        self.loaded = true;
        Ok(())
    }

    /// Read the whole stream, then [`load`](Self::load) it
    pub fn read_from<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.load(&bytes)
    }

    /// Rewrite every value under `data` in place.
    ///
    /// On error, entries before the failing one keep their new value.
    /// Returns the number of values rewritten.
    pub fn transform(&mut self, direction: Direction) -> Result<usize> {
        self.ensure_loaded()?;

        let count = munger::apply(&mut self.document, direction)?;
        debug!(count, direction = direction.as_str(), "munged secret values");
        Ok(count)
    }

    /// Encoding twice double-encodes; there is no "already encoded" check.
    pub fn encode_secrets(&mut self) -> Result<usize> {
        self.transform(Direction::Encode)
    }

    pub fn decode_secrets(&mut self) -> Result<usize> {
        self.transform(Direction::Decode)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.ensure_loaded()?;
        document::render(&self.document)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let bytes = self.serialize()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn ensure_loaded(&self) -> Result<()> {
        if !self.loaded {
            return Err(SecretError::NotLoaded);
        }
        Ok(())
    }
}
