//! The program's string table (spec §4.5, §6.4).
//!
//! Holds identifiers, labels, literal text, and charset blobs (a
//! [`peglang_core::Charset`] serialized via `to_bytes`/`from_bytes`),
//! deduplicated by content and referenced elsewhere by index
//! (`StringId`). On-disk layout: 16-bit entry count, then per entry an
//! 8-bit length followed by that many bytes. Multi-byte integers are
//! big-endian on disk (spec §6.4).

use std::collections::HashMap;

use crate::ModuleError;

/// Index into a [`StringTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(value: u32) -> Self {
        Self(value)
    }
}

/// Entries are opaque byte strings: UTF-8 text for identifiers/labels/
/// literals, or a 32-byte charset blob for `Set` operands. The table does
/// not tag entries by kind; callers interpret bytes at the use site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<Vec<u8>>,
    dedup: HashMap<Vec<u8>, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a UTF-8 string, returning its id. Interning the same
    /// content twice returns the same id.
    pub fn intern_str(&mut self, s: &str) -> StringId {
        self.intern_bytes(s.as_bytes())
    }

    /// Intern an opaque byte string (e.g. a charset blob).
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> StringId {
        if let Some(&id) = self.dedup.get(bytes) {
            return id;
        }
        let id = StringId(self.entries.len() as u32);
        self.entries.push(bytes.to_vec());
        self.dedup.insert(bytes.to_vec(), id);
        id
    }

    pub fn get_bytes(&self, id: StringId) -> &[u8] {
        &self.entries[id.0 as usize]
    }

    pub fn get_str(&self, id: StringId) -> &str {
        std::str::from_utf8(self.get_bytes(id)).expect("string table entry is not valid UTF-8")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, &[u8])> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, bytes)| (StringId(i as u32), bytes.as_slice()))
    }

    /// Serialize to the on-disk layout: 16-bit big-endian count, then
    /// per-entry 8-bit length + bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModuleError> {
        if self.entries.len() > u16::MAX as usize {
            return Err(ModuleError::StringTableTooLarge(self.entries.len()));
        }
        let mut out = Vec::new();
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for entry in &self.entries {
            if entry.len() > u8::MAX as usize {
                return Err(ModuleError::StringEntryTooLong(entry.len()));
            }
            out.push(entry.len() as u8);
            out.extend_from_slice(entry);
        }
        Ok(out)
    }

    /// Deserialize from the on-disk layout. Returns the table and the
    /// number of bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), ModuleError> {
        if bytes.len() < 2 {
            return Err(ModuleError::Truncated);
        }
        let count = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let mut cursor = 2usize;
        let mut table = StringTable::new();
        for _ in 0..count {
            if cursor >= bytes.len() {
                return Err(ModuleError::Truncated);
            }
            let len = bytes[cursor] as usize;
            cursor += 1;
            if cursor + len > bytes.len() {
                return Err(ModuleError::Truncated);
            }
            table.intern_bytes(&bytes[cursor..cursor + len]);
            cursor += len;
        }
        Ok((table, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups_identical_strings() {
        let mut table = StringTable::new();
        let a = table.intern_str("Spacing");
        let b = table.intern_str("Spacing");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut table = StringTable::new();
        table.intern_str("G");
        table.intern_str("hello");
        table.intern_bytes(&[0u8; 32]);

        let bytes = table.to_bytes().unwrap();
        let (decoded, consumed) = StringTable::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.get_str(StringId::from_u32(0)), "G");
        assert_eq!(decoded.get_str(StringId::from_u32(1)), "hello");
        assert_eq!(decoded.get_bytes(StringId::from_u32(2)), &[0u8; 32]);
    }
}
