//! Maps instruction offsets back to the grammar source span that emitted
//! them (spec §4.5: "instruction offsets are recorded against source
//! spans for the source map"). Used by the REPL to point into the
//! grammar when a labeled failure has no matching recovery rule, and by
//! `-grammar-source-map` to dump the table.

use peglang_core::SourceLocation;

/// Sorted by `offset`; lookups are a binary search for the entry at or
/// before a given instruction offset (an emission can span several
/// consecutive instructions sharing one source location).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: Vec<(u32, SourceLocation)>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that instruction `offset` onward (until the next recorded
    /// offset) originated from `location`. Must be called with
    /// non-decreasing `offset`.
    pub fn push(&mut self, offset: u32, location: SourceLocation) {
        debug_assert!(
            self.entries.last().is_none_or(|(last, _)| *last <= offset),
            "SourceMap::push requires non-decreasing offsets"
        );
        if let Some((last_offset, last_loc)) = self.entries.last_mut()
            && *last_offset == offset
        {
            *last_loc = location;
            return;
        }
        self.entries.push((offset, location));
    }

    /// The source location responsible for the instruction at `offset`,
    /// if any instruction at or before it was recorded.
    pub fn lookup(&self, offset: u32) -> Option<SourceLocation> {
        match self.entries.binary_search_by_key(&offset, |(o, _)| *o) {
            Ok(idx) => Some(self.entries[idx].1),
            Err(0) => None,
            Err(idx) => Some(self.entries[idx - 1].1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, SourceLocation)> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peglang_core::{FileId, Location, Span};

    fn loc(cursor: u32) -> SourceLocation {
        SourceLocation::new(
            FileId::from_raw(0),
            Span::point(Location::new(1, cursor + 1, cursor)),
        )
    }

    #[test]
    fn lookup_finds_most_recent_entry_at_or_before_offset() {
        let mut map = SourceMap::new();
        map.push(0, loc(0));
        map.push(5, loc(10));
        map.push(10, loc(20));

        assert_eq!(map.lookup(0), Some(loc(0)));
        assert_eq!(map.lookup(3), Some(loc(0)));
        assert_eq!(map.lookup(5), Some(loc(10)));
        assert_eq!(map.lookup(9), Some(loc(10)));
        assert_eq!(map.lookup(100), Some(loc(20)));
    }

    #[test]
    fn lookup_before_first_entry_is_none() {
        let mut map = SourceMap::new();
        map.push(3, loc(0));
        assert_eq!(map.lookup(0), None);
    }
}
