//! The capture stack and incremental Tree-Store construction (spec §3
//! "capture stack (entries are opens and atomic items)", §4.5
//! "`Capture(e)` with node kind ... terminal capture wraps atomic
//! character emissions").
//!
//! Raw byte consumption between capture boundaries is coalesced into a
//! single `String` leaf rather than one leaf per matched byte -- this is
//! what turns `Num <- [0-9]+` into one `String "123"` leaf instead of
//! three.

use peglang_bytecode::{CaptureKind, StringId};
use peglang_core::{Location, Span};

use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy)]
enum Entry {
    Open {
        kind: CaptureKind,
        label: StringId,
        start: Location,
    },
    Item(NodeId),
}

/// Snapshot of capture-stack state for a backtrack entry: stack height
/// plus any not-yet-flushed raw consumption (spec §9 "each backtrack
/// entry carries a capture-stack height snapshot").
#[derive(Debug, Clone, Copy)]
pub struct CaptureMark {
    height: usize,
    pending_start: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureStack {
    entries: Vec<Entry>,
    pending_start: Option<Location>,
}

impl CaptureStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) -> CaptureMark {
        CaptureMark {
            height: self.entries.len(),
            pending_start: self.pending_start,
        }
    }

    pub fn restore(&mut self, mark: CaptureMark) {
        self.entries.truncate(mark.height);
        self.pending_start = mark.pending_start;
    }

    /// Push an already-built node directly, e.g. the `Error` node
    /// produced by [`crate::vm::Vm`] when a labeled throw's recovery call
    /// returns.
    pub fn push_item(&mut self, id: NodeId) {
        self.entries.push(Entry::Item(id));
    }

    /// Collect every item pushed since `mark` into one value (flushing
    /// any trailing raw consumption first), without requiring a matching
    /// `Open` -- used to gather a recovery call's captured content as the
    /// child of the `Error` node a labeled throw produces (spec §4.6).
    pub fn drain_since(&mut self, mark: CaptureMark, tree: &mut Tree, at: Location) -> Option<NodeId> {
        self.flush(tree, at);
        let items: Vec<NodeId> = self
            .entries
            .split_off(mark.height)
            .into_iter()
            .map(|e| match e {
                Entry::Item(id) => id,
                Entry::Open { .. } => unreachable!("recovery call returned with an unclosed capture"),
            })
            .collect();
        self.pending_start = mark.pending_start;
        match items.len() {
            0 => None,
            1 => Some(items[0]),
            _ => {
                let span = items
                    .iter()
                    .map(|&id| tree.span(id))
                    .reduce(|a, b| a.merge(&b))
                    .expect("non-empty items");
                Some(tree.push_sequence(span, &items))
            }
        }
    }

    /// Record that one atomic match (`Char`/`Span`/`Set`) consumed bytes
    /// from `before` to `after`, coalescing into any run already open.
    pub fn record_consumed(&mut self, before: Location) {
        if self.pending_start.is_none() {
            self.pending_start = Some(before);
        }
    }

    /// Flush any pending raw consumption into a `String` leaf item. Must
    /// be called before `open`/`close` so capture boundaries see a
    /// correctly ordered item list.
    pub fn flush(&mut self, tree: &mut Tree, at: Location) {
        if let Some(start) = self.pending_start.take() {
            let id = tree.push_string(Span::new(start, at));
            self.entries.push(Entry::Item(id));
        }
    }

    pub fn open(&mut self, kind: CaptureKind, label: StringId, at: Location, tree: &mut Tree) {
        self.flush(tree, at);
        self.entries.push(Entry::Open {
            kind,
            label,
            start: at,
        });
    }

    /// Close the innermost open capture, producing the node it captured
    /// (spec §4.5 emission: `CapOpen(node,id) ; emit(e) ; CapClose(node,id)`).
    ///
    /// # Panics
    /// Panics if there is no matching `Open` -- the compiler never emits
    /// an unbalanced `CapClose`.
    pub fn close(&mut self, expected_kind: CaptureKind, at: Location, tree: &mut Tree) -> NodeId {
        self.flush(tree, at);

        let mut children = Vec::new();
        loop {
            match self.entries.pop().expect("CapClose without matching CapOpen") {
                Entry::Item(id) => children.push(id),
                Entry::Open { kind, label, start } => {
                    debug_assert_eq!(kind, expected_kind, "capture kind mismatch");
                    children.reverse();
                    let span = Span::new(start, at);
                    let id = match kind {
                        CaptureKind::Block => {
                            // Unnamed grouping: always a Sequence, even with one child.
                            tree.push_sequence(span, &children)
                        }
                        CaptureKind::Node => {
                            let content = match children.len() {
                                1 => children[0],
                                _ => tree.push_sequence(span, &children),
                            };
                            tree.push_node(label, content, span)
                        }
                    };
                    self.entries.push(Entry::Item(id));
                    return id;
                }
            }
        }
    }

    /// Called once at the end of a successful top-level match. Flushes
    /// any trailing raw consumption and returns the single remaining
    /// item as the tree root, synthesizing a `Sequence` if the grammar's
    /// entry rule produced more than one top-level item (no enclosing
    /// capture at all).
    pub fn finish(mut self, tree: &mut Tree, at: Location) -> Option<NodeId> {
        self.flush(tree, at);
        let items: Vec<NodeId> = self
            .entries
            .into_iter()
            .map(|e| match e {
                Entry::Item(id) => id,
                Entry::Open { .. } => unreachable!("match accepted with an unclosed capture"),
            })
            .collect();
        match items.len() {
            0 => None,
            1 => Some(items[0]),
            _ => {
                let span = items
                    .iter()
                    .map(|&id| tree.span(id))
                    .reduce(|a, b| a.merge(&b))
                    .expect("non-empty items");
                Some(tree.push_sequence(span, &items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(cursor: u32) -> Location {
        Location::new(1, cursor + 1, cursor)
    }

    #[test]
    fn consecutive_chars_coalesce_into_one_string() {
        let mut tree = Tree::new();
        let mut caps = CaptureStack::new();
        caps.record_consumed(loc(0));
        caps.record_consumed(loc(1));
        caps.record_consumed(loc(2));
        let root = caps.finish(&mut tree, loc(3)).unwrap();
        assert_eq!(tree.children(root).len(), 0);
        assert_eq!(tree.span(root), Span::new(loc(0), loc(3)));
    }

    #[test]
    fn node_capture_around_a_single_string_has_no_extra_sequence() {
        let mut tree = Tree::new();
        let mut caps = CaptureStack::new();
        let label = StringId::from_u32(0);
        caps.open(CaptureKind::Node, label, loc(0), &mut tree);
        caps.record_consumed(loc(0));
        for i in 1..5 {
            caps.record_consumed(loc(i));
        }
        let node = caps.close(CaptureKind::Node, loc(5), &mut tree);
        assert_eq!(
            tree.child_of(node).map(|c| tree.children(c).len()),
            None.or(Some(0))
        );
    }

    #[test]
    fn backtrack_restores_height_and_pending() {
        let mut tree = Tree::new();
        let mut caps = CaptureStack::new();
        caps.record_consumed(loc(0));
        let mark = caps.mark();
        caps.flush(&mut tree, loc(1));
        caps.record_consumed(loc(1));
        assert_eq!(caps.entries.len(), 1);
        caps.restore(mark);
        assert_eq!(caps.entries.len(), 0);
        assert_eq!(caps.pending_start, Some(loc(0)));
    }
}
