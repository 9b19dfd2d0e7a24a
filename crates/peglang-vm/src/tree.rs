//! The Tree Store: an arena of nodes produced by a match (spec §3 "Tree",
//! §4.7). Children are pooled -- `Sequence`, `Node`, and `Error` nodes all
//! reference a `(start, end)` range into a single `children_pool` rather
//! than each owning a `Vec`, so the arena never allocates per node.

use peglang_bytecode::StringId;
use peglang_core::{Colors, Span};

/// Opaque handle into a [`Tree`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }
}

/// The payload of one arena node (spec §3: "each Node is one of
/// {String(range), Sequence(child-range), Node(nameId, childId),
/// Error(labelId, messageId, optional childId)}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    /// A leaf holding raw input text; its span *is* its text.
    String,
    /// An unnamed grouping of children in input order (produced by a
    /// `%{...}` block capture, or synthesized when a `Node` capture
    /// wraps more than one child).
    Sequence { children: (u32, u32) },
    /// A named capture (`%Ident`); always exactly one child, itself
    /// possibly a synthesized `Sequence`.
    Node { name: StringId, child: NodeId },
    /// A labeled-failure recovery node (spec §4.6, §7); `child` is
    /// `None` when the recovery rule consumed nothing.
    Error {
        label: StringId,
        message: StringId,
        child: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Record {
    data: NodeData,
    span: Span,
}

/// An arena of [`Record`]s plus a pool of child references, and the
/// single root set after a successful or error-recovered match.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Record>,
    children_pool: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_string(&mut self, span: Span) -> NodeId {
        self.push(NodeData::String, span)
    }

    pub fn push_sequence(&mut self, span: Span, children: &[NodeId]) -> NodeId {
        let range = self.pool(children);
        self.push(NodeData::Sequence { children: range }, span)
    }

    pub fn push_node(&mut self, name: StringId, child: NodeId, span: Span) -> NodeId {
        self.push(NodeData::Node { name, child }, span)
    }

    pub fn push_error(
        &mut self,
        label: StringId,
        message: StringId,
        child: Option<NodeId>,
        span: Span,
    ) -> NodeId {
        self.push(NodeData::Error {
            label,
            message,
            child,
        }, span)
    }

    fn pool(&mut self, children: &[NodeId]) -> (u32, u32) {
        let start = self.children_pool.len() as u32;
        self.children_pool.extend_from_slice(children);
        (start, self.children_pool.len() as u32)
    }

    fn push(&mut self, data: NodeData, span: Span) -> NodeId {
        debug_assert!(
            self.parent_of_children_contains(&data, span),
            "node span does not contain all of its children"
        );
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Record { data, span });
        id
    }

    fn parent_of_children_contains(&self, data: &NodeData, span: Span) -> bool {
        match *data {
            NodeData::String => true,
            NodeData::Sequence { children: (s, e) } => self.children_pool[s as usize..e as usize]
                .iter()
                .all(|&c| span.contains(&self.span(c))),
            NodeData::Node { child, .. } => span.contains(&self.span(child)),
            NodeData::Error { child, .. } => {
                child.is_none_or(|c| span.contains(&self.span(c)))
            }
        }
    }

    /// Set the tree root. Called exactly once (spec §3: "the root is set
    /// exactly once after a successful or error-recovered match").
    pub fn set_root(&mut self, root: NodeId) {
        debug_assert!(self.root.is_none(), "Tree::set_root called more than once");
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn data(&self, id: NodeId) -> NodeData {
        self.nodes[id.0 as usize].data
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0 as usize].span
    }

    /// Direct children of `id`, in input order. Empty for `String` and
    /// for leaf `Node`/`Error` nodes; use [`Tree::child_of`] for those.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes[id.0 as usize].data {
            NodeData::Sequence { children: (s, e) } => {
                &self.children_pool[s as usize..e as usize]
            }
            NodeData::String | NodeData::Node { .. } | NodeData::Error { .. } => &[],
        }
    }

    /// The one child of a `Node`, or the recovered child of an `Error`.
    pub fn child_of(&self, id: NodeId) -> Option<NodeId> {
        match self.nodes[id.0 as usize].data {
            NodeData::Node { child, .. } => Some(child),
            NodeData::Error { child, .. } => child,
            NodeData::String | NodeData::Sequence { .. } => None,
        }
    }

    /// The raw input text spanned by `id`. For a well-formed tree this
    /// equals the concatenation of `id`'s children's text (spec §8
    /// "Text round-trip"), except where `Quiet`/`disable-capture-spaces`
    /// dropped whitespace between them.
    pub fn text<'a>(&self, id: NodeId, input: &'a str) -> &'a str {
        &input[self.span(id).byte_range()]
    }

    /// Plain-text indented dump, used by `-output-language tree` / REPL
    /// output without `-v` color.
    pub fn pretty(&self, strings: &peglang_bytecode::StringTable, input: &str) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.write_node(&mut out, root, strings, input, 0, Colors::new(false));
        }
        out
    }

    /// ANSI-colored dump, used by the REPL and `-v`.
    pub fn highlight(&self, strings: &peglang_bytecode::StringTable, input: &str) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.write_node(&mut out, root, strings, input, 0, Colors::new(true));
        }
        out
    }

    fn write_node(
        &self,
        out: &mut String,
        id: NodeId,
        strings: &peglang_bytecode::StringTable,
        input: &str,
        depth: usize,
        colors: Colors,
    ) {
        use std::fmt::Write as _;
        let span = self.span(id);
        let indent = "  ".repeat(depth);
        match self.data(id) {
            NodeData::String => {
                writeln!(
                    out,
                    "{indent}{}{:?}{} [{}..{})",
                    colors.green,
                    self.text(id, input),
                    colors.reset,
                    span.start.cursor,
                    span.end.cursor
                )
                .unwrap();
            }
            NodeData::Sequence { .. } => {
                writeln!(
                    out,
                    "{indent}{}Sequence{} [{}..{})",
                    colors.dim,
                    colors.reset,
                    span.start.cursor,
                    span.end.cursor
                )
                .unwrap();
                for &child in self.children(id) {
                    self.write_node(out, child, strings, input, depth + 1, colors);
                }
            }
            NodeData::Node { name, .. } => {
                writeln!(
                    out,
                    "{indent}{}{}{} [{}..{})",
                    colors.blue,
                    strings.get_str(name),
                    colors.reset,
                    span.start.cursor,
                    span.end.cursor
                )
                .unwrap();
                if let Some(child) = self.child_of(id) {
                    self.write_node(out, child, strings, input, depth + 1, colors);
                }
            }
            NodeData::Error { label, message, .. } => {
                writeln!(
                    out,
                    "{indent}Error<{}> {:?} [{}..{})",
                    strings.get_str(label),
                    strings.get_str(message),
                    span.start.cursor,
                    span.end.cursor
                )
                .unwrap();
                if let Some(child) = self.child_of(id) {
                    self.write_node(out, child, strings, input, depth + 1, colors);
                }
            }
        }
    }
}
