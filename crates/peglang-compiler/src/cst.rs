//! Syntax kinds for the grammar language (spec §6.1 surface).
//!
//! `SyntaxKind` serves dual roles: token kinds (from the lexer) and node
//! kinds (used by `parser.rs`'s recovery-set bookkeeping in
//! `token_sets`). Logos derives token recognition; node kinds lack
//! token/regex attributes. `parser.rs` parses straight into the typed
//! `Grammar` AST rather than an intermediate syntax tree, so there is no
//! `rowan::Language` impl here -- see `lib.rs`'s module doc.

#![allow(dead_code)]

use logos::Logos;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token("<-")]
    LArrow = 0,

    #[token("/")]
    Slash,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("&")]
    Amp,

    #[token("!")]
    Bang,

    #[token("#")]
    Hash,

    #[token("%")]
    Percent,

    #[token("^")]
    Caret,

    #[token(";")]
    Semi,

    #[token(".")]
    Dot,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(",")]
    Comma,

    #[token("@")]
    At,

    /// Superscript-one sugar for `^1`.
    #[token("\u{00b9}")]
    SuperOne,

    /// Superscript-two sugar for `^2`.
    #[token("\u{00b2}")]
    SuperTwo,

    /// Superscript-three sugar for `^3`.
    #[token("\u{00b3}")]
    SuperThree,

    /// Rule name, reference, or label name. `import`/`from` are
    /// recognized contextually by the parser rather than reserved here.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Id,

    /// Quoted literal, either style; the parser strips quotes and
    /// unescapes the content.
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    #[regex(r"'(?:[^'\\]|\\.)*'")]
    StringLiteral,

    /// Bracketed character class, e.g. `[a-zA-Z0-9_]`.
    #[regex(r"\[(?:[^\]\\]|\\.)*\]")]
    ClassLiteral,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*[^/])*\*/")]
    BlockComment,

    /// Coalesced unrecognized characters.
    Garbage,
    Error,

    // --- Node kinds (non-terminals) ---
    Root,
    Import,
    Definition,
    Choice,
    Sequence,
    Not,
    And,
    Lex,
    Quiet,
    ZeroOrMore,
    OneOrMore,
    Optional,
    Labeled,
    NodeCapture,
    BlockCapture,
    Literal,
    Class,
    Any,
    Reference,
    Group,

    // Must be last - used for bounds checking in TokenSet's Debug impl.
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | LineComment | BlockComment)
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Error | Garbage)
    }
}

/// 64-bit bitset of `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn single(kind: SyntaxKind) -> Self {
        let kind = kind as u16;
        assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
        TokenSet(1 << kind)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser (spec §4.1: "recovery-sink
/// synchronization sets are defined per production").
pub mod token_sets {
    use super::*;

    /// FIRST set of a prefixed/atomic expression.
    pub const EXPR_FIRST: TokenSet = TokenSet::new(&[
        ParenOpen,
        BraceOpen,
        Id,
        StringLiteral,
        ClassLiteral,
        Dot,
        Bang,
        Amp,
        Hash,
        Semi,
        Percent,
    ]);

    pub const DEF_FIRST: TokenSet = TokenSet::new(&[Id]);

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, LineComment, BlockComment]);

    /// Recovery set for an unclosed `(`.
    pub const GROUP_RECOVERY: TokenSet = TokenSet::new(&[ParenClose]);

    /// Recovery set for an unclosed `%{`.
    pub const BLOCK_CAPTURE_RECOVERY: TokenSet = TokenSet::new(&[BraceClose]);

    /// Recovery set for a missing label name after `^`.
    pub const LABEL_RECOVERY: TokenSet =
        TokenSet::new(&[Slash, ParenClose, BraceClose, Id, Semi]);

    /// Recovery set synchronizing to the next rule/import at the top level.
    pub const DEF_RECOVERY: TokenSet = TokenSet::new(&[Id, At]);

    /// Recovery set for a malformed `@import` clause.
    pub const IMPORT_RECOVERY: TokenSet = TokenSet::new(&[Id, At]);
}
