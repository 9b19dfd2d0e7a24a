//! Import resolution (spec §4.2): walks `@import … from "path"`
//! declarations starting at an entry file and produces a single merged
//! [`Grammar`].
//!
//! File I/O is delegated to a `fetch` callback so this crate stays
//! decoupled from any particular loader (filesystem, overlay, or a test
//! fixture); `peglang-db`'s `ImportLoader` is what supplies it in
//! practice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use peglang_core::{DiagnosticCode, FileId, FileTable, Span};

use crate::diagnostics::Diagnostics;
use crate::grammar::Grammar;
use crate::parser;

/// Resolves `path`'s content and assigns it a `FileId`, or reports why it
/// couldn't be fetched.
pub trait Fetch {
    fn resolve_path(&mut self, import_path: &str, parent: &Path) -> PathBuf;
    fn read(&mut self, path: &Path) -> Option<Arc<str>>;
}

pub struct Resolved {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
}

/// Resolves `entry_path`'s imports (transitively) into one merged
/// Grammar. `entry_path` itself must already be interned in `files`.
pub fn resolve(entry_path: &Path, files: &mut FileTable, fetch: &mut dyn Fetch) -> Resolved {
    let mut diagnostics = Diagnostics::new();
    let mut in_progress = HashSet::new();
    let mut merged = Grammar::new();

    let entry_grammar = load_and_parse(entry_path, files, fetch, &mut diagnostics);
    for def in entry_grammar.definitions {
        merged.push_definition(def);
    }

    let mut pending = entry_grammar.imports;
    let mut idx = 0;
    in_progress.insert(normalize(entry_path));
    while idx < pending.len() {
        let import = pending[idx].clone();
        idx += 1;

        let parent = files.path(import.file).map(Path::to_path_buf).unwrap_or_default();
        let parent_dir = parent.parent().unwrap_or(Path::new(""));
        let target_path = fetch.resolve_path(&import.path, parent_dir);
        let target_key = normalize(&target_path);

        if in_progress.contains(&target_key) {
            diagnostics
                .report(DiagnosticCode::ImportCycle, import.file, parent.clone(), import.span)
                .message(format!("import cycle involving `{}`", import.path))
                .emit();
            continue;
        }

        let Some(target_grammar) = fetch.read(&target_path).map(|source| {
            let target_file = files.intern(&target_path);
            parse_into(&source, target_file, target_path.clone(), &mut diagnostics)
        }) else {
            diagnostics
                .report(DiagnosticCode::ImportNotFound, import.file, parent.clone(), import.span)
                .message(format!("could not find import target `{}`", import.path))
                .emit();
            continue;
        };

        in_progress.insert(target_key);
        for name in &import.names {
            match target_grammar.get(name) {
                Some(def) => {
                    if merged.contains(&def.name) {
                        diagnostics
                            .report(DiagnosticCode::ImportNameClash, import.file, parent.clone(), import.span)
                            .message(format!("`{}` is already defined", def.name))
                            .emit();
                    } else {
                        merged.push_definition(def.clone());
                    }
                }
                None => {
                    diagnostics
                        .report(DiagnosticCode::ImportNotFound, import.file, parent.clone(), import.span)
                        .message(format!("`{}` has no definition named `{}`", import.path, name))
                        .emit();
                }
            }
        }
        pending.extend(target_grammar.imports);
    }

    Resolved { grammar: merged, diagnostics }
}

fn load_and_parse(
    path: &Path,
    files: &mut FileTable,
    fetch: &mut dyn Fetch,
    diagnostics: &mut Diagnostics,
) -> Grammar {
    let file = files.intern(path);
    match fetch.read(path) {
        Some(source) => parse_into(&source, file, path.to_path_buf(), diagnostics),
        None => {
            diagnostics
                .report(DiagnosticCode::ImportNotFound, file, path.to_path_buf(), Span::point(peglang_core::Location::START))
                .message(format!("could not read `{}`", path.display()))
                .emit();
            Grammar::new()
        }
    }
}

fn parse_into(source: &str, file: FileId, path: PathBuf, diagnostics: &mut Diagnostics) -> Grammar {
    let result = parser::parse(source, file, path);
    diagnostics.extend(result.diagnostics);
    result.grammar
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component::*;
        match component {
            CurDir => {}
            ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixtureLoader {
        files: HashMap<PathBuf, Arc<str>>,
    }

    impl Fetch for FixtureLoader {
        fn resolve_path(&mut self, import_path: &str, parent: &Path) -> PathBuf {
            parent.join(import_path)
        }

        fn read(&mut self, path: &Path) -> Option<Arc<str>> {
            self.files.get(path).cloned()
        }
    }

    #[test]
    fn merges_an_imported_definition() {
        let mut files = FileTable::new();
        let mut loader = FixtureLoader {
            files: HashMap::from([
                (PathBuf::from("main.peg"), Arc::from(r#"@import Number from "number.peg"
Main <- Number"#)),
                (PathBuf::from("number.peg"), Arc::from(r#"Number <- [0-9]+"#)),
            ]),
        };

        let resolved = resolve(Path::new("main.peg"), &mut files, &mut loader);
        assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics.iter().collect::<Vec<_>>());
        assert!(resolved.grammar.get("Number").is_some());
        assert!(resolved.grammar.get("Main").is_some());
    }

    #[test]
    fn reports_a_cycle() {
        let mut files = FileTable::new();
        let mut loader = FixtureLoader {
            files: HashMap::from([
                (PathBuf::from("a.peg"), Arc::from(r#"@import B from "b.peg"
A <- B"#)),
                (PathBuf::from("b.peg"), Arc::from(r#"@import A from "a.peg"
B <- A"#)),
            ]),
        };

        let resolved = resolve(Path::new("a.peg"), &mut files, &mut loader);
        assert!(resolved.diagnostics.iter().any(|d| d.code == DiagnosticCode::ImportCycle));
    }
}
