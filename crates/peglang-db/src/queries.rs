//! The incremental query database (spec §4.8): a salsa-2022 jar wiring
//! parse, import resolution, analyses, and compilation together as
//! tracked queries, so editing one file only re-runs what actually
//! depends on it.
//!
//! `SourceFile` is the one salsa input; everything else -- the merged
//! grammar, its diagnostics, its compiled [`Program`] -- is derived and
//! memoized. There is no explicit "invalidate" entry point: setting a
//! `SourceFile`'s text is the invalidation, salsa does the rest.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use peglang_bytecode::Program;
use peglang_compiler::{analyze, compile, grammar::Grammar, resolve, transform, CompileOptions};
use peglang_core::{Diagnostic, FileId, FileTable, SourceLocation, Span};

use crate::loader::{Adapter, ImportLoader};

#[salsa::jar(db = Db)]
pub struct Jar(
    SourceFile,
    ParsedGrammar,
    ResolvedGrammar,
    DiagnosticsAccumulator,
    parsed_grammar,
    resolved_imports,
    undefined_references,
    recursive_set,
    unused_rules,
    program,
);

pub trait Db: salsa::DbWithJar<Jar> {
    fn loader(&self) -> &dyn ImportLoader;
    fn files(&self) -> &RwLock<FileTable>;
}

#[salsa::db(crate::Jar)]
pub struct Database {
    storage: salsa::Storage<Self>,
    loader: Arc<dyn ImportLoader>,
    files: RwLock<FileTable>,
}

impl Database {
    pub fn new(loader: Arc<dyn ImportLoader>) -> Self {
        Self {
            storage: salsa::Storage::default(),
            loader,
            files: RwLock::new(FileTable::new()),
        }
    }

    /// Opens `path`, fetching its initial contents through the loader and
    /// interning it as a `SourceFile` input.
    pub fn open(&mut self, path: PathBuf) -> Result<SourceFile, crate::loader::LoaderError> {
        let text = self.loader.fetch(&path)?;
        self.files.write().intern(&path);
        Ok(SourceFile::new(&*self, path, text.to_string()))
    }

    /// Replaces `file`'s text with a freshly-created `SourceFile` input.
    /// Salsa inputs have no in-place setter for a plain value like this
    /// one, so the old handle is discarded; any query keyed on it simply
    /// stops being queried, and every query keyed on the new one is a
    /// cache miss, which is what drives recomputation (mirrors
    /// `analyzer-core`'s own `Buffer::new` replace-on-edit pattern).
    pub fn update(&mut self, file: SourceFile, text: String) -> SourceFile {
        let path = file.path(&*self);
        SourceFile::new(&*self, path, text)
    }
}

impl salsa::Database for Database {}

impl Db for Database {
    fn loader(&self) -> &dyn ImportLoader {
        self.loader.as_ref()
    }

    fn files(&self) -> &RwLock<FileTable> {
        &self.files
    }
}

#[salsa::input]
pub struct SourceFile {
    pub path: PathBuf,
    #[return_ref]
    pub text: String,
}

#[salsa::accumulator]
pub struct DiagnosticsAccumulator(Diagnostic);

/// A file parsed on its own, with no import resolution -- cheap enough to
/// recompute on every keystroke for as-you-type syntax feedback.
#[salsa::tracked]
pub struct ParsedGrammar {
    #[return_ref]
    pub grammar: Grammar,
}

/// `file` plus everything it transitively `@import`s, merged into one
/// grammar (spec §4.2).
#[salsa::tracked]
pub struct ResolvedGrammar {
    #[return_ref]
    pub grammar: Grammar,
}

#[salsa::tracked]
pub fn parsed_grammar(db: &dyn Db, file: SourceFile) -> ParsedGrammar {
    let path = file.path(db);
    let text = file.text(db);
    let result = peglang_compiler::parser::parse(text, FileId::from_raw(0), path.clone());
    for mut diag in result.diagnostics.into_vec() {
        diag.file = path.clone();
        DiagnosticsAccumulator::push(db, diag);
    }
    ParsedGrammar::new(db, result.grammar)
}

/// Resolves `file`'s imports, registering a dependency on its text so a
/// later [`Database::update`] invalidates this (and everything built on
/// it) automatically.
#[salsa::tracked]
pub fn resolved_imports(db: &dyn Db, file: SourceFile) -> ResolvedGrammar {
    let path = file.path(db);
    let text: Arc<str> = Arc::from(file.text(db).as_str());

    let mut files = db.files().write();
    let mut adapter = Adapter {
        loader: db.loader(),
        entry_path: path.clone(),
        entry_text: text,
    };
    let resolved = resolve::resolve(&path, &mut files, &mut adapter);
    let snapshot = files.clone();
    drop(files);

    for diag in resolved.diagnostics.into_vec() {
        DiagnosticsAccumulator::push(db, restamp(&snapshot, diag));
    }
    ResolvedGrammar::new(db, resolved.grammar)
}

#[salsa::tracked]
pub fn undefined_references(db: &dyn Db, file: SourceFile) {
    let resolved = resolved_imports(db, file);
    let mut diags = peglang_compiler::Diagnostics::new();
    analyze::undefined_references(resolved.grammar(db), &mut diags);
    let files = db.files().read();
    for diag in diags.into_vec() {
        DiagnosticsAccumulator::push(db, restamp(&files, diag));
    }
}

#[salsa::tracked]
pub fn recursive_set(db: &dyn Db, file: SourceFile) {
    let resolved = resolved_imports(db, file);
    let mut diags = peglang_compiler::Diagnostics::new();
    analyze::left_recursion(resolved.grammar(db), &mut diags);
    let files = db.files().read();
    for diag in diags.into_vec() {
        DiagnosticsAccumulator::push(db, restamp(&files, diag));
    }
}

#[salsa::tracked]
pub fn unused_rules(db: &dyn Db, file: SourceFile) {
    let resolved = resolved_imports(db, file);
    let builtins: HashSet<String> = transform::BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
    let mut diags = peglang_compiler::Diagnostics::new();
    analyze::unused_rules(resolved.grammar(db), &builtins, &mut diags);
    let files = db.files().read();
    for diag in diags.into_vec() {
        DiagnosticsAccumulator::push(db, restamp(&files, diag));
    }
}

/// Compiles `file` to bytecode (spec §4.5), or `None` if resolution or
/// analysis already reported an error -- callers read those through
/// [`diagnostics`], this just avoids compiling a grammar known to be broken.
#[salsa::tracked]
pub fn program(db: &dyn Db, file: SourceFile, options: CompileOptions) -> Option<Arc<Program>> {
    if !undefined_references::accumulated::<DiagnosticsAccumulator>(db, file).is_empty() {
        return None;
    }
    if !recursive_set::accumulated::<DiagnosticsAccumulator>(db, file).is_empty() {
        return None;
    }

    let resolved = resolved_imports(db, file);
    let transformed = transform::pipeline(resolved.grammar(db).clone(), &options);
    match compile::compile(&transformed) {
        Ok(program) => Some(Arc::new(program)),
        Err(err) => {
            let path = file.path(db);
            let file_id = db.files().read().id_of(&path).unwrap_or(FileId::from_raw(0));
            let location = SourceLocation::new(file_id, Span::point(peglang_core::Location::START));
            DiagnosticsAccumulator::push(
                db,
                Diagnostic::new(path, location, peglang_core::DiagnosticCode::UndefinedRule, err.to_string()),
            );
            None
        }
    }
}

/// Every diagnostic for `file`: resolution errors, the three analyses,
/// and compile errors, merged and restamped with real paths. Does not
/// also pull in [`parsed_grammar`]'s accumulation, since
/// [`resolved_imports`] already parses the entry file itself and would
/// otherwise double-report the same syntax errors.
pub fn diagnostics(db: &dyn Db, file: SourceFile, options: CompileOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    out.extend(resolved_imports::accumulated::<DiagnosticsAccumulator>(db, file));
    out.extend(undefined_references::accumulated::<DiagnosticsAccumulator>(db, file));
    out.extend(recursive_set::accumulated::<DiagnosticsAccumulator>(db, file));
    out.extend(unused_rules::accumulated::<DiagnosticsAccumulator>(db, file));
    out.extend(program::accumulated::<DiagnosticsAccumulator>(db, file, options));
    out
}

fn restamp(files: &FileTable, mut diagnostic: Diagnostic) -> Diagnostic {
    if let Some(path) = files.path(diagnostic.location.file) {
        diagnostic.file = path.to_path_buf();
    }
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsLoader;
    use std::io::Write;
    use std::path::Path;

    fn write_temp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn editing_a_file_invalidates_its_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(dir.path(), "g.peg", "A <- \"x\"");

        let mut db = Database::new(Arc::new(FsLoader));
        let file = db.open(path).unwrap();
        let options = CompileOptions::default();

        let first = program(&db, file, options);
        assert!(first.is_some());

        let file = db.update(file, "A <- B".to_string());
        let second = program(&db, file, options);
        assert!(second.is_none(), "undefined reference should fail compilation");

        let diags = diagnostics(&db, file, options);
        assert!(diags.iter().any(|d| d.code == peglang_core::DiagnosticCode::UndefinedRule));
    }

    #[test]
    fn resolves_imports_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "number.peg", "Number <- [0-9]+");
        let main_path = write_temp(dir.path(), "main.peg", "@import Number from \"number.peg\"\nMain <- Number");

        let mut db = Database::new(Arc::new(FsLoader));
        let file = db.open(main_path).unwrap();
        let resolved = resolved_imports(&db, file);
        assert!(resolved.grammar(&db).get("Number").is_some());
        assert!(resolved.grammar(&db).get("Main").is_some());
    }

    #[test]
    fn left_recursion_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(dir.path(), "g.peg", "E <- E \"+\" E / \"1\"");

        let db = Database::new(Arc::new(FsLoader));
        let mut db = db;
        let file = db.open(path).unwrap();
        let diags = diagnostics(&db, file, CompileOptions::default());
        assert!(diags.iter().any(|d| d.code == peglang_core::DiagnosticCode::LeftRecursion));
    }
}
