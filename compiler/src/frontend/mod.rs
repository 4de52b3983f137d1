//! Compiler frontend
//!
//! The [`Frontend`] is the unit of compilation the language server drives:
//! install settings and a source snapshot, run `compile_to`, then read the
//! analyzed units and diagnostics. A frontend is cheap to construct and the
//! server rebuilds one per compile, so no incremental state survives
//! between runs.

pub mod settings;
pub mod sources;

pub use settings::{
    CompileSettings, EvmVersion, ModelCheckerContracts, ModelCheckerEngine, ModelCheckerSettings,
    ModelCheckerTargets, OptimiserSettings, RevertStrings,
};
pub use sources::{apply_remappings, FileReader, Remapping};

use crate::ast::{Ast, NodeKind};
use crate::common::Span;
use crate::diagnostics::CompileError;
use crate::lexer;
use crate::parser;
use crate::resolve;
use miette::NamedSource;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// How far a compile has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnalysisLevel {
    /// Sources lexed and parsed
    Parsed,
    /// Names resolved and expressions typed; no code generation
    Analyzed,
}

/// One compiled source file
#[derive(Debug, Clone)]
pub struct Unit {
    /// Canonical source key
    pub path: String,
    /// Immutable text snapshot; shared with every location derived from it
    pub text: Arc<str>,
    /// Arena AST, absent when the unit failed to parse
    pub ast: Option<Ast>,
}

/// A byte range within one analyzed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Index into [`Analysis::units`]
    pub unit: usize,
    pub span: Span,
}

/// The output of a compile: every unit plus the diagnostics
#[derive(Debug, Default)]
pub struct Analysis {
    pub units: Vec<Unit>,
    by_path: FxHashMap<String, usize>,
}

impl Analysis {
    pub fn unit(&self, path: &str) -> Option<(usize, &Unit)> {
        let idx = *self.by_path.get(path)?;
        Some((idx, &self.units[idx]))
    }

    pub fn unit_at(&self, idx: usize) -> &Unit {
        &self.units[idx]
    }
}

/// The compiler frontend
#[derive(Debug, Default)]
pub struct Frontend {
    settings: CompileSettings,
    sources: BTreeMap<String, String>,
    analysis: Option<Analysis>,
    errors: Vec<CompileError>,
    state: Option<AnalysisLevel>,
}

impl Frontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard sources, settings, and any previous compile output.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn configure(&mut self, settings: CompileSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    /// Install the set of sources to compile. Keys are canonical paths.
    pub fn set_sources(&mut self, sources: BTreeMap<String, String>) {
        self.sources = sources;
        self.analysis = None;
        self.state = None;
    }

    pub fn state(&self) -> Option<AnalysisLevel> {
        self.state
    }

    /// The installed sources, including files pulled in by imports.
    pub fn sources(&self) -> &BTreeMap<String, String> {
        &self.sources
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// The AST of one unit, when it parsed.
    pub fn ast(&self, path: &str) -> Option<&Ast> {
        self.analysis.as_ref()?.unit(path)?.1.ast.as_ref()
    }

    /// Compile every installed source up to `level`.
    ///
    /// Imports are rewritten through the remapping table and satisfied from
    /// the installed sources first, then from `reader` (which caches disk
    /// loads, keeping its view and ours equal). Unresolvable imports become
    /// diagnostics, never failures: compilation always runs to `level` on
    /// whatever parsed.
    pub fn compile_to(&mut self, level: AnalysisLevel, reader: &mut FileReader) {
        self.errors.clear();

        let mut units: Vec<Unit> = Vec::new();
        let mut by_path: FxHashMap<String, usize> = FxHashMap::default();
        let mut import_keys: Vec<Vec<String>> = Vec::new();
        let mut queue: VecDeque<String> = self.sources.keys().cloned().collect();

        while let Some(path) = queue.pop_front() {
            if by_path.contains_key(&path) {
                continue;
            }
            let text = self.sources.get(&path).cloned().expect("queued source");
            by_path.insert(path.clone(), units.len());

            let ast = lexer::lex(&path, &text)
                .and_then(|tokens| parser::parse(&path, &text, &tokens));
            let mut unit = Unit {
                path: path.clone(),
                text: Arc::from(text.as_str()),
                ast: match ast {
                    Ok(ast) => Some(ast),
                    Err(err) => {
                        self.errors.push(err);
                        None
                    }
                },
            };

            let mut resolved = Vec::new();
            if let Some(ast) = &mut unit.ast {
                let items = ast.items.clone();
                for item in items {
                    let (import_path, path_span) = match &ast.node(item).kind {
                        NodeKind::Import {
                            path: p,
                            path_span,
                            ..
                        } => (p.clone(), *path_span),
                        _ => continue,
                    };
                    let target =
                        apply_remappings(&self.settings.remappings, &path, &import_path);
                    let key = if target.starts_with('/') {
                        target
                    } else {
                        format!("/{target}")
                    };
                    let available = self.sources.contains_key(&key)
                        || match reader.read_source(&key) {
                            Ok(loaded) => {
                                self.sources.insert(key.clone(), loaded.clone());
                                true
                            }
                            Err(_) => false,
                        };
                    if available {
                        if let NodeKind::Import { resolved: r, .. } =
                            &mut ast.node_mut(item).kind
                        {
                            *r = Some(key.clone());
                        }
                        resolved.push(key.clone());
                        queue.push_back(key);
                    } else {
                        self.errors.push(CompileError::ImportNotFound {
                            path: import_path,
                            span: path_span.into(),
                            src: NamedSource::new(&path, text.clone()),
                        });
                    }
                }
            }
            units.push(unit);
            import_keys.push(resolved);
        }

        self.state = Some(AnalysisLevel::Parsed);

        if level >= AnalysisLevel::Analyzed {
            let imports: Vec<Vec<usize>> = import_keys
                .iter()
                .map(|keys| {
                    keys.iter()
                        .filter_map(|k| by_path.get(k).copied())
                        .collect()
                })
                .collect();
            let mut resolve_errors = resolve::resolve(&mut units, &imports);
            self.errors.append(&mut resolve_errors);
            self.state = Some(AnalysisLevel::Analyzed);
        }

        self.analysis = Some(Analysis { units, by_path });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compile(sources: &[(&str, &str)]) -> Frontend {
        let mut reader = FileReader::new(PathBuf::from("/nonexistent"));
        for (path, text) in sources {
            reader.set_source(*path, *text);
        }
        let mut frontend = Frontend::new();
        frontend.configure(CompileSettings {
            optimiser: OptimiserSettings::standard(),
            ..CompileSettings::default()
        });
        frontend.set_sources(reader.sources().clone());
        frontend.compile_to(AnalysisLevel::Analyzed, &mut reader);
        frontend
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut frontend = compile(&[("/a.sbl", "let = 3;\n")]);
        assert!(!frontend.errors().is_empty());
        frontend.reset();
        assert!(frontend.errors().is_empty());
        assert!(frontend.analysis().is_none());
        assert_eq!(frontend.state(), None);
        assert!(frontend.sources().is_empty());
    }

    #[test]
    fn test_compile_clean_unit() {
        let frontend = compile(&[(
            "/a.sbl",
            "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n",
        )]);
        assert_eq!(frontend.state(), Some(AnalysisLevel::Analyzed));
        assert!(frontend.errors().is_empty(), "{:?}", frontend.errors());
        assert!(frontend.ast("/a.sbl").is_some());
    }

    #[test]
    fn test_parse_error_leaves_no_ast() {
        let frontend = compile(&[("/a.sbl", "contract Broken {\n")]);
        assert_eq!(frontend.state(), Some(AnalysisLevel::Analyzed));
        assert_eq!(frontend.errors().len(), 1);
        assert!(frontend.ast("/a.sbl").is_none());
    }

    #[test]
    fn test_import_between_installed_sources() {
        let frontend = compile(&[
            ("/main.sbl", "import \"lib.sbl\";\nfn run() -> u256 { return helper(); }\n"),
            ("/lib.sbl", "fn helper() -> u256 { return 1; }\n"),
        ]);
        assert!(frontend.errors().is_empty(), "{:?}", frontend.errors());
        let ast = frontend.ast("/main.sbl").unwrap();
        match &ast.node(ast.items[0]).kind {
            NodeKind::Import { resolved, .. } => {
                assert_eq!(resolved.as_deref(), Some("/lib.sbl"));
            }
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_import_is_a_diagnostic() {
        let frontend = compile(&[("/main.sbl", "import \"gone.sbl\";\n")]);
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 2301);
        // The unit itself still parsed.
        assert!(frontend.ast("/main.sbl").is_some());
    }

    #[test]
    fn test_remapping_redirects_import() {
        let mut reader = FileReader::new(PathBuf::from("/nonexistent"));
        reader.set_source("/main.sbl", "import \"lib/util.sbl\";\n");
        reader.set_source("/vendor/util.sbl", "fn util() {}\n");
        let mut frontend = Frontend::new();
        frontend.configure(CompileSettings {
            remappings: vec![Remapping::parse("lib/=vendor/").unwrap()],
            ..CompileSettings::default()
        });
        frontend.set_sources(reader.sources().clone());
        frontend.compile_to(AnalysisLevel::Analyzed, &mut reader);
        assert!(frontend.errors().is_empty(), "{:?}", frontend.errors());
    }

    #[test]
    fn test_undeclared_identifier_diagnostic() {
        let frontend = compile(&[("/a.sbl", "fn f() -> u256 { return missing; }\n")]);
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 2201);
    }

    #[test]
    fn test_unused_local_is_a_warning() {
        use crate::diagnostics::Severity;
        let frontend = compile(&[("/a.sbl", "fn f() { let unused = 1; }\n")]);
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].severity(), Severity::Warning);
    }
}
