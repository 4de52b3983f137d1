//! Reference collector
//!
//! Given a declaration and its surface name, walk one unit's AST and
//! report every occurrence semantic analysis bound to that declaration.
//! Pure: reads the analysis, touches nothing.

use crate::ast::{DeclRef, NodeKind};
use crate::frontend::{Analysis, SourceLocation};

/// How an occurrence uses the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Unspecified,
    Text,
    Read,
    Write,
}

impl HighlightKind {
    /// LSP numeric value; `Unspecified` has none and is omitted.
    pub fn code(self) -> Option<i64> {
        match self {
            HighlightKind::Unspecified => None,
            HighlightKind::Text => Some(1),
            HighlightKind::Read => Some(2),
            HighlightKind::Write => Some(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHighlight {
    pub location: SourceLocation,
    pub kind: HighlightKind,
}

fn access_kind(lvalue: bool) -> HighlightKind {
    if lvalue {
        HighlightKind::Write
    } else {
        HighlightKind::Read
    }
}

/// Collect every occurrence of `decl` (surface token `name`) within the
/// unit at `unit_idx`. The declaration's own name-location counts as an
/// occurrence when it lives in that unit.
pub fn collect(
    analysis: &Analysis,
    unit_idx: usize,
    decl: DeclRef,
    name: &str,
) -> Vec<DocumentHighlight> {
    let unit = analysis.unit_at(unit_idx);
    let Some(ast) = &unit.ast else {
        return Vec::new();
    };

    let mut output = Vec::new();
    for node in &ast.nodes {
        match &node.kind {
            NodeKind::Identifier {
                name: token,
                referenced,
                candidates,
                lvalue,
                ..
            } => {
                let bound =
                    *referenced == Some(decl) || candidates.iter().any(|c| *c == decl);
                if bound && token == name {
                    output.push(DocumentHighlight {
                        location: SourceLocation {
                            unit: unit_idx,
                            span: node.span,
                        },
                        kind: access_kind(*lvalue),
                    });
                }
            }
            NodeKind::IdentifierPath {
                segments,
                referenced,
                ..
            } => {
                if *referenced == Some(decl) {
                    if let Some(last) = segments.last() {
                        if last.name == name {
                            output.push(DocumentHighlight {
                                location: SourceLocation {
                                    unit: unit_idx,
                                    span: last.span,
                                },
                                kind: HighlightKind::Read,
                            });
                        }
                    }
                }
            }
            NodeKind::MemberAccess {
                member,
                member_span,
                referenced,
                lvalue,
                ..
            } => {
                if *referenced == Some(decl) && member == name {
                    output.push(DocumentHighlight {
                        location: SourceLocation {
                            unit: unit_idx,
                            span: *member_span,
                        },
                        kind: access_kind(*lvalue),
                    });
                }
            }
            _ => {
                if node.id == decl.node && unit_idx == decl.unit {
                    if let Some(node_decl) = node.decl() {
                        if node_decl.name == name {
                            output.push(DocumentHighlight {
                                location: SourceLocation {
                                    unit: unit_idx,
                                    span: node_decl.name_span,
                                },
                                kind: HighlightKind::Write,
                            });
                        }
                    }
                }
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{AnalysisLevel, CompileSettings, FileReader, Frontend};
    use std::path::PathBuf;

    fn analyze(source: &str) -> Frontend {
        let mut reader = FileReader::new(PathBuf::from("/nonexistent"));
        reader.set_source("/a.sbl", source);
        let mut frontend = Frontend::new();
        frontend.configure(CompileSettings::default());
        frontend.set_sources(reader.sources().clone());
        frontend.compile_to(AnalysisLevel::Analyzed, &mut reader);
        frontend
    }

    fn decl_of(frontend: &Frontend, name: &str) -> DeclRef {
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();
        let node = ast
            .nodes
            .iter()
            .find(|n| n.decl().map(|d| d.name == name).unwrap_or(false))
            .expect("declaration");
        DeclRef {
            unit: idx,
            node: node.id,
        }
    }

    #[test]
    fn test_collect_includes_declaration_itself() {
        let source = "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n";
        let frontend = analyze(source);
        let decl = decl_of(&frontend, "total");

        let highlights = collect(frontend.analysis().unwrap(), 0, decl, "total");
        assert_eq!(highlights.len(), 2);
        // One of them is the declaration's own name-location.
        let name_offset = source.find("total").unwrap();
        assert!(highlights
            .iter()
            .any(|h| h.location.span.start == name_offset));
    }

    #[test]
    fn test_collect_distinguishes_reads_and_writes() {
        let source = "contract Vault {\n    let total: u256;\n    fn set(v: u256) { total = v; }\n}\n";
        let frontend = analyze(source);
        let decl = decl_of(&frontend, "total");

        let highlights = collect(frontend.analysis().unwrap(), 0, decl, "total");
        assert_eq!(highlights.len(), 2);
        assert!(highlights.iter().any(|h| h.kind == HighlightKind::Write
            && h.location.span.start != source.find("total").unwrap()));
    }

    #[test]
    fn test_collect_matches_member_accesses() {
        let source = "contract Auction {\n    enum Phase { Setup, Open }\n    let phase: Phase;\n    fn start() { phase = Phase.Open; }\n}\n";
        let frontend = analyze(source);
        let decl = decl_of(&frontend, "Open");

        let highlights = collect(frontend.analysis().unwrap(), 0, decl, "Open");
        // The enum member declaration plus the `Phase.Open` access.
        assert_eq!(highlights.len(), 2);
    }

    #[test]
    fn test_collect_requires_matching_name() {
        let source = "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n";
        let frontend = analyze(source);
        let decl = decl_of(&frontend, "total");
        assert!(collect(frontend.analysis().unwrap(), 0, decl, "other").is_empty());
    }
}
