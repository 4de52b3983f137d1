//! Document highlight
//!
//! Like references but scoped to the requested unit, with one extra case:
//! a member access whose base names an enum type highlights that enum
//! member. Struct-member highlight is recognized but not implemented and
//! yields nothing.

use crate::ast::{DeclRef, NodeKind};
use crate::common::NodeId;
use crate::frontend::Analysis;
use crate::lsp::references::{collect, DocumentHighlight};
use crate::types::Type;

/// Highlights for the node at (`unit_idx`, `node_id`), within that unit.
pub fn document_highlight(
    analysis: &Analysis,
    unit_idx: usize,
    node_id: NodeId,
) -> Vec<DocumentHighlight> {
    let Some(ast) = &analysis.unit_at(unit_idx).ast else {
        return Vec::new();
    };
    let node = ast.node(node_id);

    if let Some(decl) = node.decl() {
        let decl_ref = DeclRef {
            unit: unit_idx,
            node: node_id,
        };
        return collect(analysis, unit_idx, decl_ref, &decl.name);
    }

    match &node.kind {
        NodeKind::Identifier { name, .. } => {
            let mut output = Vec::new();
            for decl in node.annotated_declarations() {
                output.extend(collect(analysis, unit_idx, decl, name));
            }
            output
        }
        NodeKind::IdentifierPath {
            segments,
            referenced,
            ..
        } => match (referenced, segments.last()) {
            (Some(decl), Some(last)) => collect(analysis, unit_idx, *decl, &last.name),
            _ => Vec::new(),
        },
        NodeKind::MemberAccess { base, member, .. } => {
            let base_ty = ast.node(*base).ty();
            match base_ty {
                Some(Type::TypeOf(inner)) => match inner.as_ref() {
                    Type::Enum { decl, .. } => {
                        // Find the named member of the enum definition and
                        // highlight its occurrences.
                        let enum_unit = analysis.unit_at(decl.unit);
                        let Some(enum_ast) = &enum_unit.ast else {
                            return Vec::new();
                        };
                        let NodeKind::Enum { members, .. } = &enum_ast.node(decl.node).kind
                        else {
                            return Vec::new();
                        };
                        let mut output = Vec::new();
                        for &member_id in members {
                            let member_node = enum_ast.node(member_id);
                            if member_node.decl().map(|d| d.name.as_str()) == Some(member)
                            {
                                let member_ref = DeclRef {
                                    unit: decl.unit,
                                    node: member_id,
                                };
                                output.extend(collect(analysis, unit_idx, member_ref, member));
                            }
                        }
                        output
                    }
                    // Struct-member highlight: recognized, not implemented.
                    Type::Struct { .. } => Vec::new(),
                    _ => Vec::new(),
                },
                Some(Type::Struct { .. }) => Vec::new(),
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{AnalysisLevel, CompileSettings, FileReader, Frontend};
    use crate::lsp::references::HighlightKind;
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

    #[test]
    fn test_highlight_on_declaration() {
        let source = "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n";
        let frontend = analyze(source);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        let decl_offset = source.find("total").unwrap();
        let node = ast.locate(decl_offset).unwrap();
        let highlights = document_highlight(analysis, idx, node);
        assert_eq!(highlights.len(), 2);
    }

    #[test]
    fn test_highlight_enum_member_through_type() {
        let source = "contract Auction {\n    enum Phase { Setup, Open }\n    let phase: Phase;\n    fn start() { phase = Phase.Open; }\n}\n";
        let frontend = analyze(source);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        // Cursor on `Open` in `Phase.Open` resolves through the enum type.
        let open_use = source.rfind("Open").unwrap();
        let node = ast.locate(open_use).unwrap();
        let highlights = document_highlight(analysis, idx, node);
        assert_eq!(highlights.len(), 2);
        let decl_offset = source.find("Open").unwrap();
        assert!(highlights
            .iter()
            .any(|h| h.location.span.start == decl_offset));
    }

    #[test]
    fn test_highlight_type_path() {
        let source = "enum Phase { Setup, Open }\ncontract Auction {\n    let phase: Phase;\n}\n";
        let frontend = analyze(source);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        // Cursor on the `Phase` type annotation.
        let annotation = source.rfind("Phase").unwrap();
        let node = ast.locate(annotation).unwrap();
        let highlights = document_highlight(analysis, idx, node);
        // The enum declaration and the annotation itself.
        assert_eq!(highlights.len(), 2);
        assert!(highlights.iter().any(|h| h.kind == HighlightKind::Write));
    }

    #[test]
    fn test_highlight_on_literal_is_empty() {
        let source = "fn f() -> u256 { return 42; }\n";
        let frontend = analyze(source);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        let node = ast.locate(source.find("42").unwrap()).unwrap();
        assert!(document_highlight(analysis, idx, node).is_empty());
    }
}
