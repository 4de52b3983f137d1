//! Goto definition / implementation
//!
//! Dispatch on the located node: import directives jump to the start of
//! the imported source, identifiers fan out over every annotated
//! declaration, member accesses follow the referenced declaration.

use crate::ast::{DeclRef, NodeKind};
use crate::common::{NodeId, Span};
use crate::frontend::{Analysis, SourceLocation};

/// The declared name of `decl`, if it still resolves.
pub fn declaration_name(analysis: &Analysis, decl: DeclRef) -> Option<String> {
    let unit = analysis.units.get(decl.unit)?;
    let node = unit.ast.as_ref()?.node(decl.node);
    node.decl().map(|d| d.name.clone())
}

/// Preferred location for a declaration: its name when present, its full
/// extent otherwise.
pub fn declaration_location(analysis: &Analysis, decl: DeclRef) -> Option<SourceLocation> {
    let unit = analysis.units.get(decl.unit)?;
    let node = unit.ast.as_ref()?.node(decl.node);
    let span = match node.decl() {
        Some(d) if !d.name_span.is_empty() => d.name_span,
        _ => node.span,
    };
    Some(SourceLocation {
        unit: decl.unit,
        span,
    })
}

/// Resolve the definition targets for the node at (`unit_idx`, `node_id`).
pub fn goto_definition(
    analysis: &Analysis,
    unit_idx: usize,
    node_id: NodeId,
) -> Vec<SourceLocation> {
    let Some(ast) = &analysis.unit_at(unit_idx).ast else {
        return Vec::new();
    };
    let node = ast.node(node_id);

    let mut locations = Vec::new();
    match &node.kind {
        NodeKind::Import { resolved, .. } => {
            if let Some((target, _)) = resolved.as_deref().and_then(|key| analysis.unit(key)) {
                locations.push(SourceLocation {
                    unit: target,
                    span: Span::new(0, 0),
                });
            }
        }
        NodeKind::Identifier { .. } => {
            for decl in node.annotated_declarations() {
                if let Some(location) = declaration_location(analysis, decl) {
                    locations.push(location);
                }
            }
        }
        NodeKind::MemberAccess { referenced, .. } => {
            if let Some(decl) = referenced {
                if let Some(location) = declaration_location(analysis, *decl) {
                    locations.push(location);
                }
            }
        }
        _ => {}
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{AnalysisLevel, CompileSettings, FileReader, Frontend};
    use std::path::PathBuf;

    fn analyze(sources: &[(&str, &str)]) -> Frontend {
        let mut reader = FileReader::new(PathBuf::from("/nonexistent"));
        for (path, text) in sources {
            reader.set_source(*path, *text);
        }
        let mut frontend = Frontend::new();
        frontend.configure(CompileSettings::default());
        frontend.set_sources(reader.sources().clone());
        frontend.compile_to(AnalysisLevel::Analyzed, &mut reader);
        frontend
    }

    #[test]
    fn test_identifier_definition_is_name_location() {
        let source = "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n";
        let frontend = analyze(&[("/a.sbl", source)]);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        // Locate the use of `total` inside the function body.
        let use_offset = source.rfind("total").unwrap();
        let node = ast.locate(use_offset).unwrap();

        let locations = goto_definition(analysis, idx, node);
        assert_eq!(locations.len(), 1);
        let decl_offset = source.find("total").unwrap();
        assert_eq!(locations[0].span, Span::new(decl_offset, decl_offset + 5));
    }

    #[test]
    fn test_import_definition_is_start_of_target() {
        let frontend = analyze(&[
            ("/main.sbl", "import \"lib.sbl\";\n"),
            ("/lib.sbl", "fn helper() {}\n"),
        ]);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/main.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        let node = ast.locate(0).unwrap();
        let locations = goto_definition(analysis, idx, node);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].span, Span::new(0, 0));
        assert_eq!(analysis.unit_at(locations[0].unit).path, "/lib.sbl");
    }

    #[test]
    fn test_member_access_follows_referenced_declaration() {
        let source = "contract Auction {\n    enum Phase { Setup, Open }\n    let phase: Phase;\n    fn start() { phase = Phase.Open; }\n}\n";
        let frontend = analyze(&[("/a.sbl", source)]);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        let open_use = source.rfind("Open").unwrap();
        let node = ast.locate(open_use).unwrap();
        let locations = goto_definition(analysis, idx, node);
        assert_eq!(locations.len(), 1);
        let open_decl = source.find("Open").unwrap();
        assert_eq!(locations[0].span, Span::new(open_decl, open_decl + 4));
    }

    #[test]
    fn test_non_symbol_node_yields_nothing() {
        let source = "fn f() { return 1 + 2; }\n";
        let frontend = analyze(&[("/a.sbl", source)]);
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let ast = unit.ast.as_ref().unwrap();

        let literal = source.find('1').unwrap();
        let node = ast.locate(literal).unwrap();
        assert!(goto_definition(analysis, idx, node).is_empty());
    }
}
