//! Hover information
//!
//! Documented declarations show their documentation; identifiers, paths,
//! and member accesses show the short type string of what they reference.

use crate::ast::NodeKind;
use crate::common::NodeId;
use crate::frontend::Analysis;

/// Markdown tooltip for the node at (`unit_idx`, `node_id`). Empty string
/// means nothing to show.
pub fn hover_text(analysis: &Analysis, unit_idx: usize, node_id: NodeId) -> String {
    let Some(ast) = &analysis.unit_at(unit_idx).ast else {
        return String::new();
    };
    let node = ast.node(node_id);

    if let Some(doc) = node.decl().and_then(|d| d.doc.as_deref()) {
        return doc.to_string();
    }

    match &node.kind {
        NodeKind::Identifier { ty, .. }
        | NodeKind::IdentifierPath { ty, .. }
        | NodeKind::MemberAccess { ty, .. } => ty
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
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

    fn hover_at(frontend: &Frontend, offset: usize) -> String {
        let analysis = frontend.analysis().unwrap();
        let (idx, unit) = analysis.unit("/a.sbl").unwrap();
        let node = unit.ast.as_ref().unwrap().locate(offset).unwrap();
        hover_text(analysis, idx, node)
    }

    #[test]
    fn test_hover_shows_documentation() {
        let source = "contract Vault {\n    /// Total deposits, in wei.\n    let total: u256;\n}\n";
        let frontend = analyze(source);
        let text = hover_at(&frontend, source.find("total").unwrap());
        assert_eq!(text, "Total deposits, in wei.");
    }

    #[test]
    fn test_hover_shows_identifier_type() {
        let source = "contract Vault {\n    let total: u256;\n    fn get() -> u256 { return total; }\n}\n";
        let frontend = analyze(source);
        let text = hover_at(&frontend, source.rfind("total").unwrap());
        assert_eq!(text, "u256");
    }

    #[test]
    fn test_hover_shows_function_signature() {
        let source = "fn add(a: u256, b: u256) -> u256 { return a + b; }\nfn f() -> u256 { return add(1, 2); }\n";
        let frontend = analyze(source);
        let text = hover_at(&frontend, source.rfind("add").unwrap());
        assert_eq!(text, "fn(u256, u256) -> u256");
    }

    #[test]
    fn test_hover_on_enum_member_access() {
        let source = "enum Phase { Setup, Open }\nfn f() { let p = Phase.Open; p; }\n";
        let frontend = analyze(source);
        let text = hover_at(&frontend, source.rfind("Open").unwrap());
        assert_eq!(text, "enum Phase");
    }

    #[test]
    fn test_hover_empty_on_plain_syntax() {
        let source = "fn f() { return 1; }\n";
        let frontend = analyze(source);
        let text = hover_at(&frontend, source.find("return").unwrap());
        assert_eq!(text, "");
    }
}
