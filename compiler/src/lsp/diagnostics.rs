//! Compiler diagnostics to LSP `publishDiagnostics`
//!
//! Severity map: errors of any kind are 1, warnings 2, anything else 1.
//! Every diagnostic carries `source: "sablec"` and its numeric code;
//! secondary locations become `relatedInformation` entries with
//! URI-qualified ranges.

use crate::diagnostics::{CompileError, Severity};
use crate::lsp::protocol::{span_to_range, to_file_uri};
use crate::lsp::rpc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

fn lsp_severity(severity: Severity) -> i64 {
    match severity {
        Severity::Error => 1,
        Severity::Warning => 2,
        _ => 1,
    }
}

/// Build the `textDocument/publishDiagnostics` notification for `path`.
/// Emitted even when `errors` is empty so stale markers clear on the
/// client.
pub fn publish_notification(
    base: &Path,
    path: &str,
    sources: &BTreeMap<String, String>,
    errors: &[CompileError],
) -> Value {
    let mut diagnostics = Vec::new();
    for error in errors {
        let text = sources.get(error.path()).map(String::as_str).unwrap_or("");
        let mut diagnostic = json!({
            "source": "sablec",
            "severity": lsp_severity(error.severity()),
            "code": error.error_code(),
            "message": error.to_string(),
            "range": span_to_range(text, error.primary_span()),
        });

        let related: Vec<Value> = error
            .related()
            .iter()
            .map(|info| {
                let related_text = sources.get(&info.path).map(String::as_str).unwrap_or("");
                json!({
                    "message": info.message,
                    "location": {
                        "uri": to_file_uri(base, &info.path),
                        "range": span_to_range(related_text, info.span),
                    },
                })
            })
            .collect();
        if !related.is_empty() {
            diagnostic["relatedInformation"] = Value::Array(related);
        }

        diagnostics.push(diagnostic);
    }

    rpc::notification(
        "textDocument/publishDiagnostics",
        json!({
            "uri": to_file_uri(base, path),
            "diagnostics": diagnostics,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;
    use miette::NamedSource;
    use std::path::PathBuf;

    fn sources() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("/a.sbl".to_string(), "let x;\nlet x;\n".to_string());
        map
    }

    #[test]
    fn test_empty_notification_still_emitted() {
        let note = publish_notification(&PathBuf::from("/tmp/p"), "/a.sbl", &sources(), &[]);
        assert_eq!(note["method"], "textDocument/publishDiagnostics");
        assert_eq!(note["params"]["uri"], "file:///tmp/p/a.sbl");
        assert_eq!(note["params"]["diagnostics"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_diagnostic_fields() {
        let error = CompileError::DuplicateDeclaration {
            name: "x".into(),
            span: Span::new(11, 12).into(),
            first_span: Span::new(4, 5).into(),
            src: NamedSource::new("/a.sbl", "let x;\nlet x;\n".to_string()),
        };
        let note =
            publish_notification(&PathBuf::from("/tmp/p"), "/a.sbl", &sources(), &[error]);
        let diag = &note["params"]["diagnostics"][0];
        assert_eq!(diag["severity"], 1);
        assert_eq!(diag["source"], "sablec");
        assert_eq!(diag["code"], 2101);
        assert_eq!(diag["range"]["start"]["line"], 1);
        assert_eq!(diag["range"]["start"]["character"], 4);

        let related = &diag["relatedInformation"][0];
        assert_eq!(related["location"]["uri"], "file:///tmp/p/a.sbl");
        assert_eq!(related["location"]["range"]["start"]["line"], 0);
        assert_eq!(related["message"], "first declared here");
    }

    #[test]
    fn test_warning_severity_is_two() {
        let warning = CompileError::UnusedVariable {
            name: "x".into(),
            span: Span::new(4, 5).into(),
            src: NamedSource::new("/a.sbl", "let x;\n".to_string()),
        };
        let note =
            publish_notification(&PathBuf::from("/tmp/p"), "/a.sbl", &sources(), &[warning]);
        assert_eq!(note["params"]["diagnostics"][0]["severity"], 2);
    }
}
