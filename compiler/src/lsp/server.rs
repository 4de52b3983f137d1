//! Server loop and dispatch
//!
//! A synchronous, single-threaded language server: block on the transport,
//! run one handler to completion, repeat. The lifecycle walks
//! `Uninitialized -> Running -> ShutdownRequested -> Exited`; `exit` is
//! accepted from any state and ends the loop.

use crate::common::{translate_position, NodeId};
use crate::frontend::{
    Analysis, AnalysisLevel, CompileSettings, EvmVersion, Frontend, ModelCheckerContracts,
    ModelCheckerEngine, ModelCheckerSettings, ModelCheckerTargets, OptimiserSettings, Remapping,
    RevertStrings, SourceLocation,
};
use crate::lsp::definition;
use crate::lsp::diagnostics::publish_notification;
use crate::lsp::document::DocumentStore;
use crate::lsp::highlight;
use crate::lsp::hover;
use crate::lsp::protocol::{self, DocumentPosition};
use crate::lsp::references;
use crate::lsp::rpc::{self, ErrorCode};
use crate::lsp::transport::{Transport, TransportError};
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Client-requested trace verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Off,
    Messages,
    Verbose,
}

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Running,
    ShutdownRequested,
    Exited,
}

/// Dispatch-table entry: which handler a method maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    CancelRequest,
    Initialize,
    Initialized,
    Shutdown,
    Exit,
    DidChangeConfiguration,
    DidOpen,
    DidChange,
    DidClose,
    Definition,
    Implementation,
    References,
    DocumentHighlight,
    Hover,
}

fn handler_for(method: &str) -> Option<Handler> {
    match method {
        "$/cancelRequest" | "cancelRequest" => Some(Handler::CancelRequest),
        "initialize" => Some(Handler::Initialize),
        "initialized" => Some(Handler::Initialized),
        "shutdown" => Some(Handler::Shutdown),
        "exit" => Some(Handler::Exit),
        "workspace/didChangeConfiguration" => Some(Handler::DidChangeConfiguration),
        "textDocument/didOpen" => Some(Handler::DidOpen),
        "textDocument/didChange" => Some(Handler::DidChange),
        "textDocument/didClose" => Some(Handler::DidClose),
        "textDocument/definition" => Some(Handler::Definition),
        "textDocument/implementation" => Some(Handler::Implementation),
        "textDocument/references" => Some(Handler::References),
        "textDocument/documentHighlight" => Some(Handler::DocumentHighlight),
        "textDocument/hover" => Some(Handler::Hover),
        _ => None,
    }
}

#[derive(Debug, Error)]
enum HandlerError {
    #[error("{0}")]
    InvalidParams(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn invalid_params(message: impl Into<String>) -> HandlerError {
    HandlerError::InvalidParams(message.into())
}

/// The Sable language server
pub struct LanguageServer<T> {
    transport: T,
    store: DocumentStore,
    evm_version: EvmVersion,
    revert_strings: RevertStrings,
    model_checker: ModelCheckerSettings,
    remappings: Vec<Remapping>,
    /// Last compile, rebuilt from scratch on every change
    frontend: Option<Frontend>,
    trace: TraceLevel,
    lifecycle: Lifecycle,
    shutdown_requested: bool,
}

impl<T: Transport> LanguageServer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            store: DocumentStore::new(PathBuf::new()),
            evm_version: EvmVersion::default(),
            revert_strings: RevertStrings::default(),
            model_checker: ModelCheckerSettings::default(),
            remappings: Vec::new(),
            frontend: None,
            trace: TraceLevel::Off,
            lifecycle: Lifecycle::Uninitialized,
            shutdown_requested: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn frontend(&self) -> Option<&Frontend> {
        self.frontend.as_ref()
    }

    /// Read-dispatch loop. Returns whether shutdown was requested before
    /// the loop ended; the process exit code derives from it.
    pub fn run(&mut self) -> bool {
        while self.lifecycle != Lifecycle::Exited {
            match self.transport.receive() {
                Ok(Some(message)) => self.handle_message(message),
                Ok(None) => break,
                Err(TransportError::Malformed(err)) => {
                    self.log(&format!("dropping malformed message: {err}"));
                }
                Err(TransportError::Io(err)) => {
                    self.log(&format!("transport failed: {err}"));
                    break;
                }
            }
        }
        self.shutdown_requested
    }

    fn handle_message(&mut self, message: Value) {
        let Some(message) = rpc::decode(message) else {
            self.trace_msg("dropping message without a method");
            return;
        };
        let id = message.id.clone();

        let Some(handler) = handler_for(&message.method) else {
            if let Some(id) = &id {
                self.send(rpc::error(
                    Some(id),
                    ErrorCode::MethodNotFound,
                    &format!("Unknown method {}", message.method),
                ));
            } else {
                self.trace_msg(&format!(
                    "dropping notification for unknown method {}",
                    message.method
                ));
            }
            return;
        };

        match self.lifecycle {
            Lifecycle::Uninitialized
                if !matches!(handler, Handler::Initialize | Handler::Exit) =>
            {
                if let Some(id) = &id {
                    self.send(rpc::error(
                        Some(id),
                        ErrorCode::ServerNotInitialized,
                        "server not initialized",
                    ));
                }
                return;
            }
            Lifecycle::ShutdownRequested if !matches!(handler, Handler::Exit) => {
                if let Some(id) = &id {
                    self.send(rpc::error(
                        Some(id),
                        ErrorCode::InvalidRequest,
                        "shutdown already requested",
                    ));
                }
                return;
            }
            Lifecycle::Running if matches!(handler, Handler::Initialize) => {
                if let Some(id) = &id {
                    self.send(rpc::error(
                        Some(id),
                        ErrorCode::InvalidRequest,
                        "server already initialized",
                    ));
                }
                return;
            }
            _ => {}
        }

        if let Err(err) = self.dispatch(handler, id.as_ref(), &message.params) {
            match (err, &id) {
                (HandlerError::InvalidParams(msg), Some(id)) => {
                    self.send(rpc::error(Some(id), ErrorCode::InvalidParams, &msg));
                }
                (HandlerError::InvalidParams(msg), None) => {
                    self.trace_msg(&format!("dropping notification with invalid params: {msg}"));
                }
                (HandlerError::Transport(err), _) => {
                    self.log(&format!("failed to send a message: {err}"));
                }
            }
        }
    }

    fn dispatch(
        &mut self,
        handler: Handler,
        id: Option<&Value>,
        params: &Value,
    ) -> Result<(), HandlerError> {
        match handler {
            Handler::Initialize => self.handle_initialize(id, params),
            Handler::Initialized => Ok(()),
            // Handlers run to completion, so there is nothing to cancel.
            Handler::CancelRequest => Ok(()),
            Handler::Shutdown => {
                self.lifecycle = Lifecycle::ShutdownRequested;
                self.shutdown_requested = true;
                self.reply(id, Value::Null)
            }
            Handler::Exit => {
                self.lifecycle = Lifecycle::Exited;
                Ok(())
            }
            Handler::DidChangeConfiguration => {
                if let Some(settings) = params.get("settings") {
                    if settings.is_object() {
                        self.change_configuration(settings);
                    }
                }
                Ok(())
            }
            Handler::DidOpen => self.handle_did_open(params),
            Handler::DidChange => self.handle_did_change(params),
            Handler::DidClose => {
                self.trace_msg("didClose: keeping last known contents");
                Ok(())
            }
            Handler::Definition | Handler::Implementation => {
                self.handle_goto_definition(id, params)
            }
            Handler::References => self.handle_references(id, params),
            Handler::DocumentHighlight => self.handle_document_highlight(id, params),
            Handler::Hover => self.handle_hover(id, params),
        }
    }

    // === Plumbing ===

    fn send(&mut self, message: Value) {
        if let Err(err) = self.transport.send(&message) {
            self.log(&format!("failed to send a message: {err}"));
        }
    }

    fn reply(&mut self, id: Option<&Value>, result: Value) -> Result<(), HandlerError> {
        if let Some(id) = id {
            self.transport.send(&rpc::response(id, result))?;
        }
        Ok(())
    }

    fn log(&self, message: &str) {
        if self.trace >= TraceLevel::Messages {
            tracing::info!(target: "sable_lsp", "{message}");
        }
    }

    fn trace_msg(&self, message: &str) {
        if self.trace >= TraceLevel::Verbose {
            tracing::debug!(target: "sable_lsp", "{message}");
        }
    }

    fn analysis(&self) -> Option<&Analysis> {
        self.frontend.as_ref()?.analysis()
    }

    /// Pull `{textDocument: {uri}, position}` out of request params.
    /// `Ok(None)` means a well-formed request for a non-`file://` URI,
    /// which handlers answer with an empty result.
    fn extract_document_position(
        &self,
        params: &Value,
    ) -> Result<Option<DocumentPosition>, HandlerError> {
        let uri = params
            .get("textDocument")
            .and_then(|doc| doc.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params("missing textDocument.uri"))?;
        let position = params
            .get("position")
            .and_then(protocol::position_from_json)
            .ok_or_else(|| invalid_params("missing position"))?;
        Ok(protocol::path_from_file_uri(uri).map(|path| DocumentPosition {
            path: protocol::strip_base_path(self.store.base_path(), &path),
            position,
        }))
    }

    // === Compile driver ===

    /// Rebuild the frontend over the current document snapshot and run it
    /// to analysis. Returns false only when `path` has no buffer.
    fn compile(&mut self, path: &str) -> bool {
        if !self.store.contains(path) {
            self.log(&format!("source code not found for path: {path}"));
            return false;
        }

        // Reset rather than reuse: stale ASTs must not survive a compile.
        let mut frontend = self.frontend.take().unwrap_or_default();
        frontend.reset();
        frontend.configure(CompileSettings {
            evm_version: self.evm_version,
            revert_strings: self.revert_strings,
            model_checker: self.model_checker.clone(),
            optimiser: OptimiserSettings::standard(),
            remappings: self.remappings.clone(),
        });
        frontend.set_sources(self.store.snapshot());
        frontend.compile_to(AnalysisLevel::Analyzed, self.store.reader_mut());
        self.frontend = Some(frontend);
        true
    }

    /// Compile and publish the resulting diagnostics. The notification is
    /// emitted even when the list is empty so stale markers clear.
    fn compile_source(&mut self, path: &str) -> Result<(), HandlerError> {
        self.compile(path);
        let note = {
            let errors = self
                .frontend
                .as_ref()
                .map(|frontend| frontend.errors())
                .unwrap_or(&[]);
            publish_notification(self.store.base_path(), path, self.store.sources(), errors)
        };
        self.transport.send(&note)?;
        Ok(())
    }

    /// Compile on demand and locate the innermost AST node at the request
    /// position.
    fn request_node(&mut self, dpos: &DocumentPosition) -> Option<(usize, NodeId)> {
        if self.frontend.is_none() {
            self.compile(&dpos.path);
        }
        if !self.store.contains(&dpos.path) {
            return None;
        }
        let frontend = self.frontend.as_ref()?;
        if frontend.state() < Some(AnalysisLevel::Analyzed) {
            return None;
        }
        let analysis = frontend.analysis()?;
        let (unit_idx, unit) = analysis.unit(&dpos.path)?;
        let ast = unit.ast.as_ref()?;
        let offset = translate_position(
            &unit.text,
            dpos.position.line as usize,
            dpos.position.character as usize,
        )
        .ok()?;
        let node = ast.locate(offset)?;
        Some((unit_idx, node))
    }

    fn location_json(&self, analysis: &Analysis, location: SourceLocation) -> Value {
        let unit = analysis.unit_at(location.unit);
        json!({
            "uri": protocol::to_file_uri(self.store.base_path(), &unit.path),
            "range": protocol::span_to_range(&unit.text, location.span),
        })
    }

    // === Lifecycle handlers ===

    fn handle_initialize(
        &mut self,
        id: Option<&Value>,
        params: &Value,
    ) -> Result<(), HandlerError> {
        let mut root_path = String::new();
        if let Some(uri) = params.get("rootUri").and_then(Value::as_str) {
            root_path = protocol::path_from_file_uri(uri)
                .ok_or_else(|| invalid_params("rootUri must be a file:// URI"))?;
        } else if let Some(path) = params.get("rootPath").and_then(Value::as_str) {
            root_path = path.to_string();
        }

        if let Some(trace) = params.get("trace").and_then(Value::as_str) {
            match trace {
                "off" => self.trace = TraceLevel::Off,
                "messages" => self.trace = TraceLevel::Messages,
                "verbose" => self.trace = TraceLevel::Verbose,
                _ => {}
            }
        }

        self.store.rebase(PathBuf::from(root_path));
        if let Some(options) = params.get("initializationOptions") {
            if options.is_object() {
                self.change_configuration(options);
            }
        }
        self.lifecycle = Lifecycle::Running;

        self.reply(
            id,
            json!({
                "serverInfo": {
                    "name": "sablec",
                    "version": crate::VERSION,
                },
                "capabilities": {
                    "hoverProvider": true,
                    "textDocumentSync": {
                        "openClose": true,
                        // 0=none, 1=full, 2=incremental
                        "change": 2,
                    },
                    "definitionProvider": true,
                    "implementationProvider": true,
                    "documentHighlightProvider": true,
                    "referencesProvider": true,
                },
            }),
        )
    }

    // === Configuration ingestion ===

    /// Shared by `initializationOptions` and
    /// `workspace/didChangeConfiguration`. Unknown keys are ignored; a
    /// value that fails to parse leaves the current setting alone (except
    /// `revertStrings`, which falls back to its default).
    fn change_configuration(&mut self, settings: &Value) {
        if let Some(value) = settings.get("evm").and_then(Value::as_str) {
            match EvmVersion::from_name(value) {
                Some(version) => self.evm_version = version,
                None => self.trace_msg(&format!("invalid EVM version: {value}")),
            }
        }

        if let Some(value) = settings.get("revertStrings").and_then(Value::as_str) {
            self.revert_strings = RevertStrings::from_name(value).unwrap_or_default();
        }

        if let Some(list) = settings.get("remapping").and_then(Value::as_array) {
            for element in list {
                if let Some(text) = element.as_str() {
                    match Remapping::parse(text) {
                        // Appends rather than replaces: repeated
                        // configuration changes accumulate rules.
                        Some(remapping) => self.remappings.push(remapping),
                        None => self.trace_msg(&format!("failed to parse remapping: '{text}'")),
                    }
                }
            }
        }

        if let Some(value) = settings.get("model-checker-contracts").and_then(Value::as_str) {
            match ModelCheckerContracts::from_string(value) {
                Some(contracts) => self.model_checker.contracts = contracts,
                None => self.log(&format!(
                    "invalid option for model-checker-contracts: {value}"
                )),
            }
        }

        if let Some(value) = settings.get("model-checker-engine").and_then(Value::as_str) {
            match ModelCheckerEngine::from_name(value) {
                Some(engine) => self.model_checker.engine = engine,
                None => self.log(&format!("invalid option for model-checker-engine: {value}")),
            }
        }

        if let Some(value) = settings.get("model-checker-targets").and_then(Value::as_str) {
            match ModelCheckerTargets::from_string(value) {
                Some(targets) => self.model_checker.targets = targets,
                None => self.log(&format!("invalid option for model-checker-targets: {value}")),
            }
        }

        if let Some(value) = settings.get("model-checker-timeout").and_then(Value::as_u64) {
            self.model_checker.timeout = Some(value);
        }
    }

    // === Document synchronization ===

    fn handle_did_open(&mut self, params: &Value) -> Result<(), HandlerError> {
        let document = params
            .get("textDocument")
            .ok_or_else(|| invalid_params("missing textDocument"))?;
        let uri = document
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params("missing textDocument.uri"))?;
        let text = document
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params("missing textDocument.text"))?;
        let Some(path) = protocol::path_from_file_uri(uri) else {
            return Ok(());
        };
        let path = protocol::strip_base_path(self.store.base_path(), &path);

        self.store.open(&path, text.to_string());
        self.compile_source(&path)
    }

    /// Apply every content change in order to the same buffer, then issue
    /// exactly one compile. An empty batch compiles nothing.
    fn handle_did_change(&mut self, params: &Value) -> Result<(), HandlerError> {
        let uri = params
            .get("textDocument")
            .and_then(|doc| doc.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params("missing textDocument.uri"))?;
        let changes = params
            .get("contentChanges")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid_params("contentChanges must be an array"))?;
        let Some(path) = protocol::path_from_file_uri(uri) else {
            return Ok(());
        };
        let path = protocol::strip_base_path(self.store.base_path(), &path);

        for change in changes {
            let Some(text) = change.get("text").and_then(Value::as_str) else {
                // Broken clients only; skip the entry.
                self.trace_msg("skipping malformed content change");
                continue;
            };
            match change.get("range") {
                Some(range_value) if range_value.is_object() => {
                    let Some(range) = protocol::range_from_json(range_value) else {
                        self.trace_msg("skipping content change with malformed range");
                        continue;
                    };
                    match self.store.range_update(&path, range, text) {
                        Ok(true) => {}
                        Ok(false) => self.log(&format!("document not open: {path}")),
                        Err(err) => {
                            self.trace_msg(&format!("dropping range update: {err}"));
                        }
                    }
                }
                _ => {
                    if !self.store.full_update(&path, text.to_string()) {
                        self.log(&format!("document not open: {path}"));
                    }
                }
            }
        }

        if !changes.is_empty() {
            self.compile_source(&path)?;
        }
        Ok(())
    }

    // === Symbol queries ===

    fn handle_goto_definition(
        &mut self,
        id: Option<&Value>,
        params: &Value,
    ) -> Result<(), HandlerError> {
        let Some(dpos) = self.extract_document_position(params)? else {
            return self.reply(id, json!([]));
        };
        let Some((unit_idx, node_id)) = self.request_node(&dpos) else {
            return self.reply(id, json!([]));
        };
        let payload = match self.analysis() {
            Some(analysis) => {
                let locations = definition::goto_definition(analysis, unit_idx, node_id);
                Value::Array(
                    locations
                        .into_iter()
                        .map(|location| self.location_json(analysis, location))
                        .collect(),
                )
            }
            None => json!([]),
        };
        self.reply(id, payload)
    }

    fn handle_references(
        &mut self,
        id: Option<&Value>,
        params: &Value,
    ) -> Result<(), HandlerError> {
        let Some(dpos) = self.extract_document_position(params)? else {
            return self.reply(id, json!([]));
        };
        let Some((unit_idx, node_id)) = self.request_node(&dpos) else {
            return self.reply(id, json!([]));
        };
        let payload = match self.analysis() {
            Some(analysis) => {
                let locations = collect_reference_locations(analysis, unit_idx, node_id);
                Value::Array(
                    locations
                        .into_iter()
                        .map(|location| self.location_json(analysis, location))
                        .collect(),
                )
            }
            None => json!([]),
        };
        self.reply(id, payload)
    }

    fn handle_document_highlight(
        &mut self,
        id: Option<&Value>,
        params: &Value,
    ) -> Result<(), HandlerError> {
        let Some(dpos) = self.extract_document_position(params)? else {
            return self.reply(id, json!([]));
        };
        let Some((unit_idx, node_id)) = self.request_node(&dpos) else {
            return self.reply(id, json!([]));
        };
        let payload = match self.analysis() {
            Some(analysis) => {
                let highlights = highlight::document_highlight(analysis, unit_idx, node_id);
                Value::Array(
                    highlights
                        .into_iter()
                        .map(|h| {
                            let unit = analysis.unit_at(h.location.unit);
                            let mut item = json!({
                                "range": protocol::span_to_range(&unit.text, h.location.span),
                            });
                            if let Some(kind) = h.kind.code() {
                                item["kind"] = json!(kind);
                            }
                            item
                        })
                        .collect(),
                )
            }
            None => json!([]),
        };
        self.reply(id, payload)
    }

    fn handle_hover(&mut self, id: Option<&Value>, params: &Value) -> Result<(), HandlerError> {
        let Some(dpos) = self.extract_document_position(params)? else {
            return self.reply(id, Value::Null);
        };
        let Some((unit_idx, node_id)) = self.request_node(&dpos) else {
            return self.reply(id, Value::Null);
        };
        let payload = match self.analysis() {
            Some(analysis) => {
                let text = hover::hover_text(analysis, unit_idx, node_id);
                if text.is_empty() {
                    Value::Null
                } else {
                    let unit = analysis.unit_at(unit_idx);
                    let span = unit
                        .ast
                        .as_ref()
                        .map(|ast| ast.node(node_id).span)
                        .unwrap_or_default();
                    json!({
                        "range": protocol::span_to_range(&unit.text, span),
                        "contents": {
                            "kind": "markdown",
                            "value": text,
                        },
                    })
                }
            }
            None => Value::Null,
        };
        self.reply(id, payload)
    }
}

/// References dispatch: which declarations the located node names, and the
/// surface token to match while collecting.
fn collect_reference_locations(
    analysis: &Analysis,
    unit_idx: usize,
    node_id: NodeId,
) -> Vec<SourceLocation> {
    use crate::ast::{DeclRef, NodeKind};

    let Some(ast) = &analysis.unit_at(unit_idx).ast else {
        return Vec::new();
    };
    let node = ast.node(node_id);

    let mut output = Vec::new();
    let mut push_all = |highlights: Vec<references::DocumentHighlight>| {
        output.extend(highlights.into_iter().map(|h| h.location));
    };

    if let Some(decl) = node.decl() {
        let decl_ref = DeclRef {
            unit: unit_idx,
            node: node_id,
        };
        push_all(references::collect(analysis, unit_idx, decl_ref, &decl.name));
        return output;
    }

    match &node.kind {
        NodeKind::Identifier { .. } => {
            for decl in node.annotated_declarations() {
                if let Some(name) = definition::declaration_name(analysis, decl) {
                    push_all(references::collect(analysis, unit_idx, decl, &name));
                }
            }
        }
        NodeKind::IdentifierPath { referenced, .. } => {
            if let Some(decl) = referenced {
                if let Some(name) = definition::declaration_name(analysis, *decl) {
                    push_all(references::collect(analysis, unit_idx, *decl, &name));
                }
            }
        }
        NodeKind::MemberAccess {
            member, referenced, ..
        } => {
            if let Some(decl) = referenced {
                push_all(references::collect(analysis, unit_idx, *decl, member));
            }
        }
        _ => {}
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_table() {
        assert_eq!(handler_for("initialize"), Some(Handler::Initialize));
        assert_eq!(handler_for("$/cancelRequest"), Some(Handler::CancelRequest));
        assert_eq!(handler_for("cancelRequest"), Some(Handler::CancelRequest));
        assert_eq!(
            handler_for("textDocument/implementation"),
            Some(Handler::Implementation)
        );
        assert_eq!(handler_for("textDocument/rename"), None);
    }

    #[test]
    fn test_trace_levels_are_ordered() {
        assert!(TraceLevel::Off < TraceLevel::Messages);
        assert!(TraceLevel::Messages < TraceLevel::Verbose);
    }
}
