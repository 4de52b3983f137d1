//! Declaration collection and reference binding
//!
//! Resolution runs in two passes over the parsed units. The collect pass
//! builds a symbol table of every declaration (with duplicate detection and
//! declared types); the bind pass walks each unit's AST and writes the
//! `referenced` / `candidates` / `ty` annotations the language server
//! queries rely on.

use crate::ast::{Ast, BinOp, DeclRef, NodeKind, PathSegment, UnOp};
use crate::common::{NodeId, Span};
use crate::diagnostics::CompileError;
use crate::frontend::Unit;
use crate::types::Type;
use miette::NamedSource;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone)]
struct DeclInfo {
    name: String,
    name_span: Span,
    ty: Type,
}

/// Symbol table shared by the bind pass
#[derive(Default)]
struct Table {
    /// Top-level type declarations per unit
    unit_types: Vec<FxHashMap<String, DeclRef>>,
    /// Top-level value declarations per unit (functions may overload)
    unit_values: Vec<FxHashMap<String, Vec<DeclRef>>>,
    /// Nested type declarations per contract
    contract_types: FxHashMap<DeclRef, FxHashMap<String, DeclRef>>,
    /// Value members per contract / fields per struct / members per enum
    members: FxHashMap<DeclRef, FxHashMap<String, Vec<DeclRef>>>,
    info: FxHashMap<DeclRef, DeclInfo>,
}

/// Resolve all units against each other.
///
/// `imports[u]` holds the indices of the units imported by unit `u`.
/// Units that failed to parse (no AST) take no part in resolution.
pub fn resolve(units: &mut [Unit], imports: &[Vec<usize>]) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let table = collect(units, imports, &mut errors);

    for u in 0..units.len() {
        let Some(mut ast) = units[u].ast.take() else {
            continue;
        };
        let mut walker = Walker {
            ast: &mut ast,
            unit: u,
            path: units[u].path.clone(),
            text: units[u].text.to_string(),
            table: &table,
            imports: &imports[u],
            contract: None,
            locals: Vec::new(),
            local_types: FxHashMap::default(),
            used: FxHashSet::default(),
            declared_locals: Vec::new(),
            errors: &mut errors,
        };
        walker.walk_unit();
        units[u].ast = Some(ast);
    }

    errors
}

// === Collect pass ===

fn collect(units: &[Unit], imports: &[Vec<usize>], errors: &mut Vec<CompileError>) -> Table {
    let mut table = Table::default();
    table.unit_types = vec![FxHashMap::default(); units.len()];
    table.unit_values = vec![FxHashMap::default(); units.len()];

    // Pass A: register declarations and detect duplicates.
    // Remember each declaration's context for the typing pass below.
    let mut typed_decls: Vec<(DeclRef, Option<DeclRef>, Option<NodeId>)> = Vec::new();
    let mut functions: Vec<(DeclRef, Option<DeclRef>, Vec<NodeId>, Option<NodeId>)> = Vec::new();

    for (u, unit) in units.iter().enumerate() {
        let Some(ast) = &unit.ast else { continue };
        for &item in &ast.items {
            collect_item(
                u, unit, ast, item, None, &mut table, &mut typed_decls, &mut functions, errors,
            );
        }
    }

    // Pass B: compute declared types now that every type name is known.
    for (decl, contract, ty_node) in typed_decls {
        let ty = ty_node
            .map(|n| type_of_path(units, imports, &table, decl.unit, contract, n))
            .unwrap_or(Type::Unknown);
        table.info.get_mut(&decl).expect("registered decl").ty = ty;
    }
    for (decl, contract, params, ret) in functions {
        let unit = decl.unit;
        let ast = units[unit].ast.as_ref().expect("unit with declarations");
        let param_tys = params
            .iter()
            .map(|&p| match &ast.node(p).kind {
                NodeKind::Param { ty, .. } => {
                    type_of_path(units, imports, &table, unit, contract, *ty)
                }
                _ => Type::Unknown,
            })
            .collect();
        let ret_ty = ret.map(|n| Box::new(type_of_path(units, imports, &table, unit, contract, n)));
        table.info.get_mut(&decl).expect("registered decl").ty = Type::Function {
            params: param_tys,
            ret: ret_ty,
        };
    }

    table
}

#[allow(clippy::too_many_arguments)]
fn collect_item(
    u: usize,
    unit: &Unit,
    ast: &Ast,
    item: NodeId,
    contract: Option<DeclRef>,
    table: &mut Table,
    typed_decls: &mut Vec<(DeclRef, Option<DeclRef>, Option<NodeId>)>,
    functions: &mut Vec<(DeclRef, Option<DeclRef>, Vec<NodeId>, Option<NodeId>)>,
    errors: &mut Vec<CompileError>,
) {
    let node = ast.node(item);
    let decl_ref = DeclRef { unit: u, node: item };
    match &node.kind {
        NodeKind::Contract { decl, members } => {
            register_type(u, unit, table, decl_ref, contract, errors);
            table.info.insert(
                decl_ref,
                DeclInfo {
                    name: decl.name.clone(),
                    name_span: decl.name_span,
                    ty: Type::Contract {
                        decl: decl_ref,
                        name: decl.name.clone(),
                    },
                },
            );
            table.contract_types.insert(decl_ref, FxHashMap::default());
            table.members.insert(decl_ref, FxHashMap::default());
            for &member in members {
                collect_item(
                    u,
                    unit,
                    ast,
                    member,
                    Some(decl_ref),
                    table,
                    typed_decls,
                    functions,
                    errors,
                );
            }
        }
        NodeKind::Struct { decl, fields } => {
            register_type(u, unit, table, decl_ref, contract, errors);
            table.info.insert(
                decl_ref,
                DeclInfo {
                    name: decl.name.clone(),
                    name_span: decl.name_span,
                    ty: Type::Struct {
                        decl: decl_ref,
                        name: decl.name.clone(),
                    },
                },
            );
            let mut field_map: FxHashMap<String, Vec<DeclRef>> = FxHashMap::default();
            for &field in fields {
                let field_ref = DeclRef { unit: u, node: field };
                if let NodeKind::Field { decl: fdecl, ty } = &ast.node(field).kind {
                    register_member(
                        unit,
                        &mut field_map,
                        field_ref,
                        fdecl.name.clone(),
                        fdecl.name_span,
                        false,
                        &table.info,
                        errors,
                    );
                    table.info.insert(
                        field_ref,
                        DeclInfo {
                            name: fdecl.name.clone(),
                            name_span: fdecl.name_span,
                            ty: Type::Unknown,
                        },
                    );
                    typed_decls.push((field_ref, contract, Some(*ty)));
                }
            }
            table.members.insert(decl_ref, field_map);
        }
        NodeKind::Enum { decl, members } => {
            register_type(u, unit, table, decl_ref, contract, errors);
            table.info.insert(
                decl_ref,
                DeclInfo {
                    name: decl.name.clone(),
                    name_span: decl.name_span,
                    ty: Type::Enum {
                        decl: decl_ref,
                        name: decl.name.clone(),
                    },
                },
            );
            let enum_ty = Type::Enum {
                decl: decl_ref,
                name: decl.name.clone(),
            };
            let mut member_map: FxHashMap<String, Vec<DeclRef>> = FxHashMap::default();
            for &member in members {
                let member_ref = DeclRef { unit: u, node: member };
                if let NodeKind::EnumMember { decl: mdecl } = &ast.node(member).kind {
                    register_member(
                        unit,
                        &mut member_map,
                        member_ref,
                        mdecl.name.clone(),
                        mdecl.name_span,
                        false,
                        &table.info,
                        errors,
                    );
                    table.info.insert(
                        member_ref,
                        DeclInfo {
                            name: mdecl.name.clone(),
                            name_span: mdecl.name_span,
                            ty: enum_ty.clone(),
                        },
                    );
                }
            }
            table.members.insert(decl_ref, member_map);
        }
        NodeKind::Function {
            decl, params, ret, ..
        } => {
            register_value(u, unit, table, decl_ref, contract, true, errors);
            table.info.insert(
                decl_ref,
                DeclInfo {
                    name: decl.name.clone(),
                    name_span: decl.name_span,
                    ty: Type::Unknown,
                },
            );
            for &param in params {
                let param_ref = DeclRef { unit: u, node: param };
                if let NodeKind::Param { decl: pdecl, ty } = &ast.node(param).kind {
                    table.info.insert(
                        param_ref,
                        DeclInfo {
                            name: pdecl.name.clone(),
                            name_span: pdecl.name_span,
                            ty: Type::Unknown,
                        },
                    );
                    typed_decls.push((param_ref, contract, Some(*ty)));
                }
            }
            functions.push((decl_ref, contract, params.clone(), *ret));
        }
        NodeKind::Variable { decl, ty, .. } => {
            register_value(u, unit, table, decl_ref, contract, false, errors);
            table.info.insert(
                decl_ref,
                DeclInfo {
                    name: decl.name.clone(),
                    name_span: decl.name_span,
                    ty: Type::Unknown,
                },
            );
            typed_decls.push((decl_ref, contract, *ty));
        }
        _ => {}
    }
}

fn duplicate_error(unit: &Unit, name: &str, span: Span, first_span: Span) -> CompileError {
    CompileError::DuplicateDeclaration {
        name: name.to_string(),
        span: span.into(),
        first_span: first_span.into(),
        src: NamedSource::new(&unit.path, unit.text.to_string()),
    }
}

fn register_type(
    u: usize,
    unit: &Unit,
    table: &mut Table,
    decl_ref: DeclRef,
    contract: Option<DeclRef>,
    errors: &mut Vec<CompileError>,
) {
    let ast = unit.ast.as_ref().expect("unit with declarations");
    let decl = ast.node(decl_ref.node).decl().expect("type declaration");
    let Table {
        unit_types,
        contract_types,
        info,
        ..
    } = table;
    let scope = match contract {
        Some(c) => contract_types.get_mut(&c).expect("collected contract"),
        None => &mut unit_types[u],
    };
    if let Some(first) = scope.get(&decl.name) {
        let first_span = info[first].name_span;
        errors.push(duplicate_error(unit, &decl.name, decl.name_span, first_span));
    } else {
        scope.insert(decl.name.clone(), decl_ref);
    }
}

fn register_value(
    u: usize,
    unit: &Unit,
    table: &mut Table,
    decl_ref: DeclRef,
    contract: Option<DeclRef>,
    overloadable: bool,
    errors: &mut Vec<CompileError>,
) {
    let ast = unit.ast.as_ref().expect("unit with declarations");
    let decl = ast.node(decl_ref.node).decl().expect("value declaration");
    let name = decl.name.clone();
    let name_span = decl.name_span;
    let Table {
        unit_values,
        members,
        info,
        ..
    } = table;
    let scope = match contract {
        Some(c) => members.get_mut(&c).expect("collected contract"),
        None => &mut unit_values[u],
    };
    register_member(unit, scope, decl_ref, name, name_span, overloadable, info, errors);
}

#[allow(clippy::too_many_arguments)]
fn register_member(
    unit: &Unit,
    members: &mut FxHashMap<String, Vec<DeclRef>>,
    decl_ref: DeclRef,
    name: String,
    name_span: Span,
    overloadable: bool,
    info: &FxHashMap<DeclRef, DeclInfo>,
    errors: &mut Vec<CompileError>,
) {
    let entry = members.entry(name.clone()).or_default();
    if !entry.is_empty() && !overloadable {
        let first_span = info[&entry[0]].name_span;
        errors.push(duplicate_error(unit, &name, name_span, first_span));
    }
    entry.push(decl_ref);
}

/// Result of a type-name lookup
enum ResolvedType {
    Decl(DeclRef),
    Builtin(Type),
}

fn lookup_type(
    table: &Table,
    imports: &[usize],
    unit: usize,
    contract: Option<DeclRef>,
    name: &str,
) -> Option<ResolvedType> {
    if let Some(c) = contract {
        if let Some(d) = table.contract_types.get(&c).and_then(|m| m.get(name)) {
            return Some(ResolvedType::Decl(*d));
        }
    }
    if let Some(d) = table.unit_types[unit].get(name) {
        return Some(ResolvedType::Decl(*d));
    }
    for &import in imports {
        if let Some(d) = table.unit_types[import].get(name) {
            return Some(ResolvedType::Decl(*d));
        }
    }
    Type::builtin(name).map(ResolvedType::Builtin)
}

fn denoted_type(table: &Table, decl: DeclRef) -> Type {
    table.info[&decl].ty.clone()
}

/// Resolve a type path purely, without annotating or reporting.
fn type_of_path(
    units: &[Unit],
    imports: &[Vec<usize>],
    table: &Table,
    unit: usize,
    contract: Option<DeclRef>,
    path: NodeId,
) -> Type {
    let ast = units[unit].ast.as_ref().expect("unit with declarations");
    let NodeKind::IdentifierPath { segments, .. } = &ast.node(path).kind else {
        return Type::Unknown;
    };
    resolve_path_segments(table, &imports[unit], unit, contract, segments)
        .map(|(_, ty)| ty)
        .unwrap_or(Type::Unknown)
}

/// Shared path resolution: returns the final declaration (if the path names
/// a user-defined type) and the denoted type.
fn resolve_path_segments(
    table: &Table,
    imports: &[usize],
    unit: usize,
    contract: Option<DeclRef>,
    segments: &[PathSegment],
) -> Option<(Option<DeclRef>, Type)> {
    let first = segments.first()?;
    let mut current = match lookup_type(table, imports, unit, contract, &first.name)? {
        ResolvedType::Decl(d) => (Some(d), denoted_type(table, d)),
        ResolvedType::Builtin(ty) => (None, ty),
    };
    for segment in &segments[1..] {
        let container = current.0?;
        let nested = table
            .contract_types
            .get(&container)
            .and_then(|m| m.get(&segment.name))?;
        current = (Some(*nested), denoted_type(table, *nested));
    }
    Some(current)
}

// === Bind pass ===

struct Walker<'a> {
    ast: &'a mut Ast,
    unit: usize,
    path: String,
    text: String,
    table: &'a Table,
    imports: &'a [usize],
    contract: Option<DeclRef>,
    /// Scope stack for params and locals
    locals: Vec<FxHashMap<String, DeclRef>>,
    local_types: FxHashMap<DeclRef, Type>,
    used: FxHashSet<DeclRef>,
    /// Locals declared in the current function body, for the unused lint
    declared_locals: Vec<DeclRef>,
    errors: &'a mut Vec<CompileError>,
}

impl Walker<'_> {
    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.path, self.text.clone())
    }

    fn walk_unit(&mut self) {
        let items = self.ast.items.clone();
        for item in items {
            self.walk_item(item);
        }
    }

    fn walk_item(&mut self, item: NodeId) {
        match self.ast.node(item).kind.clone() {
            NodeKind::Contract { members, .. } => {
                let previous = self.contract;
                self.contract = Some(DeclRef {
                    unit: self.unit,
                    node: item,
                });
                for member in members {
                    self.walk_item(member);
                }
                self.contract = previous;
            }
            NodeKind::Struct { fields, .. } => {
                for field in fields {
                    let ty = match &self.ast.node(field).kind {
                        NodeKind::Field { ty, .. } => Some(*ty),
                        _ => None,
                    };
                    if let Some(ty) = ty {
                        self.resolve_type_path(ty);
                    }
                }
            }
            NodeKind::Enum { .. } | NodeKind::Import { .. } => {}
            NodeKind::Function {
                params, ret, body, ..
            } => {
                self.locals.push(FxHashMap::default());
                let mark = self.declared_locals.len();
                for param in params {
                    if let NodeKind::Param { decl, ty } = self.ast.node(param).kind.clone() {
                        let param_ty = self.resolve_type_path(ty);
                        let param_ref = DeclRef {
                            unit: self.unit,
                            node: param,
                        };
                        self.declare_local(decl.name, decl.name_span, param_ref, param_ty);
                    }
                }
                if let Some(ret) = ret {
                    self.resolve_type_path(ret);
                }
                self.walk_stmt(body);
                for local in self.declared_locals.split_off(mark) {
                    if !self.used.contains(&local) {
                        let node = self.ast.node(local.node);
                        if let Some(decl) = node.decl() {
                            self.errors.push(CompileError::UnusedVariable {
                                name: decl.name.clone(),
                                span: decl.name_span.into(),
                                src: NamedSource::new(&self.path, self.text.clone()),
                            });
                        }
                    }
                }
                self.locals.pop();
            }
            NodeKind::Variable { ty, init, .. } => {
                let declared = ty.map(|t| self.resolve_type_path(t));
                let init_ty = init.map(|e| self.resolve_expr(e));
                if let (Some(expected), Some(found), Some(init)) = (&declared, &init_ty, init) {
                    self.check_assignable(expected, found, self.ast.node(init).span);
                }
            }
            _ => {}
        }
    }

    fn declare_local(&mut self, name: String, name_span: Span, decl_ref: DeclRef, ty: Type) {
        let first = self
            .locals
            .last()
            .expect("inside a function")
            .get(&name)
            .copied();
        if let Some(first) = first {
            let first_span = self
                .ast
                .node(first.node)
                .decl()
                .map(|d| d.name_span)
                .unwrap_or_default();
            self.errors.push(CompileError::DuplicateDeclaration {
                name: name.clone(),
                span: name_span.into(),
                first_span: first_span.into(),
                src: self.named_source(),
            });
        }
        self.locals
            .last_mut()
            .expect("inside a function")
            .insert(name, decl_ref);
        self.local_types.insert(decl_ref, ty);
    }

    fn decl_type(&self, decl: DeclRef) -> Type {
        if let Some(ty) = self.local_types.get(&decl) {
            return ty.clone();
        }
        self.table
            .info
            .get(&decl)
            .map(|info| info.ty.clone())
            .unwrap_or(Type::Unknown)
    }

    /// Innermost-out value lookup: locals, contract members, unit top
    /// level, then imports.
    fn lookup_value(&self, name: &str) -> Vec<DeclRef> {
        for scope in self.locals.iter().rev() {
            if let Some(d) = scope.get(name) {
                return vec![*d];
            }
        }
        if let Some(c) = self.contract {
            if let Some(found) = self.table.members.get(&c).and_then(|m| m.get(name)) {
                if !found.is_empty() {
                    return found.clone();
                }
            }
        }
        if let Some(found) = self.table.unit_values[self.unit].get(name) {
            if !found.is_empty() {
                return found.clone();
            }
        }
        for &import in self.imports {
            if let Some(found) = self.table.unit_values[import].get(name) {
                if !found.is_empty() {
                    return found.clone();
                }
            }
        }
        Vec::new()
    }

    fn check_assignable(&mut self, expected: &Type, found: &Type, span: Span) {
        if !expected.compatible(found) {
            self.errors.push(CompileError::TypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
                span: span.into(),
                src: self.named_source(),
            });
        }
    }

    /// Resolve and annotate a type-position `IdentifierPath`.
    fn resolve_type_path(&mut self, path: NodeId) -> Type {
        let NodeKind::IdentifierPath { segments, .. } = self.ast.node(path).kind.clone() else {
            return Type::Unknown;
        };
        let resolved =
            resolve_path_segments(self.table, self.imports, self.unit, self.contract, &segments);
        let (referenced, ty) = match resolved {
            Some((referenced, ty)) => (referenced, ty),
            None => {
                let span = self.ast.node(path).span;
                self.errors.push(CompileError::UnknownType {
                    name: segments
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join("."),
                    span: span.into(),
                    src: self.named_source(),
                });
                (None, Type::Unknown)
            }
        };
        if let Some(d) = referenced {
            self.used.insert(d);
        }
        if let NodeKind::IdentifierPath {
            referenced: r, ty: t, ..
        } = &mut self.ast.node_mut(path).kind
        {
            *r = referenced;
            *t = Some(ty.clone());
        }
        ty
    }

    fn walk_stmt(&mut self, stmt: NodeId) {
        match self.ast.node(stmt).kind.clone() {
            NodeKind::Block { stmts } => {
                self.locals.push(FxHashMap::default());
                for s in stmts {
                    self.walk_stmt(s);
                }
                self.locals.pop();
            }
            NodeKind::Variable {
                decl, ty, init, ..
            } => {
                let declared = ty.map(|t| self.resolve_type_path(t));
                let init_ty = init.map(|e| self.resolve_expr(e));
                if let (Some(expected), Some(found), Some(init)) = (&declared, &init_ty, init) {
                    self.check_assignable(expected, found, self.ast.node(init).span);
                }
                let local_ref = DeclRef {
                    unit: self.unit,
                    node: stmt,
                };
                let local_ty = declared.or(init_ty).unwrap_or(Type::Unknown);
                self.declare_local(decl.name, decl.name_span, local_ref, local_ty);
                self.declared_locals.push(local_ref);
            }
            NodeKind::Assign { target, value } => {
                let target_ty = self.resolve_expr(target);
                let value_ty = self.resolve_expr(value);
                self.check_assignable(&target_ty, &value_ty, self.ast.node(value).span);
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            NodeKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.resolve_expr(cond);
                self.walk_stmt(then_block);
                if let Some(else_block) = else_block {
                    self.walk_stmt(else_block);
                }
            }
            NodeKind::ExprStmt { expr } => {
                self.resolve_expr(expr);
            }
            _ => {}
        }
    }

    fn resolve_expr(&mut self, expr: NodeId) -> Type {
        match self.ast.node(expr).kind.clone() {
            NodeKind::Literal { ty, .. } => ty.unwrap_or(Type::Unknown),
            NodeKind::Identifier { name, .. } => {
                let found = self.lookup_value(&name);
                let (referenced, candidates, ty) = if found.is_empty() {
                    // Not a value: a bare type name evaluates to the type
                    // itself (enum member access, `Phase.Open`).
                    match lookup_type(self.table, self.imports, self.unit, self.contract, &name) {
                        Some(ResolvedType::Decl(d)) => (
                            Some(d),
                            Vec::new(),
                            Type::TypeOf(Box::new(denoted_type(self.table, d))),
                        ),
                        Some(ResolvedType::Builtin(ty)) => {
                            (None, Vec::new(), Type::TypeOf(Box::new(ty)))
                        }
                        None => {
                            let span = self.ast.node(expr).span;
                            self.errors.push(CompileError::UndeclaredIdentifier {
                                name: name.clone(),
                                span: span.into(),
                                src: self.named_source(),
                            });
                            (None, Vec::new(), Type::Unknown)
                        }
                    }
                } else {
                    let referenced = found[0];
                    let candidates: Vec<DeclRef> = found[1..].to_vec();
                    let ty = self.decl_type(referenced);
                    (Some(referenced), candidates, ty)
                };
                for d in referenced.iter().chain(candidates.iter()) {
                    self.used.insert(*d);
                }
                if let NodeKind::Identifier {
                    referenced: r,
                    candidates: c,
                    ty: t,
                    ..
                } = &mut self.ast.node_mut(expr).kind
                {
                    *r = referenced;
                    *c = candidates;
                    *t = Some(ty.clone());
                }
                ty
            }
            NodeKind::MemberAccess {
                base,
                member,
                member_span,
                ..
            } => {
                let base_ty = self.resolve_expr(base);
                let (referenced, ty) = self.resolve_member(&base_ty, &member, member_span);
                if let Some(d) = referenced {
                    self.used.insert(d);
                }
                if let NodeKind::MemberAccess {
                    referenced: r,
                    ty: t,
                    ..
                } = &mut self.ast.node_mut(expr).kind
                {
                    *r = referenced;
                    *t = Some(ty.clone());
                }
                ty
            }
            NodeKind::Call { callee, args, .. } => {
                let callee_ty = self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
                let ty = match callee_ty {
                    Type::Function { ret, .. } => ret.map(|r| *r).unwrap_or(Type::Unit),
                    _ => Type::Unknown,
                };
                if let NodeKind::Call { ty: t, .. } = &mut self.ast.node_mut(expr).kind {
                    *t = Some(ty.clone());
                }
                ty
            }
            NodeKind::Binary { op, lhs, rhs, .. } => {
                let lhs_ty = self.resolve_expr(lhs);
                let rhs_ty = self.resolve_expr(rhs);
                let rhs_span = self.ast.node(rhs).span;
                self.check_assignable(&lhs_ty, &rhs_ty, rhs_span);
                let ty = match op {
                    BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                        Type::Bool
                    }
                    _ => {
                        if lhs_ty != Type::Unknown {
                            lhs_ty
                        } else {
                            rhs_ty
                        }
                    }
                };
                if let NodeKind::Binary { ty: t, .. } = &mut self.ast.node_mut(expr).kind {
                    *t = Some(ty.clone());
                }
                ty
            }
            NodeKind::Unary { op, operand, .. } => {
                let operand_ty = self.resolve_expr(operand);
                let ty = match op {
                    UnOp::Not => Type::Bool,
                    UnOp::Neg => operand_ty,
                };
                if let NodeKind::Unary { ty: t, .. } = &mut self.ast.node_mut(expr).kind {
                    *t = Some(ty.clone());
                }
                ty
            }
            _ => Type::Unknown,
        }
    }

    fn resolve_member(
        &mut self,
        base_ty: &Type,
        member: &str,
        member_span: Span,
    ) -> (Option<DeclRef>, Type) {
        let container = match base_ty {
            Type::Struct { decl, .. } | Type::Contract { decl, .. } => Some(*decl),
            Type::TypeOf(inner) => match inner.as_ref() {
                Type::Enum { decl, .. } => Some(*decl),
                Type::Contract { decl, .. } => Some(*decl),
                _ => None,
            },
            Type::Unknown => return (None, Type::Unknown),
            _ => None,
        };
        let found = container
            .and_then(|c| self.table.members.get(&c))
            .and_then(|m| m.get(member))
            .and_then(|v| v.first().copied());
        match found {
            Some(d) => (Some(d), self.decl_type(d)),
            None => {
                self.errors.push(CompileError::UnknownMember {
                    name: member.to_string(),
                    type_name: base_ty.to_string(),
                    span: member_span.into(),
                    src: self.named_source(),
                });
                (None, Type::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeKind;
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

    #[test]
    fn test_duplicate_state_variable() {
        let frontend = analyze("contract C {\n    let x: u256;\n    let x: u256;\n}\n");
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 2101);
        assert_eq!(frontend.errors()[0].related().len(), 1);
    }

    #[test]
    fn test_function_overloads_become_candidates() {
        let source = "contract C {\n    fn f(a: u256) {}\n    fn f(a: u256, b: u256) {}\n    fn g() { f(1); }\n}\n";
        let frontend = analyze(source);
        assert!(frontend.errors().is_empty(), "{:?}", frontend.errors());

        let ast = frontend.ast("/a.sbl").unwrap();
        let identifier = ast
            .nodes
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Identifier {
                    name,
                    referenced,
                    candidates,
                    ..
                } if name == "f" => Some((referenced.is_some(), candidates.len())),
                _ => None,
            })
            .expect("call site identifier");
        assert_eq!(identifier, (true, 1));
    }

    #[test]
    fn test_identifier_binds_innermost_scope() {
        let source =
            "contract C {\n    let v: u256;\n    fn f(v: bool) -> bool { return v; }\n}\n";
        let frontend = analyze(source);
        assert!(frontend.errors().is_empty(), "{:?}", frontend.errors());

        let ast = frontend.ast("/a.sbl").unwrap();
        let ty = ast
            .nodes
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Identifier { name, ty, .. } if name == "v" => ty.clone(),
                _ => None,
            })
            .expect("identifier annotation");
        assert_eq!(ty, crate::types::Type::Bool);
    }

    #[test]
    fn test_unknown_member_on_enum() {
        let frontend =
            analyze("enum Phase { Setup }\nfn f() { let p = Phase.Missing; p; }\n");
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 3101);
    }

    #[test]
    fn test_type_mismatch_on_assignment() {
        let frontend = analyze("contract C {\n    let x: u256;\n    fn f() { x = true; }\n}\n");
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 3201);
    }

    #[test]
    fn test_unknown_type_annotation() {
        let frontend = analyze("contract C {\n    let x: Missing;\n}\n");
        assert_eq!(frontend.errors().len(), 1);
        assert_eq!(frontend.errors()[0].error_code(), 2202);
    }
}
