//! Abstract Syntax Tree for the Sable language
//!
//! Each source unit owns an arena of nodes (`Ast`); a [`NodeId`] is an index
//! into that arena. The parser pushes nodes bottom-up, so children always
//! precede their parents in the arena. Name resolution fills in the
//! annotation fields (`referenced`, `candidates`, `ty`) after parsing.

use crate::common::{NodeId, Span};
use crate::types::Type;

/// Reference to a declaration node, possibly in another source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    /// Index of the source unit in the analysis
    pub unit: usize,
    /// Arena index of the declaration node within that unit
    pub node: NodeId,
}

/// AST arena for one source unit
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub nodes: Vec<Node>,
    /// Top-level items in source order
    pub items: Vec<NodeId>,
}

/// A single AST node
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub span: Span,
    pub kind: NodeKind,
}

/// Data shared by every declaration variant
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    /// Span of the declared name itself
    pub name_span: Span,
    /// `///` documentation, if any
    pub doc: Option<String>,
}

/// One segment of a dotted path
#[derive(Debug, Clone)]
pub struct PathSegment {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone)]
pub enum LiteralValue {
    Int(String),
    Str(String),
    Bool(bool),
}

/// Tagged node variant; query handlers dispatch on this
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// `import "path";`
    Import {
        path: String,
        path_span: Span,
        /// Canonical source key the import resolved to, set by the frontend
        resolved: Option<String>,
    },
    Contract {
        decl: Decl,
        members: Vec<NodeId>,
    },
    Struct {
        decl: Decl,
        fields: Vec<NodeId>,
    },
    Field {
        decl: Decl,
        ty: NodeId,
    },
    Enum {
        decl: Decl,
        members: Vec<NodeId>,
    },
    EnumMember {
        decl: Decl,
    },
    /// State variable (`state: true`) or local `let` binding
    Variable {
        decl: Decl,
        ty: Option<NodeId>,
        init: Option<NodeId>,
        state: bool,
    },
    Param {
        decl: Decl,
        ty: NodeId,
    },
    Function {
        decl: Decl,
        params: Vec<NodeId>,
        ret: Option<NodeId>,
        body: NodeId,
    },

    /// Dotted name in type position, e.g. `Phase` or `Registry.Entry`
    IdentifierPath {
        segments: Vec<PathSegment>,
        referenced: Option<DeclRef>,
        ty: Option<Type>,
    },

    // === Expressions ===
    Identifier {
        name: String,
        referenced: Option<DeclRef>,
        candidates: Vec<DeclRef>,
        ty: Option<Type>,
        lvalue: bool,
    },
    MemberAccess {
        base: NodeId,
        member: String,
        member_span: Span,
        referenced: Option<DeclRef>,
        ty: Option<Type>,
        lvalue: bool,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
        ty: Option<Type>,
    },
    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
        ty: Option<Type>,
    },
    Unary {
        op: UnOp,
        operand: NodeId,
        ty: Option<Type>,
    },
    Literal {
        value: LiteralValue,
        ty: Option<Type>,
    },

    // === Statements ===
    Block {
        stmts: Vec<NodeId>,
    },
    Assign {
        target: NodeId,
        value: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    If {
        cond: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node to the arena and return its id.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { id, span, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Innermost node whose span contains `offset`.
    ///
    /// The arena is built bottom-up, so scanning in arena order and keeping
    /// the first smallest match prefers children over parents on ties.
    pub fn locate(&self, offset: usize) -> Option<NodeId> {
        let mut best: Option<(usize, NodeId)> = None;
        for node in &self.nodes {
            if !node.span.contains(offset) {
                continue;
            }
            let len = node.span.len();
            match best {
                Some((best_len, _)) if best_len <= len => {}
                _ => best = Some((len, node.id)),
            }
        }
        best.map(|(_, id)| id)
    }
}

impl Node {
    /// Declaration data, for the variants that introduce a named entity.
    pub fn decl(&self) -> Option<&Decl> {
        match &self.kind {
            NodeKind::Contract { decl, .. }
            | NodeKind::Struct { decl, .. }
            | NodeKind::Field { decl, .. }
            | NodeKind::Enum { decl, .. }
            | NodeKind::EnumMember { decl }
            | NodeKind::Variable { decl, .. }
            | NodeKind::Param { decl, .. }
            | NodeKind::Function { decl, .. } => Some(decl),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.decl().is_some()
    }

    /// For an `Identifier`: the referenced declaration plus any candidates.
    pub fn annotated_declarations(&self) -> Vec<DeclRef> {
        match &self.kind {
            NodeKind::Identifier {
                referenced,
                candidates,
                ..
            } => referenced
                .iter()
                .copied()
                .chain(candidates.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Expression type annotation, if analysis assigned one.
    pub fn ty(&self) -> Option<&Type> {
        match &self.kind {
            NodeKind::Identifier { ty, .. }
            | NodeKind::IdentifierPath { ty, .. }
            | NodeKind::MemberAccess { ty, .. }
            | NodeKind::Call { ty, .. }
            | NodeKind::Binary { ty, .. }
            | NodeKind::Unary { ty, .. }
            | NodeKind::Literal { ty, .. } => ty.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> NodeKind {
        NodeKind::Identifier {
            name: name.into(),
            referenced: None,
            candidates: Vec::new(),
            ty: None,
            lvalue: false,
        }
    }

    #[test]
    fn test_locate_innermost() {
        let mut ast = Ast::new();
        // `a + b` — identifiers at 0..1 and 4..5, the binary node spans 0..5
        let a = ast.add(ident("a"), Span::new(0, 1));
        let b = ast.add(ident("b"), Span::new(4, 5));
        let bin = ast.add(
            NodeKind::Binary {
                op: BinOp::Add,
                lhs: a,
                rhs: b,
                ty: None,
            },
            Span::new(0, 5),
        );

        assert_eq!(ast.locate(0), Some(a));
        assert_eq!(ast.locate(4), Some(b));
        assert_eq!(ast.locate(2), Some(bin));
        assert_eq!(ast.locate(5), None);
    }

    #[test]
    fn test_locate_prefers_children_on_ties() {
        let mut ast = Ast::new();
        let inner = ast.add(ident("x"), Span::new(0, 3));
        let _outer = ast.add(
            NodeKind::ExprStmt { expr: inner },
            Span::new(0, 3),
        );
        assert_eq!(ast.locate(1), Some(inner));
    }

    #[test]
    fn test_annotated_declarations_order() {
        let referenced = DeclRef {
            unit: 0,
            node: NodeId(7),
        };
        let candidate = DeclRef {
            unit: 0,
            node: NodeId(9),
        };
        let mut ast = Ast::new();
        let id = ast.add(ident("f"), Span::new(0, 1));
        match &mut ast.node_mut(id).kind {
            NodeKind::Identifier {
                referenced: r,
                candidates,
                ..
            } => {
                *r = Some(referenced);
                candidates.push(candidate);
            }
            _ => unreachable!(),
        }
        assert_eq!(
            ast.node(id).annotated_declarations(),
            vec![referenced, candidate]
        );
    }
}
