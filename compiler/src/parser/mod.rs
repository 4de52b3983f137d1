//! Parser for the Sable language
//!
//! A recursive descent parser that produces an arena AST from a token
//! stream. There is no error recovery: the first syntax error aborts the
//! unit, which then has no AST.

use crate::ast::*;
use crate::common::{NodeId, Span};
use crate::diagnostics::CompileError;
use crate::lexer::{Token, TokenKind};
use crate::types::Type;
use miette::NamedSource;

/// Parse a token stream into an AST
pub fn parse(path: &str, source: &str, tokens: &[Token]) -> Result<Ast, CompileError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        ast: Ast::new(),
        path,
        source,
    };
    parser.parse_unit()?;
    Ok(parser.ast)
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ast: Ast,
    path: &'a str,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn prev_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.path, self.source.to_string())
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            CompileError::UnexpectedEof {
                expected: expected.to_string(),
                span: token.span.into(),
                src: self.named_source(),
            }
        } else {
            CompileError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.text.clone(),
                span: token.span.into(),
                src: self.named_source(),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    /// Consume consecutive `///` comments into one documentation string.
    fn take_docs(&mut self) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        while self.peek() == TokenKind::DocComment {
            let token = self.advance();
            let line = token.text.trim_start_matches('/').trim();
            lines.push(line.to_string());
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn ident_decl(&mut self, doc: Option<String>) -> Result<(Decl, Span), CompileError> {
        let token = self.expect(TokenKind::Ident)?;
        Ok((
            Decl {
                name: token.text,
                name_span: token.span,
                doc,
            },
            token.span,
        ))
    }

    // === Items ===

    fn parse_unit(&mut self) -> Result<(), CompileError> {
        while self.peek() != TokenKind::Eof {
            let doc = self.take_docs();
            let item = match self.peek() {
                TokenKind::Import => self.parse_import()?,
                TokenKind::Contract => self.parse_contract(doc)?,
                TokenKind::Struct => self.parse_struct(doc)?,
                TokenKind::Enum => self.parse_enum(doc)?,
                TokenKind::Fn => self.parse_function(doc)?,
                TokenKind::Let => self.parse_variable(doc, true)?,
                _ => return Err(self.unexpected("an item")),
            };
            self.ast.items.push(item);
        }
        Ok(())
    }

    fn parse_import(&mut self) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Import)?.span.start;
        let path_token = self.expect(TokenKind::StringLit)?;
        self.expect(TokenKind::Semi)?;
        let path = path_token.text.trim_matches('"').to_string();
        Ok(self.ast.add(
            NodeKind::Import {
                path,
                path_span: path_token.span,
                resolved: None,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_contract(&mut self, doc: Option<String>) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Contract)?.span.start;
        let (decl, _) = self.ident_decl(doc)?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while self.peek() != TokenKind::RBrace {
            let member_doc = self.take_docs();
            let member = match self.peek() {
                TokenKind::Fn => self.parse_function(member_doc)?,
                TokenKind::Let => self.parse_variable(member_doc, true)?,
                TokenKind::Struct => self.parse_struct(member_doc)?,
                TokenKind::Enum => self.parse_enum(member_doc)?,
                _ => return Err(self.unexpected("a contract member")),
            };
            members.push(member);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.add(
            NodeKind::Contract { decl, members },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_struct(&mut self, doc: Option<String>) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Struct)?.span.start;
        let (decl, _) = self.ident_decl(doc)?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.peek() != TokenKind::RBrace {
            let field_doc = self.take_docs();
            let (field_decl, name_span) = self.ident_decl(field_doc)?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let field = self.ast.add(
                NodeKind::Field {
                    decl: field_decl,
                    ty,
                },
                Span::new(name_span.start, self.prev_end()),
            );
            fields.push(field);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.add(
            NodeKind::Struct { decl, fields },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_enum(&mut self, doc: Option<String>) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Enum)?.span.start;
        let (decl, _) = self.ident_decl(doc)?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while self.peek() != TokenKind::RBrace {
            let member_doc = self.take_docs();
            let (member_decl, name_span) = self.ident_decl(member_doc)?;
            let member = self
                .ast
                .add(NodeKind::EnumMember { decl: member_decl }, name_span);
            members.push(member);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.add(
            NodeKind::Enum { decl, members },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_function(&mut self, doc: Option<String>) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Fn)?.span.start;
        let (decl, _) = self.ident_decl(doc)?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while self.peek() != TokenKind::RParen {
            let (param_decl, name_span) = self.ident_decl(None)?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let param = self.ast.add(
                NodeKind::Param {
                    decl: param_decl,
                    ty,
                },
                Span::new(name_span.start, self.prev_end()),
            );
            params.push(param);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let ret = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(self.ast.add(
            NodeKind::Function {
                decl,
                params,
                ret,
                body,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_variable(
        &mut self,
        doc: Option<String>,
        state: bool,
    ) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::Let)?.span.start;
        let (decl, _) = self.ident_decl(doc)?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(self.ast.add(
            NodeKind::Variable {
                decl,
                ty,
                init,
                state,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    /// Dotted name in type position.
    fn parse_type(&mut self) -> Result<NodeId, CompileError> {
        let first = self.expect(TokenKind::Ident)?;
        let start = first.span.start;
        let mut segments = vec![PathSegment {
            name: first.text,
            span: first.span,
        }];
        while self.eat(TokenKind::Dot) {
            let segment = self.expect(TokenKind::Ident)?;
            segments.push(PathSegment {
                name: segment.text,
                span: segment.span,
            });
        }
        Ok(self.ast.add(
            NodeKind::IdentifierPath {
                segments,
                referenced: None,
                ty: None,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    // === Statements ===

    fn parse_block(&mut self) -> Result<NodeId, CompileError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut stmts = Vec::new();
        while self.peek() != TokenKind::RBrace {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self
            .ast
            .add(NodeKind::Block { stmts }, Span::new(start, self.prev_end())))
    }

    fn parse_stmt(&mut self) -> Result<NodeId, CompileError> {
        match self.peek() {
            TokenKind::Let => self.parse_variable(None, false),
            TokenKind::Return => {
                let start = self.advance().span.start;
                let value = if self.peek() != TokenKind::Semi {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semi)?;
                Ok(self
                    .ast
                    .add(NodeKind::Return { value }, Span::new(start, self.prev_end())))
            }
            TokenKind::If => {
                let start = self.advance().span.start;
                let cond = self.parse_expr()?;
                let then_block = self.parse_block()?;
                let else_block = if self.eat(TokenKind::Else) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                Ok(self.ast.add(
                    NodeKind::If {
                        cond,
                        then_block,
                        else_block,
                    },
                    Span::new(start, self.prev_end()),
                ))
            }
            _ => {
                let expr = self.parse_expr()?;
                let start = self.ast.node(expr).span.start;
                if self.eat(TokenKind::Eq) {
                    self.mark_lvalue(expr)?;
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::Semi)?;
                    Ok(self.ast.add(
                        NodeKind::Assign {
                            target: expr,
                            value,
                        },
                        Span::new(start, self.prev_end()),
                    ))
                } else {
                    self.expect(TokenKind::Semi)?;
                    Ok(self
                        .ast
                        .add(NodeKind::ExprStmt { expr }, Span::new(start, self.prev_end())))
                }
            }
        }
    }

    fn mark_lvalue(&mut self, target: NodeId) -> Result<(), CompileError> {
        let span = self.ast.node(target).span;
        match &mut self.ast.node_mut(target).kind {
            NodeKind::Identifier { lvalue, .. } | NodeKind::MemberAccess { lvalue, .. } => {
                *lvalue = true;
                Ok(())
            }
            _ => Err(CompileError::InvalidAssignment {
                span: span.into(),
                src: self.named_source(),
            }),
        }
    }

    // === Expressions ===

    fn parse_expr(&mut self) -> Result<NodeId, CompileError> {
        self.parse_equality()
    }

    fn binary(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let span = self.ast.node(lhs).span.merge(self.ast.node(rhs).span);
        self.ast.add(
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                ty: None,
            },
            span,
        )
    }

    fn parse_equality(&mut self) -> Result<NodeId, CompileError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<NodeId, CompileError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<NodeId, CompileError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<NodeId, CompileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, CompileError> {
        let op = match self.peek() {
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Minus => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span.start;
            let operand = self.parse_unary()?;
            return Ok(self.ast.add(
                NodeKind::Unary {
                    op,
                    operand,
                    ty: None,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let member = self.expect(TokenKind::Ident)?;
                let start = self.ast.node(expr).span.start;
                expr = self.ast.add(
                    NodeKind::MemberAccess {
                        base: expr,
                        member: member.text,
                        member_span: member.span,
                        referenced: None,
                        ty: None,
                        lvalue: false,
                    },
                    Span::new(start, member.span.end),
                );
            } else if self.eat(TokenKind::LParen) {
                let mut args = Vec::new();
                while self.peek() != TokenKind::RParen {
                    args.push(self.parse_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                let start = self.ast.node(expr).span.start;
                expr = self.ast.add(
                    NodeKind::Call {
                        callee: expr,
                        args,
                        ty: None,
                    },
                    Span::new(start, self.prev_end()),
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<NodeId, CompileError> {
        match self.peek() {
            TokenKind::Ident => {
                let token = self.advance();
                Ok(self.ast.add(
                    NodeKind::Identifier {
                        name: token.text,
                        referenced: None,
                        candidates: Vec::new(),
                        ty: None,
                        lvalue: false,
                    },
                    token.span,
                ))
            }
            TokenKind::IntLit => {
                let token = self.advance();
                Ok(self.ast.add(
                    NodeKind::Literal {
                        value: LiteralValue::Int(token.text),
                        ty: Some(Type::U256),
                    },
                    token.span,
                ))
            }
            TokenKind::StringLit => {
                let token = self.advance();
                Ok(self.ast.add(
                    NodeKind::Literal {
                        value: LiteralValue::Str(token.text.trim_matches('"').to_string()),
                        ty: Some(Type::Str),
                    },
                    token.span,
                ))
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                Ok(self.ast.add(
                    NodeKind::Literal {
                        value: LiteralValue::Bool(token.kind == TokenKind::True),
                        ty: Some(Type::Bool),
                    },
                    token.span,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_ok(source: &str) -> Ast {
        let tokens = lex("/t.sbl", source).unwrap();
        parse("/t.sbl", source, &tokens).unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        let tokens = lex("/t.sbl", source).unwrap();
        parse("/t.sbl", source, &tokens).unwrap_err()
    }

    #[test]
    fn test_parse_contract() {
        let ast = parse_ok(
            "contract Vault {\n    let total: u256;\n    fn deposit(amount: u256) -> u256 {\n        total = total + amount;\n        return total;\n    }\n}\n",
        );
        assert_eq!(ast.items.len(), 1);
        match &ast.node(ast.items[0]).kind {
            NodeKind::Contract { decl, members } => {
                assert_eq!(decl.name, "Vault");
                assert_eq!(members.len(), 2);
            }
            other => panic!("expected contract, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_enum_and_member_access() {
        let ast = parse_ok("enum Phase { Setup, Open }\nfn f() { let p = Phase.Open; }\n");
        let member_access = ast
            .nodes
            .iter()
            .find(|n| matches!(n.kind, NodeKind::MemberAccess { .. }))
            .expect("member access node");
        match &member_access.kind {
            NodeKind::MemberAccess { member, .. } => assert_eq!(member, "Open"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_import() {
        let ast = parse_ok("import \"lib.sbl\";\n");
        match &ast.node(ast.items[0]).kind {
            NodeKind::Import { path, resolved, .. } => {
                assert_eq!(path, "lib.sbl");
                assert!(resolved.is_none());
            }
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn test_doc_comments_attach_to_declarations() {
        let ast = parse_ok("/// The vault balance.\nlet total: u256;\n");
        let decl = ast.node(ast.items[0]).decl().unwrap();
        assert_eq!(decl.doc.as_deref(), Some("The vault balance."));
    }

    #[test]
    fn test_assignment_marks_lvalue() {
        let ast = parse_ok("fn f(x: u256) { x = x + 1; }\n");
        let lvalues: Vec<_> = ast
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Identifier { lvalue: true, .. }))
            .collect();
        assert_eq!(lvalues.len(), 1);
    }

    #[test]
    fn test_name_span_is_recorded() {
        let source = "let total: u256;\n";
        let ast = parse_ok(source);
        let decl = ast.node(ast.items[0]).decl().unwrap();
        assert_eq!(&source[decl.name_span.start..decl.name_span.end], "total");
    }

    #[test]
    fn test_children_precede_parents() {
        let ast = parse_ok("fn f(a: u256, b: u256) -> u256 { return a + b; }\n");
        for node in &ast.nodes {
            if let NodeKind::Binary { lhs, rhs, .. } = &node.kind {
                assert!(lhs.index() < node.id.index());
                assert!(rhs.index() < node.id.index());
            }
        }
    }

    #[test]
    fn test_syntax_error_has_no_recovery() {
        let err = parse_err("contract Broken {\n");
        assert_eq!(err.error_code(), 1202);

        let err = parse_err("let = 3;\n");
        assert_eq!(err.error_code(), 1201);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("fn f() { 1 = 2; }\n");
        assert_eq!(err.error_code(), 1301);
    }
}
