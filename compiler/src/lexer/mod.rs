//! Lexer for the Sable language
//!
//! Tokenizes source code into a stream of tokens using the Logos library.

pub mod tokens;

pub use tokens::{Token, TokenKind};

use crate::common::Span;
use crate::diagnostics::CompileError;
use logos::Logos;
use miette::NamedSource;

/// Lex source code into tokens
pub fn lex(path: &str, source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(kind) => kind,
            Err(_) => {
                return Err(CompileError::InvalidCharacter {
                    found: source[span.clone()].to_string(),
                    span: Span::new(span.start, span.end).into(),
                    src: NamedSource::new(path, source.to_string()),
                });
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(span.start, span.end),
            text: source[span].to_string(),
        });
    }

    // Add EOF token
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
        text: String::new(),
    });

    Ok(tokens)
}
