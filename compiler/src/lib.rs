//! Sable Smart-Contract Language Compiler
//!
//! The frontend for the Sable language: lexer, parser, name resolution,
//! and the language server that drives them from an IDE.
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → Arena AST → Resolver (annotations + types)
//!                                          ↑
//!                    LSP server ── Frontend (per-compile driver)
//! ```
//!
//! # Example
//!
//! ```sable
//! contract Vault {
//!     let total: u256;
//!
//!     fn deposit(amount: u256) -> u256 {
//!         total = total + amount;
//!         return total;
//!     }
//! }
//! ```

pub mod ast;
pub mod common;
pub mod diagnostics;
pub mod frontend;
pub mod lexer;
pub mod lsp;
pub mod parser;
pub mod resolve;
pub mod types;

pub use diagnostics::CompileError;
pub use frontend::{Analysis, AnalysisLevel, Frontend};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a single source buffer to an AST
pub fn parse(path: &str, source: &str) -> Result<ast::Ast, CompileError> {
    let tokens = lexer::lex(path, source)?;
    parser::parse(path, source, &tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_parse_helper() {
        assert!(parse("/t.sbl", "contract C {}").is_ok());
        assert!(parse("/t.sbl", "contract {").is_err());
    }
}
