//! Language Server Protocol implementation for Sable
//!
//! A synchronous LSP server over framed JSON-RPC:
//!
//! - `transport` / `rpc` - Content-Length framing and the JSON-RPC envelope
//! - `document` - the open-buffer store backing the compiler's file reader
//! - `server` - the read-dispatch loop and lifecycle state machine
//! - `definition`, `references`, `highlight`, `hover` - symbol queries over
//!   the analyzed AST
//!
//! Every request runs to completion before the next is read; the compiler
//! frontend is rebuilt per change, and handlers derive plain locations
//! before returning so nothing borrows a stale AST across messages.

pub mod definition;
pub mod diagnostics;
pub mod document;
pub mod highlight;
pub mod hover;
pub mod protocol;
pub mod references;
pub mod rpc;
pub mod server;
pub mod transport;


pub use server::LanguageServer;
pub use transport::{BufferTransport, IoTransport, Transport};
