//! Name resolution for the Sable language
//!
//! Binds identifiers, member accesses, and type paths to their
//! declarations and annotates expressions with types.

pub mod resolver;

pub use resolver::resolve;
