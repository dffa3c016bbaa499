//! trytuple-core: syntax front end for the tuple-destructuring checker.
//!
//! Parses the TypeScript/JavaScript subset the checker reasons about into
//! an arena [`SyntaxTree`] whose nodes carry byte spans and parent links.
//!
//! # Public API
//!
//! - [`parse()`] -- lex and parse one file
//! - [`SyntaxTree`], [`NodeId`], [`NodeKind`], [`Span`] -- the tree
//! - [`ParseError`] -- lex/parse failure with location
//! - [`SourceProvider`] -- file access for hosts

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod source;

pub use ast::{DeclarationKind, Node, NodeId, NodeKind, Span, SyntaxTree};
pub use error::ParseError;
pub use parser::parse;
pub use source::{FileSystemProvider, SourceProvider};
