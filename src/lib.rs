//! A recursive-descent PEG parser-combinator engine with a declarative
//! tree-transformation layer.
//!
//! A grammar is assembled from a small closed set of combinators with
//! [`parser::GrammarBuilder`], [`parser::GrammarBuilder::freeze`]s into an
//! immutable, shareable [`parser::Grammar`], and [`driver::Driver`] walks it
//! against input text to produce a concrete syntax tree ([`node::RootNode`]).
//! [`transform::TransformTable`] then rewrites that tree into an abstract
//! syntax tree through a name-keyed table of declarative operators, and
//! [`pipeline::Pipeline`]/[`pipeline::JunctionPipeline`] wire parse and
//! transform (and a final compile step) into one `Result`-returning call.
//!
//! ```
//! use treeforge::parser::GrammarBuilder;
//! use treeforge::driver::Driver;
//! use treeforge::Code;
//!
//! let b = GrammarBuilder::new();
//! let digits = b.regex(r"[0-9]+").unwrap();
//! b.symbol(digits, "NUMBER").unwrap();
//! let grammar = b.freeze(digits).unwrap();
//!
//! let code = Code::new("42".to_string());
//! let root = Driver::new(&grammar, &code).parse();
//! assert!(root.errors.is_empty());
//! ```
//!
//! # License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at
//! your option.

mod config;
mod error;
mod node;
mod position;
mod sexpr;
mod slice;

pub mod driver;
pub mod parser;
pub mod pipeline;
pub mod rpc;
pub mod transform;

pub use config::EngineConfig;
pub use error::{EngineError, ImplementationError, ParseErrorEntry, Severity};
pub use node::{Content, Node, RootNode, SxprStyle};
pub use position::Position;
pub use sexpr::parse_sxpr;
pub use slice::{Code, Slice};
