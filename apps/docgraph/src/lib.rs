//! # docgraph
//!
//! Operator CLI over `docgraph-core`. The binary only parses arguments,
//! sets up logging and prints what the commands return.

pub mod cli;
