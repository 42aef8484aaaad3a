//! Command model and chain parsing.
//!
//! The approval engine never sees raw shell text. Callers either build a
//! [`CommandChain`] directly or run text through [`parse_chain`], which
//! rejects anything the engine cannot reason about.

mod model;
mod parser;

pub use model::{ChainOperator, CommandChain, CommandSegment};
pub use parser::{parse_chain, ParseError};
