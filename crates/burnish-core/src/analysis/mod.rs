//! Structured control-flow analysis: the lexical block tree, the reduced
//! CFG, and the generic dataflow driver.

pub mod block;
pub mod cfg;

pub use block::{build as build_blocks, Block, BlockId, BlockTree};
pub use cfg::{build as build_cfg, Computation, Graph};
