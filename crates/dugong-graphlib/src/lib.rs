//! Graph container APIs used by `dugong`.

mod graph;

pub use graph::{EdgeKey, Graph, GraphOptions, alg};
