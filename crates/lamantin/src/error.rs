use crate::graph::{EdgeId, NodeId, SubgraphId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("unknown node handle #{}", .0.index())]
    UnknownNode(NodeId),

    #[error("unknown edge handle #{}", .0.index())]
    UnknownEdge(EdgeId),

    #[error("unknown graph handle #{}", .0.index())]
    UnknownGraph(SubgraphId),

    #[error("graph #{} is a subgraph, layout must start at a root graph", .0.index())]
    NotARoot(SubgraphId),

    #[error("node `{node}` belongs to another root graph")]
    ForeignNode { node: String },

    #[error("invalid value `{value}` for attribute `{name}`")]
    InvalidAttribute { name: String, value: String },
}
