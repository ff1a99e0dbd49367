use crate::line_graph::{SourceEdgeId, SourceNodeId};
use crate::route_registry::RouteId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopoError {
    /// Malformed source data, rejected before any rewrite runs.
    #[error("invalid topology at source edge {edge}: {kind}")]
    InvalidTopology {
        edge: SourceEdgeId,
        kind: InvalidTopologyKind,
    },
    #[error("untangling did not converge within {cap} passes (potential still {potential})")]
    NonConvergentRewrite { cap: usize, potential: usize },
    /// Internal defect. The graph must not be handed downstream after this.
    #[error("optimization graph invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTopologyKind {
    #[error("edge connects node {0} to itself")]
    SelfLoop(SourceNodeId),
    #[error("edge carries no route occurrences")]
    NoRoutes,
    #[error("route {0} occurs more than once on the edge")]
    DuplicateRoute(RouteId),
    #[error("route {route} is directed towards node {node}, which is not an endpoint")]
    ForeignDirection { route: RouteId, node: SourceNodeId },
    #[error("endpoint {0} does not exist")]
    UnknownNode(SourceNodeId),
    #[error("leaves node {node} at exactly the same bearing as edge {other}")]
    CoincidentFronts {
        node: SourceNodeId,
        other: SourceEdgeId,
    },
}

pub(crate) fn invariant(msg: impl Into<String>) -> TopoError {
    TopoError::InvariantViolation(msg.into())
}
