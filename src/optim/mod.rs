//! Topology optimization: builds the reduced optimization graph from a line
//! graph, simplifies it, untangles junctions, splits mixed edges and keeps a
//! clockwise edge order at every node.
mod builder;
mod continuation;
mod edge_order;
mod graph;
mod rewrite;
mod simplify;
mod split;
mod stats;
mod untangle;

#[cfg(test)]
mod test_fixtures;
#[cfg(test)]
mod test_scenarios;

pub use graph::{
    EtgPart, OptEdge, OptEdgeId, OptGraph, OptNode, OptNodeId, OptRouteOcc, RouteDirection,
};
pub use stats::OptGraphStats;
pub use untangle::{UntangleReport, UntangleRule};

use crate::config::OptimConfig;
use crate::error::{TopoError, invariant};
use crate::line_graph::LineGraph;
use log::info;
use std::cmp::Ordering;

impl<'a> OptGraph<'a> {
    /// Full pipeline: build, simplify, then untangle and split until neither
    /// changes the graph, refresh edge order. Split rounds share the untangle
    /// pass budget.
    pub fn optimize(source: &'a LineGraph, config: OptimConfig) -> Result<Self, TopoError> {
        let cap = config.max_untangle_passes;
        let mut g = OptGraph::build(source, config)?;
        g.simplify()?;

        let mut passes = 0;
        let mut rounds = 0;
        loop {
            let report = g.untangle_within(cap.saturating_sub(passes))?;
            passes += report.passes;
            rounds += 1;
            if g.split()? == 0 {
                break;
            }
            passes += 1;
        }
        g.write_edge_order()?;
        g.check_invariants()?;

        let stats = g.stats();
        info!(
            "Optimization graph ready after {} untangle passes in {} rounds: {} nodes ({} topological), {} edges, {} routes, max cardinality {}",
            passes,
            rounds,
            stats.num_nodes,
            stats.num_topo_nodes,
            stats.num_edges,
            stats.num_routes,
            stats.max_cardinality
        );
        Ok(g)
    }

    /// Structural, cardinality, order-slot and edge-order checks over the whole graph.
    pub fn check_invariants(&self) -> Result<(), TopoError> {
        self.check_structure()?;
        self.check_cardinality()?;

        for n in self.node_ids() {
            let node = self.nd(n);
            let mut adj = node.adj_list.clone();
            let mut ordered = node.ordered_edges.clone();
            adj.sort_unstable();
            ordered.sort_unstable();
            if adj != ordered {
                return Err(invariant(format!(
                    "edge order of node {n} is not a permutation of its incident edges"
                )));
            }
            for pair in node.ordered_edges.windows(2) {
                if self.cmp_edges_at(n, pair[0], pair[1]) != Ordering::Less {
                    return Err(invariant(format!(
                        "edges {} and {} are out of order at node {n}",
                        pair[0], pair[1]
                    )));
                }
            }
        }
        Ok(())
    }
}
