use super::graph::{OptGraph, OptNodeId};
use crate::route_registry::RouteId;
use ahash::AHashSet;
use serde::Serialize;

/// Numbers the layout-penalty model reads off a finished graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptGraphStats {
    pub num_nodes: usize,
    pub num_topo_nodes: usize,
    pub num_terminal_nodes: usize,
    pub num_edges: usize,
    pub num_routes: usize,
    pub max_cardinality: usize,
    pub max_cross_pen: f64,
    pub max_split_pen: f64,
    pub route_occurrences: usize,
}

impl<'a> OptGraph<'a> {
    /// Topological nodes (degree other than 1) when `topo`, terminals otherwise.
    pub fn num_nodes_by_kind(&self, topo: bool) -> usize {
        self.node_ids()
            .filter(|&n| (self.nd(n).get_deg() != 1) == topo)
            .count()
    }

    pub fn num_routes(&self) -> usize {
        self.edge_ids()
            .flat_map(|e| self.edg(e).partial_routes.iter().map(|r| r.route))
            .collect::<AHashSet<RouteId>>()
            .len()
    }

    pub fn max_cardinality(&self) -> usize {
        self.edge_ids()
            .map(|e| self.edg(e).cardinality())
            .max()
            .unwrap_or(0)
    }

    fn node_weight(&self, n: OptNodeId) -> f64 {
        if self.config.penalties.degree_weighted {
            self.nd(n).get_deg() as f64
        } else {
            1.0
        }
    }

    fn node_max_cardinality(&self, n: OptNodeId) -> f64 {
        self.nd(n)
            .adj_list
            .iter()
            .map(|&e| self.edg(e).cardinality())
            .max()
            .unwrap_or(0) as f64
    }

    /// Upper bound of the crossing penalty at any single node.
    pub fn max_cross_pen(&self) -> f64 {
        let p = &self.config.penalties;
        let per_crossing = p.same_seg_cross_pen.max(p.diff_seg_cross_pen);
        self.node_ids()
            .map(|n| {
                let m = self.node_max_cardinality(n);
                self.node_weight(n) * per_crossing * m * m
            })
            .fold(0.0, f64::max)
    }

    /// Upper bound of the splitting penalty at any single node.
    pub fn max_split_pen(&self) -> f64 {
        let split_pen = self.config.penalties.split_pen;
        self.node_ids()
            .map(|n| self.node_weight(n) * split_pen * self.node_max_cardinality(n))
            .fold(0.0, f64::max)
    }

    pub fn stats(&self) -> OptGraphStats {
        OptGraphStats {
            num_nodes: self.num_nodes(),
            num_topo_nodes: self.num_nodes_by_kind(true),
            num_terminal_nodes: self.num_nodes_by_kind(false),
            num_edges: self.num_edges(),
            num_routes: self.num_routes(),
            max_cardinality: self.max_cardinality(),
            max_cross_pen: self.max_cross_pen(),
            max_split_pen: self.max_split_pen(),
            route_occurrences: self.route_occurrence_count(),
        }
    }
}
