//! Clockwise ordering of the edges around each node.
//!
//! Edges are keyed by the bearing of the source node front they leave through,
//! normalized so that noon maps to zero and a descending sort walks clockwise.
//! Edges leaving through the same source edge are told apart by their order
//! slot.
use super::graph::{OptEdgeId, OptGraph, OptNodeId};
use crate::error::{TopoError, invariant};
use crate::geometry_utils::{angle_between, normalize_bearing};
use crate::line_graph::SourceEdgeId;
use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeKey {
    bearing: Reverse<OrderedFloat<f64>>,
    etg: SourceEdgeId,
    rank: i64,
}

impl<'a> OptGraph<'a> {
    /// Normalized bearing of `e` when leaving `n`.
    pub fn edge_bearing(&self, e: OptEdgeId, n: OptNodeId) -> f64 {
        let edge = self.edg(e);
        let part = edge.adj_etg_part(n);
        let src_node = self.source_junction(e, n);

        let angle = match self.source.front_for(src_node, part.etg) {
            Some(front) => front.out_angle,
            None => angle_between(self.nd(n).pos, self.nd(edge.other_nd(n)).pos),
        };
        normalize_bearing(angle)
    }

    fn edge_key(&self, e: OptEdgeId, n: OptNodeId) -> EdgeKey {
        let part = self.edg(e).adj_etg_part(n);
        let order = part.order as i64;
        EdgeKey {
            bearing: Reverse(OrderedFloat(self.edge_bearing(e, n))),
            etg: part.etg,
            rank: if self.departs_forward(e, n) {
                order
            } else {
                -order
            },
        }
    }

    /// Clockwise comparison of two edges at `n`.
    pub fn cmp_edges_at(&self, n: OptNodeId, a: OptEdgeId, b: OptEdgeId) -> Ordering {
        self.edge_key(a, n).cmp(&self.edge_key(b, n))
    }

    pub fn update_edge_order(&mut self, n: OptNodeId) -> Result<(), TopoError> {
        let mut keyed: Vec<(EdgeKey, OptEdgeId)> = self
            .nd(n)
            .adj_list
            .iter()
            .map(|&e| (self.edge_key(e, n), e))
            .collect();
        keyed.sort();

        for pair in keyed.windows(2) {
            let (ka, ea) = pair[0];
            let (kb, eb) = pair[1];
            if ka.bearing == kb.bearing && ka.etg != kb.etg {
                return Err(invariant(format!(
                    "edges {ea} and {eb} leave node {n} at the same bearing through different source edges"
                )));
            }
            if ka.etg == kb.etg && ka.rank == kb.rank {
                return Err(invariant(format!(
                    "edges {ea} and {eb} share order slot {} of source edge {} at node {n}",
                    ka.rank, ka.etg
                )));
            }
        }

        self.nodes[n.idx()].ordered_edges = keyed.into_iter().map(|(_, e)| e).collect();
        Ok(())
    }

    pub fn write_edge_order(&mut self) -> Result<(), TopoError> {
        let ids: Vec<OptNodeId> = self.node_ids().collect();
        for n in ids {
            self.update_edge_order(n)?;
        }
        Ok(())
    }

    /// Edges at `n` following `noon` in clockwise order. When walking along
    /// `noon` towards `n` this lists them left to right.
    pub fn clockwise_edges(&self, noon: OptEdgeId, n: OptNodeId) -> Vec<OptEdgeId> {
        let ordered = &self.nd(n).ordered_edges;
        match ordered.iter().position(|&e| e == noon) {
            Some(pos) => ordered[pos + 1..]
                .iter()
                .chain(ordered[..pos].iter())
                .copied()
                .collect(),
            None => ordered.clone(),
        }
    }

    /// Like `clockwise_edges`, restricted to edges receiving a route of `noon`.
    pub fn partial_clockwise_edges(&self, noon: OptEdgeId, n: OptNodeId) -> Vec<OptEdgeId> {
        let receiving = self.receiving_edges(noon, n);
        self.clockwise_edges(noon, n)
            .into_iter()
            .filter(|e| receiving.contains(e))
            .collect()
    }

    /// Position of `e` in the clockwise walk starting after `noon`.
    pub(crate) fn clockwise_pos(&self, noon: OptEdgeId, n: OptNodeId, e: OptEdgeId) -> Option<usize> {
        self.clockwise_edges(noon, n).iter().position(|&x| x == e)
    }
}
