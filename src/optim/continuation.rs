// Route continuation between optimization edges sharing a node.
//
// An occurrence continues from edge `a` over node `n` into edge `b` when `b`
// carries the same route, the two directions agree relative to `n` (either is
// bidirectional, or one points towards `n` and the other away from it), and no
// connection exclusion at the shared source node forbids it.
use super::graph::{OptEdgeId, OptGraph, OptNodeId, OptRouteOcc, RouteDirection};
use crate::route_registry::RouteId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RelDir {
    Both,
    Towards,
    Away,
}

impl<'a> OptGraph<'a> {
    /// Direction of `occ` on edge `e` relative to endpoint `n`.
    pub(crate) fn rel_dir(&self, e: OptEdgeId, occ: &OptRouteOcc, n: OptNodeId) -> RelDir {
        let edge = self.edg(e);
        let towards = match occ.direction {
            RouteDirection::Both => return RelDir::Both,
            RouteDirection::Forward => edge.to,
            RouteDirection::Backward => edge.from,
        };
        if towards == n {
            RelDir::Towards
        } else {
            RelDir::Away
        }
    }

    // Exclusions live at the source node both edges leave `n` through; edges
    // meeting at a synthetic node from different source nodes never conflict.
    fn conn_allowed(&self, route: RouteId, a: OptEdgeId, b: OptEdgeId, n: OptNodeId) -> bool {
        let (ea, eb) = (self.adj_source_edge(a, n), self.adj_source_edge(b, n));
        if ea == eb {
            return true;
        }
        let at = self.source_junction(a, n);
        if at != self.source_junction(b, n) {
            return true;
        }
        self.source.node(at).conn_occurs_check(route, ea, eb)
    }

    /// Whether occurrence `occ` of edge `a` continues over `n` into `b`.
    pub(crate) fn continues_over(
        &self,
        occ: &OptRouteOcc,
        a: OptEdgeId,
        b: OptEdgeId,
        n: OptNodeId,
    ) -> bool {
        if a == b {
            return false;
        }
        let Some(other) = self.edg(b).route(occ.route) else {
            return false;
        };
        let consistent = match (self.rel_dir(a, occ, n), self.rel_dir(b, other, n)) {
            (RelDir::Both, _) | (_, RelDir::Both) => true,
            (RelDir::Towards, RelDir::Away) | (RelDir::Away, RelDir::Towards) => true,
            _ => false,
        };
        consistent && self.conn_allowed(occ.route, a, b, n)
    }

    /// Stricter form used for contraction: bidirectional only pairs with
    /// bidirectional, so the merged edge keeps one well-defined direction.
    pub(crate) fn continues_strictly(
        &self,
        occ: &OptRouteOcc,
        a: OptEdgeId,
        b: OptEdgeId,
        n: OptNodeId,
    ) -> bool {
        if a == b {
            return false;
        }
        let Some(other) = self.edg(b).route(occ.route) else {
            return false;
        };
        let consistent = matches!(
            (self.rel_dir(a, occ, n), self.rel_dir(b, other, n)),
            (RelDir::Both, RelDir::Both)
                | (RelDir::Towards, RelDir::Away)
                | (RelDir::Away, RelDir::Towards)
        );
        consistent && self.conn_allowed(occ.route, a, b, n)
    }

    /// Occurrences of `a` continuing over `n` into `b`.
    pub(crate) fn continued_routes(
        &self,
        a: OptEdgeId,
        b: OptEdgeId,
        n: OptNodeId,
    ) -> Vec<&OptRouteOcc> {
        self.edg(a)
            .partial_routes
            .iter()
            .filter(|occ| self.continues_over(occ, a, b, n))
            .collect()
    }

    /// Every route of `leg` continues from `e` over `n`.
    pub(crate) fn dir_route_contains(&self, e: OptEdgeId, leg: OptEdgeId, n: OptNodeId) -> bool {
        self.edg(leg)
            .partial_routes
            .iter()
            .all(|occ| self.continues_over(occ, leg, e, n))
    }

    /// No route of `e` continues into any other edge at `m`.
    pub(crate) fn routes_terminate_at(&self, e: OptEdgeId, m: OptNodeId) -> bool {
        let edge = self.edg(e);
        self.nd(m).adj_list.iter().all(|&g| {
            g == e
                || edge
                    .partial_routes
                    .iter()
                    .all(|occ| !self.continues_over(occ, e, g, m))
        })
    }

    /// Other edges at `n` that receive at least one route of `e`.
    pub(crate) fn receiving_edges(&self, e: OptEdgeId, n: OptNodeId) -> Vec<OptEdgeId> {
        let edge = self.edg(e);
        self.nd(n)
            .adj_list
            .iter()
            .copied()
            .filter(|&g| {
                g != e
                    && edge
                        .partial_routes
                        .iter()
                        .any(|occ| self.continues_over(occ, e, g, n))
            })
            .collect()
    }

    /// Edges at `n` (other than `e`) that the given route of `e` continues into.
    pub(crate) fn continuations_of(
        &self,
        e: OptEdgeId,
        occ: &OptRouteOcc,
        n: OptNodeId,
    ) -> Vec<OptEdgeId> {
        let mut out: Vec<OptEdgeId> = self
            .nd(n)
            .adj_list
            .iter()
            .copied()
            .filter(|&g| self.continues_over(occ, e, g, n))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
