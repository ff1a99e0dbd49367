use super::graph::{OptEdge, OptEdgeId, OptGraph, OptNodeId};
use super::rewrite::RewriteBatch;
use crate::error::TopoError;
use ahash::AHashSet;
use log::{debug, info};

impl<'a> OptGraph<'a> {
    /// Whether the degree-2 node `n` can be contracted, returning its two edges
    /// as (u-n, n-w). Every route must continue strictly and keep its style.
    fn contractible(&self, n: OptNodeId) -> Option<(OptEdgeId, OptEdgeId)> {
        let node = self.nd(n);
        if node.get_deg() != 2 {
            return None;
        }
        let (a, b) = (node.adj_list[0], node.adj_list[1]);
        if a == b {
            return None;
        }
        let (ea, eb) = (self.edg(a), self.edg(b));
        // Cycle (u--n--u)
        if ea.other_nd(n) == eb.other_nd(n) {
            return None;
        }
        if ea.cardinality() != eb.cardinality() {
            return None;
        }
        if ea.partial_routes.iter().all(|occ| {
            self.continues_strictly(occ, a, b, n)
                && eb.route(occ.route).is_some_and(|o| o.style == occ.style)
        }) {
            Some((a, b))
        } else {
            None
        }
    }

    /// Merge u-n and n-w into u->w.
    fn contracted(&self, a: OptEdgeId, b: OptEdgeId, n: OptNodeId) -> OptEdge {
        let (ea, eb) = (self.edg(a), self.edg(b));
        let u = ea.other_nd(n);
        let w = eb.other_nd(n);

        let (mut etgs, routes) = if ea.to == n {
            (ea.etgs.clone(), ea.partial_routes.clone())
        } else {
            ea.reversed_chain()
        };
        let (b_etgs, _) = if eb.from == n {
            (eb.etgs.clone(), Vec::new())
        } else {
            eb.reversed_chain()
        };
        etgs.extend(b_etgs);

        OptEdge::new(u, w, etgs, ea.depth + eb.depth + 1, routes)
    }

    /// One contraction pass over an edge-disjoint set of candidates.
    fn simplify_pass(&mut self) -> Result<usize, TopoError> {
        let mut batch = RewriteBatch::default();
        let mut used: AHashSet<OptEdgeId> = AHashSet::new();

        // Deterministic order
        let candidates: Vec<OptNodeId> = self.node_ids().collect();
        for n in candidates {
            let Some((a, b)) = self.contractible(n) else {
                continue;
            };
            if used.contains(&a) || used.contains(&b) {
                continue;
            }
            used.insert(a);
            used.insert(b);

            debug!("Contracting node {} between {} and {}", n, a, b);
            batch.added_edges.push(self.contracted(a, b, n));
            batch.removed_edges.push(a);
            batch.removed_edges.push(b);
            batch.removed_nodes.push(n);
        }

        let count = batch.removed_nodes.len();
        if count > 0 {
            self.apply_batch(batch)?;
        }
        Ok(count)
    }

    /// Contract degree-2 nodes whose two edges carry the same routes in the
    /// same directions, until none is left. Returns the number of contracted nodes.
    pub fn simplify(&mut self) -> Result<usize, TopoError> {
        let mut total = 0;
        let mut rounds = 0;
        loop {
            let n = self.simplify_pass()?;
            if n == 0 {
                break;
            }
            total += n;
            rounds += 1;
        }
        if total > 0 {
            info!(
                "Simplify contracted {} nodes in {} rounds ({} edges left)",
                total,
                rounds,
                self.num_edges()
            );
        }
        Ok(total)
    }
}
