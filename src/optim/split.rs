use super::graph::{OptEdgeId, OptGraph, OptNodeId};
use super::rewrite::{NodeRef, RewriteBatch, ViewSpec};
use crate::error::TopoError;
use crate::route_registry::RouteId;
use ahash::AHashSet;
use log::{debug, info};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Edges a route continues into at the `from` and at the `to` end of its edge.
type DirectionPattern = (Vec<OptEdgeId>, Vec<OptEdgeId>);

impl<'a> OptGraph<'a> {
    /// Routes of `e` grouped by direction pattern. `None` unless the edge
    /// holds at least two patterns that differ at both ends.
    fn split_groups(&self, e: OptEdgeId) -> Option<Vec<(DirectionPattern, Vec<RouteId>)>> {
        let edge = self.edg(e);
        let mut groups: BTreeMap<DirectionPattern, Vec<RouteId>> = BTreeMap::new();
        for occ in &edge.partial_routes {
            let pattern = (
                self.continuations_of(e, occ, edge.from),
                self.continuations_of(e, occ, edge.to),
            );
            groups.entry(pattern).or_default().push(occ.route);
        }
        if groups.len() < 2 {
            return None;
        }

        let at_from: AHashSet<&Vec<OptEdgeId>> = groups.keys().map(|p| &p.0).collect();
        let at_to: AHashSet<&Vec<OptEdgeId>> = groups.keys().map(|p| &p.1).collect();
        if at_from.len() < 2 || at_to.len() < 2 {
            return None;
        }
        Some(groups.into_iter().collect())
    }

    /// Smallest clockwise position after `e` at `n` among `targets`.
    fn leftmost(&self, e: OptEdgeId, n: OptNodeId, targets: &[OptEdgeId]) -> Option<usize> {
        targets
            .iter()
            .filter_map(|&t| self.clockwise_pos(e, n, t))
            .min()
    }

    fn plan_split(&self, e: OptEdgeId) -> Option<RewriteBatch> {
        let mut groups = self.split_groups(e)?;
        let edge = self.edg(e);

        // Left to right walking from -> to: clockwise at `to`, counter-clockwise at `from`.
        groups.sort_by_key(|((at_from, at_to), routes)| {
            (
                self.leftmost(e, edge.to, at_to).unwrap_or(usize::MAX),
                Reverse(self.leftmost(e, edge.from, at_from).unwrap_or(0)),
                routes.first().copied(),
            )
        });

        let mut batch = RewriteBatch::default();
        for (slot, (_, routes)) in groups.into_iter().enumerate() {
            batch.views.push(ViewSpec {
                parent: e,
                from: NodeRef::Existing(edge.from),
                to: NodeRef::Existing(edge.to),
                routes,
                slot,
            });
        }
        Some(batch)
    }

    /// Split every edge whose routes fan out differently at both ends into
    /// parallel edges, one per direction pattern. Returns the number of edges split.
    pub fn split(&mut self) -> Result<usize, TopoError> {
        let mut total = 0;
        loop {
            let mut batch = RewriteBatch::default();
            let mut count = 0;
            let candidates: Vec<OptEdgeId> = self.edge_ids().collect();
            for e in candidates {
                if let Some(b) = self.plan_split(e) {
                    debug!("Splitting {} into {} parallel edges", e, b.views.len());
                    batch.views.extend(b.views);
                    count += 1;
                }
            }
            if count == 0 {
                break;
            }
            self.apply_batch(batch)?;
            total += count;
        }
        if total > 0 {
            info!("Split {} edges ({} edges now)", total, self.num_edges());
        }
        Ok(total)
    }
}
