//! Batched graph rewrites.
//!
//! Every pass first analyses an unchanged graph and records what it wants to
//! change in a [`RewriteBatch`]; the batch is then applied in one go and the
//! adjacency and edge orders of all touched nodes are rebuilt.
use super::graph::{EtgPart, OptEdge, OptEdgeId, OptGraph, OptNodeId};
use crate::error::{TopoError, invariant};
use crate::line_graph::SourceEdgeId;
use crate::route_registry::RouteId;
use ahash::{AHashMap, AHashSet};
use geo::Coord;
use itertools::Itertools;
use log::debug;

/// Endpoint of an edge created by a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeRef {
    Existing(OptNodeId),
    New(usize),
}

/// A copy of `parent`'s chain restricted to `routes`. Views of one parent are
/// laid side by side; `slot` is the view's position from the left when
/// walking the parent from its `from` to its `to`.
#[derive(Clone, Debug)]
pub(crate) struct ViewSpec {
    pub parent: OptEdgeId,
    /// Replaces the parent's `from` side.
    pub from: NodeRef,
    /// Replaces the parent's `to` side.
    pub to: NodeRef,
    pub routes: Vec<RouteId>,
    pub slot: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RewriteBatch {
    pub new_nodes: Vec<Coord>,
    pub views: Vec<ViewSpec>,
    pub added_edges: Vec<OptEdge>,
    pub removed_edges: Vec<OptEdgeId>,
    /// Move one endpoint of an edge to another node.
    pub reattach: Vec<(OptEdgeId, OptNodeId, NodeRef)>,
    pub removed_nodes: Vec<OptNodeId>,
}

impl RewriteBatch {
    pub fn new_node(&mut self, pos: Coord) -> NodeRef {
        self.new_nodes.push(pos);
        NodeRef::New(self.new_nodes.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.reattach.is_empty()
            && self.removed_nodes.is_empty()
    }
}

impl<'a> OptGraph<'a> {
    fn resolve(&self, r: NodeRef, fresh: &[OptNodeId]) -> OptNodeId {
        match r {
            NodeRef::Existing(n) => n,
            NodeRef::New(i) => fresh[i],
        }
    }

    /// Shift every live part of `etg` with an order above `base` by `by`,
    /// leaving room for views cut from the part at `base`.
    fn bump_orders(&mut self, etg: SourceEdgeId, base: usize, by: usize, skip: OptEdgeId) {
        if by == 0 {
            return;
        }
        for (i, edge) in self.edges.iter_mut().enumerate() {
            if edge.removed || i == skip.idx() {
                continue;
            }
            for part in edge.etgs.iter_mut() {
                if part.etg == etg && part.order > base {
                    part.order += by;
                }
            }
        }
    }

    fn cut_views(&mut self, parent: OptEdgeId, views: &[&ViewSpec], fresh: &[OptNodeId]) {
        let k = views.len();
        let chain = self.edg(parent).etgs.clone();
        for part in &chain {
            self.bump_orders(part.etg, part.order, k - 1, parent);
        }

        for view in views {
            let p = self.edg(parent);
            let etgs: Vec<EtgPart> = chain
                .iter()
                .map(|part| EtgPart {
                    order: part.order
                        + if part.dir {
                            view.slot
                        } else {
                            k - 1 - view.slot
                        },
                    was_cut: true,
                    ..*part
                })
                .collect();
            let routes = p
                .partial_routes
                .iter()
                .filter(|occ| view.routes.contains(&occ.route))
                .cloned()
                .collect();
            let depth = p.depth;
            let from = self.resolve(view.from, fresh);
            let to = self.resolve(view.to, fresh);
            let id = self.add_edge(OptEdge::new(from, to, etgs, depth, routes));
            debug!("Cut view {} from {}: {}", id, parent, self.edg(id));
        }
        self.edges[parent.idx()].removed = true;
    }

    /// Apply a batch atomically and refresh the edge order of every touched node.
    pub(crate) fn apply_batch(&mut self, batch: RewriteBatch) -> Result<(), TopoError> {
        if batch.is_empty() {
            return Ok(());
        }
        let before = if self.config.check_invariants {
            Some(self.route_occurrence_count())
        } else {
            None
        };

        let mut touched: AHashSet<OptNodeId> = AHashSet::new();
        let fresh: Vec<OptNodeId> = batch
            .new_nodes
            .iter()
            .map(|&pos| self.add_node(None, pos))
            .collect();
        touched.extend(fresh.iter().copied());

        let groups = batch
            .views
            .iter()
            .into_group_map_by(|v| v.parent)
            .into_iter()
            .sorted_by_key(|(parent, _)| *parent)
            .collect::<Vec<_>>();
        for (parent, mut views) in groups {
            if self.edg(parent).removed {
                return Err(invariant(format!("view cut from removed edge {parent}")));
            }
            views.sort_by_key(|v| v.slot);
            if views.iter().map(|v| v.slot).ne(0..views.len()) {
                return Err(invariant(format!(
                    "views of {parent} do not fill consecutive slots"
                )));
            }
            let p = self.edg(parent);
            touched.insert(p.from);
            touched.insert(p.to);
            self.cut_views(parent, &views, &fresh);
        }

        for e in batch.removed_edges {
            let edge = &mut self.edges[e.idx()];
            touched.insert(edge.from);
            touched.insert(edge.to);
            edge.removed = true;
        }

        for edge in batch.added_edges {
            touched.insert(edge.from);
            touched.insert(edge.to);
            let id = self.add_edge(edge);
            debug!("Added {}: {}", id, self.edg(id));
        }

        for (e, old, new) in batch.reattach {
            let new = self.resolve(new, &fresh);
            let edge = &mut self.edges[e.idx()];
            if edge.from == old {
                edge.from = new;
            } else if edge.to == old {
                edge.to = new;
            } else {
                return Err(invariant(format!("{e} is not incident to {old}")));
            }
            touched.insert(old);
            touched.insert(new);
        }

        for n in batch.removed_nodes {
            self.nodes[n.idx()].removed = true;
        }

        self.rebuild_adjacency();
        self.check_structure()?;

        let mut touched: Vec<OptNodeId> = touched
            .into_iter()
            .filter(|n| !self.nd(*n).removed)
            .collect();
        touched.sort_unstable();
        for n in touched {
            self.update_edge_order(n)?;
        }

        if let Some(before) = before {
            let after = self.route_occurrence_count();
            if before != after {
                return Err(invariant(format!(
                    "route occurrence count changed from {before} to {after}"
                )));
            }
            self.check_cardinality()?;
        }
        Ok(())
    }

    // Removed nodes must be isolated, live edges must not loop or dangle.
    pub(crate) fn check_structure(&self) -> Result<(), TopoError> {
        for n in 0..self.nodes.len() {
            let node = &self.nodes[n];
            if node.removed && !node.adj_list.is_empty() {
                return Err(invariant(format!(
                    "removed node N{n} still has {} incident edges",
                    node.adj_list.len()
                )));
            }
        }
        for e in self.edge_ids() {
            let edge = self.edg(e);
            if edge.from == edge.to {
                return Err(invariant(format!("{e} connects {} to itself", edge.from)));
            }
            if edge.etgs.is_empty() || edge.partial_routes.is_empty() {
                return Err(invariant(format!("{e} is empty")));
            }
        }
        Ok(())
    }

    /// Every route of every edge is carried, with a consistent direction, by
    /// the source edge of each of its parts; parts of one source edge hold
    /// distinct order slots.
    pub fn check_cardinality(&self) -> Result<(), TopoError> {
        let mut slots: AHashMap<(SourceEdgeId, usize), OptEdgeId> = AHashMap::new();

        for e in self.edge_ids() {
            let edge = self.edg(e);
            for part in &edge.etgs {
                if let Some(prev) = slots.insert((part.etg, part.order), e) {
                    if prev != e {
                        return Err(invariant(format!(
                            "{prev} and {e} share order slot {} of source edge {}",
                            part.order, part.etg
                        )));
                    }
                }

                let src = self.source.edge(part.etg);
                for occ in &edge.partial_routes {
                    let Some(src_occ) = src.get_route(occ.route) else {
                        return Err(invariant(format!(
                            "{e} carries route {} which source edge {} does not",
                            occ.route, part.etg
                        )));
                    };
                    let expected = match self.direction_node(e, occ) {
                        None => None,
                        // towards `to` of the optimization edge, read along the part
                        Some(n) if (n == edge.to) == part.dir => Some(src.to),
                        Some(_) => Some(src.from),
                    };
                    if src_occ.direction != expected {
                        return Err(invariant(format!(
                            "{e} carries route {} against its direction on source edge {}",
                            occ.route, part.etg
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
