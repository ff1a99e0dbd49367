//! Junction untangling.
//!
//! Three local rewrites resolve junctions where the lines of one edge fan out
//! over several edges: the full Y, the partial Y and the dogbone. Each rule is
//! a detector plus a planner producing a [`RewriteBatch`]; `untangle` runs
//! them in a fixed order until none applies.
use super::graph::{OptEdgeId, OptGraph, OptNodeId};
use super::rewrite::{NodeRef, RewriteBatch, ViewSpec};
use crate::error::TopoError;
use crate::geometry_utils::interpolate_along;
use crate::route_registry::RouteId;
use geo::Coord;
use log::{debug, info, warn};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UntangleRule {
    Y,
    PartialY,
    DogBone,
}

impl UntangleRule {
    /// Rules in the order they are tried.
    pub const ALL: [UntangleRule; 3] = [
        UntangleRule::Y,
        UntangleRule::PartialY,
        UntangleRule::DogBone,
    ];
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UntangleReport {
    pub passes: usize,
    pub y: usize,
    pub partial_y: usize,
    pub dog_bone: usize,
    /// Potential before the first pass and after every pass.
    pub potential: Vec<usize>,
}

impl UntangleReport {
    pub fn applied(&self, rule: UntangleRule) -> usize {
        match rule {
            UntangleRule::Y => self.y,
            UntangleRule::PartialY => self.partial_y,
            UntangleRule::DogBone => self.dog_bone,
        }
    }

    fn record(&mut self, rule: UntangleRule) {
        match rule {
            UntangleRule::Y => self.y += 1,
            UntangleRule::PartialY => self.partial_y += 1,
            UntangleRule::DogBone => self.dog_bone += 1,
        }
    }
}

/// Routes of a trunk edge continuing into one leg.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Branch {
    pub leg: OptEdgeId,
    pub routes: Vec<RouteId>,
}

#[derive(Clone, Debug)]
pub(crate) struct PartialSplit {
    pub branch: OptEdgeId,
    pub diverging: Vec<RouteId>,
    pub rest: Vec<RouteId>,
}

#[derive(Clone, Debug)]
pub(crate) struct DogBoneGroup {
    pub routes: Vec<RouteId>,
    pub from_leg: OptEdgeId,
    pub to_leg: OptEdgeId,
}

impl<'a> OptGraph<'a> {
    fn is_live_incident(&self, e: OptEdgeId, n: OptNodeId) -> bool {
        self.edge(e).is_some_and(|edge| edge.is_incident(n))
    }

    /// Route groups of `e` per leg at `n`, when every other edge at `n` is a
    /// leg fed only by `e` and every route of `e` feeds exactly one leg.
    /// Legs are listed clockwise after `e`.
    pub(crate) fn y_branches(&self, e: OptEdgeId, n: OptNodeId) -> Option<Vec<Branch>> {
        if self.nd(n).get_deg() < 3 {
            return None;
        }
        let legs = self.clockwise_edges(e, n);
        if legs.len() < 2 || legs.iter().any(|&leg| !self.dir_route_contains(e, leg, n)) {
            return None;
        }

        let mut branches: Vec<Branch> = legs
            .iter()
            .map(|&leg| Branch {
                leg,
                routes: Vec::new(),
            })
            .collect();
        for occ in &self.edg(e).partial_routes {
            let mut into = legs
                .iter()
                .enumerate()
                .filter(|&(_, &leg)| self.continues_over(occ, e, leg, n))
                .map(|(i, _)| i);
            match (into.next(), into.next()) {
                (Some(i), None) => branches[i].routes.push(occ.route),
                _ => return None,
            }
        }
        if branches.iter().any(|b| b.routes.is_empty()) {
            return None;
        }
        for b in branches.iter_mut() {
            b.routes.sort_unstable();
        }
        Some(branches)
    }

    fn y_split(&self, e: OptEdgeId, n: OptNodeId) -> Option<Vec<Branch>> {
        let m = self.edg(e).other_nd(n);
        if !self.routes_terminate_at(e, m) {
            return None;
        }
        self.y_branches(e, n)
    }

    /// The lines of `e` fully fork at `n` and end at its other endpoint.
    pub fn is_y_at(&self, e: OptEdgeId, n: OptNodeId) -> bool {
        self.is_live_incident(e, n) && self.y_split(e, n).is_some()
    }

    fn partial_y_split(&self, e: OptEdgeId, n: OptNodeId) -> Option<PartialSplit> {
        if self.nd(n).get_deg() < 3 {
            return None;
        }
        let edge = self.edg(e);
        if !self.routes_terminate_at(e, edge.other_nd(n)) {
            return None;
        }

        let cw = self.clockwise_edges(e, n);
        let mut best: Option<(usize, usize, OptEdgeId, Vec<RouteId>)> = None;
        for (pos, &f) in cw.iter().enumerate() {
            if !self.dir_route_contains(e, f, n) {
                continue;
            }
            let diverging = self.continued_routes(e, f, n);
            if diverging.is_empty() || diverging.len() >= edge.cardinality() {
                continue;
            }
            let f_edge = self.edg(f);
            let isolated = cw.iter().filter(|&&g| g != f).all(|&g| {
                diverging.iter().all(|occ| {
                    !self.continues_over(occ, e, g, n)
                        && f_edge
                            .route(occ.route)
                            .is_none_or(|f_occ| !self.continues_over(f_occ, f, g, n))
                })
            });
            if !isolated {
                continue;
            }
            let key = (diverging.len(), pos);
            if best.as_ref().is_none_or(|b| key < (b.0, b.1)) {
                let mut routes: Vec<RouteId> = diverging.iter().map(|o| o.route).collect();
                routes.sort_unstable();
                best = Some((key.0, key.1, f, routes));
            }
        }

        let (_, _, branch, diverging) = best?;
        let rest = edge
            .route_ids()
            .into_iter()
            .filter(|r| !diverging.contains(r))
            .collect();
        Some(PartialSplit {
            branch,
            diverging,
            rest,
        })
    }

    /// Some lines of `e` leave over a single branch at `n` while the others
    /// go on, and all of them end at the other endpoint of `e`.
    pub fn is_partial_y_at(&self, e: OptEdgeId, n: OptNodeId) -> bool {
        self.is_live_incident(e, n) && self.partial_y_split(e, n).is_some()
    }

    fn dog_bone_split(&self, e: OptEdgeId) -> Option<Vec<DogBoneGroup>> {
        let edge = self.edg(e);
        let at_to = self.y_branches(e, edge.to)?;
        let at_from = self.y_branches(e, edge.from)?;
        if at_to.len() != at_from.len() {
            return None;
        }
        at_to
            .into_iter()
            .map(|t| {
                at_from
                    .iter()
                    .find(|f| f.routes == t.routes)
                    .map(|f| DogBoneGroup {
                        routes: t.routes.clone(),
                        from_leg: f.leg,
                        to_leg: t.leg,
                    })
            })
            .collect()
    }

    /// `e` is a trunk whose lines fork the same way at both ends.
    pub fn is_dog_bone(&self, e: OptEdgeId) -> bool {
        self.edge(e).is_some() && self.dog_bone_split(e).is_some()
    }

    /// Position at the configured offset along `e`'s source geometry, from `n`.
    fn offset_pos(&self, e: OptEdgeId, n: OptNodeId) -> Coord {
        let part = self.edg(e).adj_etg_part(n);
        let frac = self.config.untangle_offset;
        let t = if self.departs_forward(e, n) {
            frac
        } else {
            1.0 - frac
        };
        interpolate_along(&self.source.edge(part.etg).geometry, t, self.nd(n).pos)
    }

    fn plan_y(&self, e: OptEdgeId, n: OptNodeId) -> Option<RewriteBatch> {
        let branches = self.y_split(e, n)?;
        let edge = self.edg(e);
        let m = edge.other_nd(n);
        let m_is_from = edge.from == m;
        let k = branches.len();
        let pos = self.offset_pos(e, n);

        let mut batch = RewriteBatch::default();
        for (i, branch) in branches.into_iter().enumerate() {
            let kn = batch.new_node(pos);
            let (from, to, slot) = if m_is_from {
                (NodeRef::Existing(m), kn, i)
            } else {
                (kn, NodeRef::Existing(m), k - 1 - i)
            };
            batch.views.push(ViewSpec {
                parent: e,
                from,
                to,
                routes: branch.routes,
                slot,
            });
            batch.reattach.push((branch.leg, n, kn));
        }
        batch.removed_nodes.push(n);
        Some(batch)
    }

    fn plan_partial_y(&self, e: OptEdgeId, n: OptNodeId) -> Option<RewriteBatch> {
        let split = self.partial_y_split(e, n)?;
        let edge = self.edg(e);
        let m = edge.other_nd(n);
        let m_is_from = edge.from == m;

        // Left of the remaining lines when walking towards `n`?
        let receiving = self.partial_clockwise_edges(e, n);
        let branch_pos = receiving.iter().position(|&g| g == split.branch);
        let first_rest = receiving.iter().position(|&g| {
            g != split.branch
                && edge
                    .partial_routes
                    .iter()
                    .any(|occ| split.rest.contains(&occ.route) && self.continues_over(occ, e, g, n))
        });
        let walk_slot = match (first_rest, branch_pos) {
            (Some(r), Some(b)) if r < b => 1,
            _ => 0,
        };
        let div_slot = if m_is_from { walk_slot } else { 1 - walk_slot };

        let mut batch = RewriteBatch::default();
        let kn = batch.new_node(self.offset_pos(e, n));
        let (div_from, div_to) = if m_is_from {
            (NodeRef::Existing(m), kn)
        } else {
            (kn, NodeRef::Existing(m))
        };
        batch.views.push(ViewSpec {
            parent: e,
            from: div_from,
            to: div_to,
            routes: split.diverging,
            slot: div_slot,
        });
        batch.views.push(ViewSpec {
            parent: e,
            from: NodeRef::Existing(edge.from),
            to: NodeRef::Existing(edge.to),
            routes: split.rest,
            slot: 1 - div_slot,
        });
        batch.reattach.push((split.branch, n, kn));
        Some(batch)
    }

    fn plan_dog_bone(&self, e: OptEdgeId) -> Option<RewriteBatch> {
        let groups = self.dog_bone_split(e)?;
        let edge = self.edg(e);
        let (from, to) = (edge.from, edge.to);
        let p_pos = self.offset_pos(e, from);
        let q_pos = self.offset_pos(e, to);

        let mut batch = RewriteBatch::default();
        for (i, group) in groups.into_iter().enumerate() {
            let p = batch.new_node(p_pos);
            let q = batch.new_node(q_pos);
            batch.views.push(ViewSpec {
                parent: e,
                from: p,
                to: q,
                routes: group.routes,
                slot: i,
            });
            batch.reattach.push((group.from_leg, from, p));
            batch.reattach.push((group.to_leg, to, q));
        }
        batch.removed_nodes.push(from);
        batch.removed_nodes.push(to);
        Some(batch)
    }

    /// First applicable rewrite of `rule`, scanning edges by handle.
    fn find_rewrite(&self, rule: UntangleRule) -> Option<(OptEdgeId, RewriteBatch)> {
        for e in self.edge_ids() {
            let edge = self.edg(e);
            let found = match rule {
                UntangleRule::Y => self
                    .plan_y(e, edge.from)
                    .or_else(|| self.plan_y(e, edge.to)),
                UntangleRule::PartialY => self
                    .plan_partial_y(e, edge.from)
                    .or_else(|| self.plan_partial_y(e, edge.to)),
                UntangleRule::DogBone => self.plan_dog_bone(e),
            };
            if let Some(batch) = found {
                return Some((e, batch));
            }
        }
        None
    }

    fn untangle_step(&mut self, rule: UntangleRule) -> Result<bool, TopoError> {
        let Some((e, batch)) = self.find_rewrite(rule) else {
            return Ok(false);
        };
        debug!("Untangling {:?} at {}: {}", rule, e, self.edg(e));
        self.apply_batch(batch)?;
        Ok(true)
    }

    /// Apply one full-Y rewrite, if any edge qualifies.
    pub fn untangle_y_step(&mut self) -> Result<bool, TopoError> {
        self.untangle_step(UntangleRule::Y)
    }

    pub fn untangle_partial_y_step(&mut self) -> Result<bool, TopoError> {
        self.untangle_step(UntangleRule::PartialY)
    }

    pub fn untangle_dog_bone_step(&mut self) -> Result<bool, TopoError> {
        self.untangle_step(UntangleRule::DogBone)
    }

    /// Sum over flagged (edge, node) pairs of the number of other edges at the
    /// node that receive the edge's routes. Dogbone trunks count at both ends.
    pub fn untangle_potential(&self) -> usize {
        let mut total = 0;
        for e in self.edge_ids() {
            let edge = self.edg(e);
            let dog_bone = self.dog_bone_split(e).is_some();
            for n in [edge.from, edge.to] {
                if dog_bone
                    || self.y_split(e, n).is_some()
                    || self.partial_y_split(e, n).is_some()
                {
                    total += self.receiving_edges(e, n).len();
                }
            }
        }
        total
    }

    /// Apply the untangling rules until none matches, re-simplifying after
    /// every rewrite.
    pub fn untangle(&mut self) -> Result<UntangleReport, TopoError> {
        self.untangle_within(self.config.max_untangle_passes)
    }

    /// `untangle` limited to `budget` passes; running out while a rule still
    /// applies is reported against the configured cap.
    pub(crate) fn untangle_within(&mut self, budget: usize) -> Result<UntangleReport, TopoError> {
        let cap = self.config.max_untangle_passes;
        let mut report = UntangleReport::default();
        let mut potential = self.untangle_potential();
        report.potential.push(potential);

        loop {
            let Some((rule, e, batch)) = UntangleRule::ALL
                .iter()
                .find_map(|&rule| self.find_rewrite(rule).map(|(e, b)| (rule, e, b)))
            else {
                break;
            };
            if report.passes >= budget {
                return Err(TopoError::NonConvergentRewrite { cap, potential });
            }

            debug!("Untangling {:?} at {}: {}", rule, e, self.edg(e));
            self.apply_batch(batch)?;
            self.simplify()?;
            report.passes += 1;
            report.record(rule);

            let next = self.untangle_potential();
            if next >= potential {
                warn!(
                    "Untangle potential did not decrease after {:?} ({} -> {})",
                    rule, potential, next
                );
            }
            potential = next;
            report.potential.push(next);
        }

        info!(
            "Untangle finished after {} passes (Y: {}, partial Y: {}, dogbone: {})",
            report.passes, report.y, report.partial_y, report.dog_bone
        );
        Ok(report)
    }
}
