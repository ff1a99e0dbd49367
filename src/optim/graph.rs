// ===========================================================================
// Optimization graph: aggregated edges over a borrowed source line graph
// ===========================================================================
use crate::config::OptimConfig;
use crate::line_graph::{LineGraph, SourceEdgeId, SourceNodeId};
use crate::route_registry::{LineStyle, RouteId};
use geo::Coord;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptNodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptEdgeId(pub u32);

impl OptNodeId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl OptEdgeId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OptNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl fmt::Display for OptEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
pub enum RouteDirection {
    Both,
    Forward,  // From -> To
    Backward, // To -> From
}

impl RouteDirection {
    pub fn flipped(self) -> Self {
        match self {
            RouteDirection::Both => RouteDirection::Both,
            RouteDirection::Forward => RouteDirection::Backward,
            RouteDirection::Backward => RouteDirection::Forward,
        }
    }
}

/// Route occurrence on an optimization edge, directed relative to the edge's from -> to.
#[derive(Clone, Debug, PartialEq)]
pub struct OptRouteOcc {
    pub route: RouteId,
    pub direction: RouteDirection,
    pub style: Option<LineStyle>,
}

impl OptRouteOcc {
    pub(crate) fn flipped(&self) -> Self {
        Self {
            route: self.route,
            direction: self.direction.flipped(),
            style: self.style.clone(),
        }
    }
}

/// One source edge contributing to an aggregated edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EtgPart {
    pub etg: SourceEdgeId,
    /// Source edge from -> to agrees with the optimization edge from -> to.
    pub dir: bool,
    /// Left-to-right slot among all optimization edges containing `etg`,
    /// read walking the source edge from its `from` to its `to`.
    pub order: usize,
    pub was_cut: bool,
}

#[derive(Clone, Debug)]
pub struct OptNode {
    /// None for synthetic nodes created by untangling.
    pub origin: Option<SourceNodeId>,
    pub pos: Coord,
    pub adj_list: Vec<OptEdgeId>,
    /// Incident edges, clockwise.
    pub ordered_edges: Vec<OptEdgeId>,
    pub(crate) removed: bool,
}

impl OptNode {
    pub(crate) fn new(origin: Option<SourceNodeId>, pos: Coord) -> Self {
        Self {
            origin,
            pos,
            adj_list: Vec::new(),
            ordered_edges: Vec::new(),
            removed: false,
        }
    }

    pub fn get_deg(&self) -> usize {
        self.adj_list.len()
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct OptEdge {
    pub from: OptNodeId,
    pub to: OptNodeId,
    /// Chain of source edges, ordered from `from` to `to`.
    pub etgs: Vec<EtgPart>,
    pub depth: usize,
    pub partial_routes: Vec<OptRouteOcc>,
    pub(crate) removed: bool,
}

impl OptEdge {
    pub(crate) fn new(
        from: OptNodeId,
        to: OptNodeId,
        etgs: Vec<EtgPart>,
        depth: usize,
        partial_routes: Vec<OptRouteOcc>,
    ) -> Self {
        Self {
            from,
            to,
            etgs,
            depth,
            partial_routes,
            removed: false,
        }
    }

    pub fn other_nd(&self, n: OptNodeId) -> OptNodeId {
        if self.from == n { self.to } else { self.from }
    }

    pub fn is_incident(&self, n: OptNodeId) -> bool {
        self.from == n || self.to == n
    }

    /// Part of the chain touching node `n`.
    pub fn adj_etg_part(&self, n: OptNodeId) -> &EtgPart {
        if self.from == n {
            self.first_etg()
        } else {
            self.last_etg()
        }
    }

    pub fn first_etg(&self) -> &EtgPart {
        &self.etgs[0]
    }

    pub fn last_etg(&self) -> &EtgPart {
        &self.etgs[self.etgs.len() - 1]
    }

    pub fn cardinality(&self) -> usize {
        self.partial_routes.len()
    }

    pub fn route(&self, route: RouteId) -> Option<&OptRouteOcc> {
        self.partial_routes.iter().find(|r| r.route == route)
    }

    pub fn contains_route(&self, route: RouteId) -> bool {
        self.route(route).is_some()
    }

    pub fn route_ids(&self) -> Vec<RouteId> {
        let mut ids: Vec<RouteId> = self.partial_routes.iter().map(|r| r.route).collect();
        ids.sort_unstable();
        ids
    }

    /// The chain and routes re-expressed for the opposite orientation.
    pub(crate) fn reversed_chain(&self) -> (Vec<EtgPart>, Vec<OptRouteOcc>) {
        let etgs = self
            .etgs
            .iter()
            .rev()
            .map(|p| EtgPart { dir: !p.dir, ..*p })
            .collect();
        let routes = self.partial_routes.iter().map(|r| r.flipped()).collect();
        (etgs, routes)
    }
}

impl fmt::Display for OptEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} [", self.from, self.to)?;
        for (i, p) in self.etgs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}{}#{}", if p.dir { "+" } else { "-" }, p.etg, p.order)?;
        }
        write!(f, "] routes={:?}", self.route_ids())
    }
}

/// Reduced graph handed to the layout stage. Borrows its source graph;
/// removed nodes and edges stay in the arenas as tombstones so handles never move.
#[derive(Debug, Clone)]
pub struct OptGraph<'a> {
    pub(crate) source: &'a LineGraph,
    pub(crate) config: OptimConfig,
    pub(crate) nodes: Vec<OptNode>,
    pub(crate) edges: Vec<OptEdge>,
}

impl<'a> OptGraph<'a> {
    pub(crate) fn empty(source: &'a LineGraph, config: OptimConfig) -> Self {
        Self {
            source,
            config,
            nodes: Vec::with_capacity(source.num_nodes()),
            edges: Vec::with_capacity(source.num_edges()),
        }
    }

    pub fn source(&self) -> &'a LineGraph {
        self.source
    }

    pub fn config(&self) -> &OptimConfig {
        &self.config
    }

    pub fn node(&self, id: OptNodeId) -> Option<&OptNode> {
        self.nodes.get(id.idx()).filter(|n| !n.removed)
    }

    pub fn edge(&self, id: OptEdgeId) -> Option<&OptEdge> {
        self.edges.get(id.idx()).filter(|e| !e.removed)
    }

    pub(crate) fn nd(&self, id: OptNodeId) -> &OptNode {
        &self.nodes[id.idx()]
    }

    pub(crate) fn edg(&self, id: OptEdgeId) -> &OptEdge {
        &self.edges[id.idx()]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = OptNodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed)
            .map(|(i, _)| OptNodeId(i as u32))
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = OptEdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.removed)
            .map(|(i, _)| OptEdgeId(i as u32))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.iter().filter(|e| !e.removed).count()
    }

    pub(crate) fn add_node(&mut self, origin: Option<SourceNodeId>, pos: Coord) -> OptNodeId {
        let id = OptNodeId(self.nodes.len() as u32);
        self.nodes.push(OptNode::new(origin, pos));
        id
    }

    pub(crate) fn add_edge(&mut self, edge: OptEdge) -> OptEdgeId {
        let id = OptEdgeId(self.edges.len() as u32);
        self.edges.push(edge);
        id
    }

    /// Recompute every live node's adjacency list from the live edges.
    /// Edge handles are visited in ascending order so the lists are deterministic.
    pub(crate) fn rebuild_adjacency(&mut self) {
        for n in self.nodes.iter_mut() {
            n.adj_list.clear();
        }
        for (i, e) in self.edges.iter().enumerate() {
            if e.removed {
                continue;
            }
            let id = OptEdgeId(i as u32);
            self.nodes[e.from.idx()].adj_list.push(id);
            self.nodes[e.to.idx()].adj_list.push(id);
        }
    }

    /// Endpoint a directed occurrence travels towards, None when bidirectional.
    pub fn direction_node(&self, e: OptEdgeId, occ: &OptRouteOcc) -> Option<OptNodeId> {
        let edge = self.edg(e);
        match occ.direction {
            RouteDirection::Both => None,
            RouteDirection::Forward => Some(edge.to),
            RouteDirection::Backward => Some(edge.from),
        }
    }

    /// Live node built from the given source node, if it still exists.
    pub fn node_for_source(&self, src: SourceNodeId) -> Option<OptNodeId> {
        self.node_ids().find(|&n| self.nd(n).origin == Some(src))
    }

    /// Source edge through which `e` touches `n`.
    pub fn adj_source_edge(&self, e: OptEdgeId, n: OptNodeId) -> SourceEdgeId {
        self.edg(e).adj_etg_part(n).etg
    }

    /// Source node at which `e` touches `n`: the endpoint of the adjacent
    /// source edge that `e` departs from when leaving `n`.
    pub fn source_junction(&self, e: OptEdgeId, n: OptNodeId) -> SourceNodeId {
        let src = self.source.edge(self.adj_source_edge(e, n));
        if self.departs_forward(e, n) {
            src.from
        } else {
            src.to
        }
    }

    /// Source node shared by two distinct source edges; the first endpoint of
    /// `a` that `b` also touches when they run in parallel.
    pub fn shared_node(&self, a: SourceEdgeId, b: SourceEdgeId) -> Option<SourceNodeId> {
        if a == b {
            return None;
        }
        let ea = self.source.get_edge(a)?;
        let eb = self.source.get_edge(b)?;
        [ea.from, ea.to]
            .into_iter()
            .find(|&n| n == eb.from || n == eb.to)
    }

    /// Number of (source edge, route) incidences represented by the graph.
    pub fn route_occurrence_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| !e.removed)
            .map(|e| e.partial_routes.len() * e.etgs.len())
            .sum()
    }

    /// Whether leaving `n` along `e` walks the adjacent source edge from its `from` to its `to`.
    pub(crate) fn departs_forward(&self, e: OptEdgeId, n: OptNodeId) -> bool {
        let edge = self.edg(e);
        (edge.from == n) == edge.adj_etg_part(n).dir
    }
}
