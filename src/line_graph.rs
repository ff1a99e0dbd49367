// ===========================================================================
// Source line graph: arena of physical nodes and track edges
// ===========================================================================
use crate::error::{InvalidTopologyKind, TopoError};
use crate::geometry_utils::{angle_between, front_segment, straight_line};
use crate::route_registry::{LineStyle, RouteId, RouteRegistry};
use ahash::{AHashMap, AHashSet};
use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceNodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceEdgeId(pub u32);

impl SourceNodeId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl SourceEdgeId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for SourceEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Line occurrence on a source edge.
/// direction: None = bidirectional, Some(node) = directed towards that endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteOcc {
    pub route: RouteId,
    pub direction: Option<SourceNodeId>,
    pub style: Option<LineStyle>,
}

impl RouteOcc {
    pub fn new(route: RouteId, direction: Option<SourceNodeId>) -> Self {
        Self {
            route,
            direction,
            style: None,
        }
    }

    pub fn new_bidirectional(route: RouteId) -> Self {
        Self::new(route, None)
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Boundary of a node towards one incident edge. `geom` is the first
/// non-degenerate segment of the edge leaving the node.
#[derive(Clone, Debug)]
pub struct NodeFront {
    pub edge: SourceEdgeId,
    pub geom: LineString,
    pub out_angle: f64,
}

#[derive(Debug, Clone)]
pub struct LineNode {
    pub pos: Coord,
    pub label: Option<String>,
    pub adj_list: Vec<SourceEdgeId>,
    pub fronts: Vec<NodeFront>,
    // Connection exceptions: lines that cannot continue between certain edge pairs at this node
    // Key: route, Value: Map of edge -> Set of forbidden target edges
    pub conn_exc: AHashMap<RouteId, AHashMap<SourceEdgeId, AHashSet<SourceEdgeId>>>,
}

impl LineNode {
    pub fn new(pos: Coord) -> Self {
        Self {
            pos,
            label: None,
            adj_list: Vec::new(),
            fronts: Vec::new(),
            conn_exc: AHashMap::new(),
        }
    }

    pub fn get_deg(&self) -> usize {
        self.adj_list.len()
    }

    /// Add a connection exception - route cannot continue from edge_a to edge_b at this node
    pub fn add_conn_exc(&mut self, route: RouteId, edge_a: SourceEdgeId, edge_b: SourceEdgeId) {
        // Store in both directions for fast lookup
        let per_route = self.conn_exc.entry(route).or_default();
        per_route.entry(edge_a).or_default().insert(edge_b);
        per_route.entry(edge_b).or_default().insert(edge_a);
    }

    /// Check if connection occurs (returns true unless exception exists)
    pub fn conn_occurs_check(
        &self,
        route: RouteId,
        edge_a: SourceEdgeId,
        edge_b: SourceEdgeId,
    ) -> bool {
        if let Some(exc_map) = self.conn_exc.get(&route) {
            if let Some(forbidden) = exc_map.get(&edge_a) {
                return !forbidden.contains(&edge_b);
            }
        }
        true
    }

    pub fn front_for(&self, edge: SourceEdgeId) -> Option<&NodeFront> {
        self.fronts.iter().find(|f| f.edge == edge)
    }
}

#[derive(Debug, Clone)]
pub struct LineEdge {
    pub from: SourceNodeId,
    pub to: SourceNodeId,
    pub routes: Vec<RouteOcc>,
    pub geometry: LineString,
}

impl LineEdge {
    pub fn get_other_nd(&self, n: SourceNodeId) -> SourceNodeId {
        if self.from == n { self.to } else { self.from }
    }

    pub fn get_route(&self, route: RouteId) -> Option<&RouteOcc> {
        self.routes.iter().find(|r| r.route == route)
    }

    pub fn contains_route(&self, route: RouteId) -> bool {
        self.get_route(route).is_some()
    }
}

/// Undirected multigraph of physical track edges. Handles are indices and
/// stay valid for the lifetime of the graph; nothing is ever removed.
#[derive(Debug, Default)]
pub struct LineGraph {
    nodes: Vec<LineNode>,
    edges: Vec<LineEdge>,
    pub routes: RouteRegistry,
}

impl LineGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            routes: RouteRegistry::new(),
        }
    }

    pub fn add_nd(&mut self, pos: Coord) -> SourceNodeId {
        let id = SourceNodeId(self.nodes.len() as u32);
        self.nodes.push(LineNode::new(pos));
        id
    }

    pub fn add_nd_with_label(&mut self, pos: Coord, label: &str) -> SourceNodeId {
        let id = self.add_nd(pos);
        self.nodes[id.idx()].label = Some(label.to_string());
        id
    }

    /// Add edge between two nodes. Without usable geometry the edge is drawn
    /// as the straight segment between its endpoints.
    pub fn add_edg(
        &mut self,
        from: SourceNodeId,
        to: SourceNodeId,
        geometry: Option<LineString>,
        routes: Vec<RouteOcc>,
    ) -> Result<SourceEdgeId, TopoError> {
        let id = SourceEdgeId(self.edges.len() as u32);
        for n in [from, to] {
            if n.idx() >= self.nodes.len() {
                return Err(TopoError::InvalidTopology {
                    edge: id,
                    kind: InvalidTopologyKind::UnknownNode(n),
                });
            }
        }

        let from_pos = self.nodes[from.idx()].pos;
        let to_pos = self.nodes[to.idx()].pos;
        let geometry = match geometry {
            Some(g) if front_segment(&g.0, true).is_some() => g,
            _ => straight_line(from_pos, to_pos),
        };

        let from_front = Self::make_front(id, &geometry, true, from_pos, to_pos);
        let to_front = Self::make_front(id, &geometry, false, to_pos, from_pos);

        self.nodes[from.idx()].adj_list.push(id);
        self.nodes[from.idx()].fronts.push(from_front);
        self.nodes[to.idx()].adj_list.push(id);
        self.nodes[to.idx()].fronts.push(to_front);

        self.edges.push(LineEdge {
            from,
            to,
            routes,
            geometry,
        });
        Ok(id)
    }

    fn make_front(
        edge: SourceEdgeId,
        geometry: &LineString,
        at_start: bool,
        here: Coord,
        there: Coord,
    ) -> NodeFront {
        let (a, b) = front_segment(&geometry.0, at_start).unwrap_or((here, there));
        NodeFront {
            edge,
            geom: LineString::new(vec![a, b]),
            out_angle: angle_between(a, b),
        }
    }

    pub fn add_conn_exc(
        &mut self,
        node: SourceNodeId,
        route: RouteId,
        edge_a: SourceEdgeId,
        edge_b: SourceEdgeId,
    ) {
        if let Some(n) = self.nodes.get_mut(node.idx()) {
            n.add_conn_exc(route, edge_a, edge_b);
        }
    }

    pub fn node(&self, id: SourceNodeId) -> &LineNode {
        &self.nodes[id.idx()]
    }

    pub fn edge(&self, id: SourceEdgeId) -> &LineEdge {
        &self.edges[id.idx()]
    }

    pub fn get_node(&self, id: SourceNodeId) -> Option<&LineNode> {
        self.nodes.get(id.idx())
    }

    pub fn get_edge(&self, id: SourceEdgeId) -> Option<&LineEdge> {
        self.edges.get(id.idx())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (SourceNodeId, &LineNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (SourceNodeId(i as u32), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = (SourceEdgeId, &LineEdge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (SourceEdgeId(i as u32), e))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Node front of `edge` at `node`, if the edge is incident to it.
    pub fn front_for(&self, node: SourceNodeId, edge: SourceEdgeId) -> Option<&NodeFront> {
        self.get_node(node).and_then(|n| n.front_for(edge))
    }
}
