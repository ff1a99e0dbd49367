// Small hand-checked line graphs shared by the optimization tests.
use super::{OptEdgeId, OptGraph, OptNodeId};
use crate::line_graph::{LineGraph, RouteOcc, SourceNodeId};
use crate::route_registry::{Route, RouteId};
use ahash::AHashMap;
use geo::Coord;

pub(crate) const FEED: &str = "f-test";

pub(crate) fn pt(x: f64, y: f64) -> Coord {
    Coord { x, y }
}

pub(crate) fn route(g: &mut LineGraph, label: &str) -> RouteId {
    g.routes.get_or_insert(Route::new(FEED, label))
}

pub(crate) struct Fixture {
    pub graph: LineGraph,
    pub ids: AHashMap<&'static str, SourceNodeId>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            graph: LineGraph::new(),
            ids: AHashMap::new(),
        }
    }

    fn node(&mut self, name: &'static str, x: f64, y: f64) {
        let id = self.graph.add_nd_with_label(pt(x, y), name);
        self.ids.insert(name, id);
    }

    /// Routes are (label, node the line runs towards); None for both directions.
    fn edge(&mut self, from: &str, to: &str, routes: &[(&str, Option<&str>)]) {
        let mut occs = Vec::with_capacity(routes.len());
        for &(label, towards) in routes {
            let towards = towards.map(|t| self.n(t));
            let r = route(&mut self.graph, label);
            occs.push(RouteOcc::new(r, towards));
        }
        let (from, to) = (self.n(from), self.n(to));
        self.graph.add_edg(from, to, None, occs).expect("fixture edge");
    }

    pub fn n(&self, name: &str) -> SourceNodeId {
        self.ids
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("unknown fixture node {name}"))
    }

    pub fn route(&self, label: &str) -> RouteId {
        self.graph
            .routes
            .get_by_val(FEED, label)
            .unwrap_or_else(|| panic!("unknown fixture route {label}"))
    }

    /// Label of the node at the far end of `e`, seen from `at`; `*` for synthetic nodes.
    pub fn label_of(&self, g: &OptGraph<'_>, e: OptEdgeId, at: OptNodeId) -> &str {
        let other = g.edg(e).other_nd(at);
        match g.nd(other).origin {
            Some(src) => self.graph.node(src).label.as_deref().unwrap_or("?"),
            None => "*",
        }
    }

    /// Labels of the two endpoints of `e`, sorted.
    pub fn endpoints(&self, g: &OptGraph<'_>, e: OptEdgeId) -> (String, String) {
        let edge = g.edg(e);
        let a = self.label_of(g, e, edge.to).to_string();
        let b = self.label_of(g, e, edge.from).to_string();
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// hub with four spokes; L1 runs north-south, L2 east-west.
pub(crate) fn star() -> Fixture {
    let mut fx = Fixture::new();
    fx.node("hub", 0.0, 0.0);
    fx.node("N", 0.0, 10.0);
    fx.node("E", 10.0, 0.0);
    fx.node("S", 0.0, -10.0);
    fx.node("W", -10.0, 0.0);
    fx.edge("hub", "N", &[("L1", None)]);
    fx.edge("hub", "S", &[("L1", None)]);
    fx.edge("hub", "E", &[("L2", None)]);
    fx.edge("W", "hub", &[("L2", None)]);
    fx
}

/// A - B - C - D on a straight line, the middle edge stored C -> B.
pub(crate) fn chain() -> Fixture {
    let mut fx = Fixture::new();
    fx.node("A", 0.0, 0.0);
    fx.node("B", 10.0, 0.0);
    fx.node("C", 20.0, 0.0);
    fx.node("D", 30.0, 0.0);
    fx.edge("A", "B", &[("L1", None)]);
    fx.edge("C", "B", &[("L1", None)]);
    fx.edge("C", "D", &[("L1", None)]);
    fx
}

/// A-B carries L1 and L2 north into B, where L1 turns north-west to C and
/// L2 north-east to D.
pub(crate) fn y_junction() -> Fixture {
    let mut fx = Fixture::new();
    fx.node("A", 0.0, -10.0);
    fx.node("B", 0.0, 0.0);
    fx.node("C", -10.0, 10.0);
    fx.node("D", 10.0, 10.0);
    fx.edge("A", "B", &[("L1", Some("B")), ("L2", Some("B"))]);
    fx.edge("B", "C", &[("L1", Some("C"))]);
    fx.edge("B", "D", &[("L2", Some("D"))]);
    fx
}

/// A-B carries L1, L2, L3 into B; L2 leaves north-east to E, L1 and L3 go
/// straight on to C.
pub(crate) fn partial_y() -> Fixture {
    let mut fx = Fixture::new();
    fx.node("A", 0.0, -10.0);
    fx.node("B", 0.0, 0.0);
    fx.node("C", 0.0, 10.0);
    fx.node("E", 10.0, 10.0);
    fx.edge(
        "A",
        "B",
        &[("L1", Some("B")), ("L2", Some("B")), ("L3", Some("B"))],
    );
    fx.edge("B", "E", &[("L2", Some("E"))]);
    fx.edge("B", "C", &[("L1", Some("C")), ("L3", Some("C"))]);
    fx
}

/// Like `partial_y`, but B-C also carries M, which leaves north-west to F.
pub(crate) fn chained_partial_y() -> Fixture {
    let mut fx = Fixture::new();
    fx.node("A", 0.0, -10.0);
    fx.node("B", 0.0, 0.0);
    fx.node("C", 0.0, 10.0);
    fx.node("E", 10.0, 10.0);
    fx.node("F", -10.0, 10.0);
    fx.edge("A", "B", &[("L1", None), ("L2", None), ("L3", None)]);
    fx.edge("B", "E", &[("L2", None)]);
    fx.edge("B", "C", &[("L1", None), ("L3", None), ("M", None)]);
    fx.edge("B", "F", &[("M", None)]);
    fx
}

fn bone_nodes(fx: &mut Fixture) {
    fx.node("P", 0.0, 0.0);
    fx.node("Q", 20.0, 0.0);
    fx.node("P1", -10.0, 10.0);
    fx.node("P2", -10.0, -10.0);
    fx.node("Q1", 30.0, 10.0);
    fx.node("Q2", 30.0, -10.0);
}

/// Trunk P-Q with L1 forking north and L2 south at both ends.
pub(crate) fn dog_bone() -> Fixture {
    let mut fx = Fixture::new();
    bone_nodes(&mut fx);
    fx.edge("P", "Q", &[("L1", None), ("L2", None)]);
    fx.edge("P", "P1", &[("L1", None)]);
    fx.edge("P", "P2", &[("L2", None)]);
    fx.edge("Q", "Q1", &[("L1", None)]);
    fx.edge("Q", "Q2", &[("L2", None)]);
    fx
}

/// The dogbone with both lines running one way: in from P1 and P2, along
/// the trunk towards Q, out to Q1 and Q2.
pub(crate) fn directed_dog_bone() -> Fixture {
    let mut fx = Fixture::new();
    bone_nodes(&mut fx);
    fx.edge("P", "Q", &[("L1", Some("Q")), ("L2", Some("Q"))]);
    fx.edge("P", "P1", &[("L1", Some("P"))]);
    fx.edge("P", "P2", &[("L2", Some("P"))]);
    fx.edge("Q", "Q1", &[("L1", Some("Q1"))]);
    fx.edge("Q", "Q2", &[("L2", Some("Q2"))]);
    fx
}

/// The dogbone shape, except that the north-west leg also carries L3, which
/// ends at P. Not a dogbone, but the trunk still has to be split.
pub(crate) fn crossing_trunk() -> Fixture {
    let mut fx = Fixture::new();
    bone_nodes(&mut fx);
    fx.edge("P", "Q", &[("L1", None), ("L2", None)]);
    fx.edge("P", "P1", &[("L1", None), ("L3", None)]);
    fx.edge("P", "P2", &[("L2", None)]);
    fx.edge("Q", "Q1", &[("L1", None)]);
    fx.edge("Q", "Q2", &[("L2", None)]);
    fx
}

pub(crate) fn all_fixtures() -> Vec<Fixture> {
    vec![
        star(),
        chain(),
        y_junction(),
        partial_y(),
        chained_partial_y(),
        dog_bone(),
        directed_dog_bone(),
        crossing_trunk(),
    ]
}
