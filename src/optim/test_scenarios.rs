// End-to-end junction scenarios over the shared fixtures.
use super::test_fixtures::*;
use super::{OptEdgeId, OptGraph, RouteDirection, UntangleRule};
use crate::config::OptimConfig;
use crate::error::TopoError;
use crate::line_graph::SourceEdgeId;
use crate::route_registry::RouteId;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// (sorted endpoint labels, sorted route labels) of every live edge.
fn summary(fx: &Fixture, g: &OptGraph<'_>) -> Vec<((String, String), Vec<String>)> {
    let mut out: Vec<_> = g
        .edge_ids()
        .map(|e| {
            let routes = g
                .edg(e)
                .route_ids()
                .into_iter()
                .map(|r| route_label(fx, r))
                .collect();
            (fx.endpoints(g, e), routes)
        })
        .collect();
    out.sort();
    out
}

fn route_label(fx: &Fixture, r: RouteId) -> String {
    fx.graph
        .routes
        .get(r)
        .map(|route| route.label.clone())
        .unwrap_or_default()
}

/// Rows of (endpoint, endpoint, space separated route labels).
fn expect(rows: &[(&str, &str, &str)]) -> Vec<((String, String), Vec<String>)> {
    let mut out: Vec<_> = rows
        .iter()
        .map(|(a, b, routes)| {
            (
                (a.to_string(), b.to_string()),
                routes.split_whitespace().map(str::to_string).collect(),
            )
        })
        .collect();
    out.sort();
    out
}

fn edges_with_routes(g: &OptGraph<'_>, routes: &[RouteId]) -> Vec<OptEdgeId> {
    let mut routes = routes.to_vec();
    routes.sort_unstable();
    g.edge_ids()
        .filter(|&e| g.edg(e).route_ids() == routes)
        .collect()
}

#[test]
fn test_y_step_forks_the_trunk() {
    init();
    let fx = y_junction();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let before = g.route_occurrence_count();

    assert!(g.untangle_y_step().expect("y step"));
    assert_eq!(g.route_occurrence_count(), before);
    assert!(g.node_for_source(fx.n("B")).is_none());
    g.check_invariants().expect("invariants");

    for label in ["L1", "L2"] {
        let r = fx.route(label);
        let views = edges_with_routes(&g, &[r]);
        // the view from A and the original branch edge
        assert_eq!(views.len(), 2);
        let view = views
            .iter()
            .copied()
            .find(|&e| fx.endpoints(&g, e) == ("*".to_string(), "A".to_string()))
            .expect("view from A");
        // new node sits on the old A-B geometry, close to B
        let edge = g.edg(view);
        let k = if g.nd(edge.from).is_synthetic() {
            edge.from
        } else {
            edge.to
        };
        assert!(g.nd(k).pos.x.abs() < 1e-9);
        assert!((g.nd(k).pos.y + 0.5).abs() < 1e-9);
    }

    assert_eq!(g.simplify().expect("simplify"), 2);
    assert_eq!(
        summary(&fx, &g),
        expect(&[("A", "C", "L1"), ("A", "D", "L2")])
    );

    // A-B is source edge 0; L1 keeps its left slot, L2 the right one
    let trunk_order = |e: OptEdgeId| {
        g.edg(e)
            .etgs
            .iter()
            .find(|p| p.etg == SourceEdgeId(0))
            .map(|p| p.order)
    };
    let l1 = edges_with_routes(&g, &[fx.route("L1")])[0];
    let l2 = edges_with_routes(&g, &[fx.route("L2")])[0];
    assert_eq!(trunk_order(l1), Some(0));
    assert_eq!(trunk_order(l2), Some(1));
    assert_eq!(g.edg(l1).depth, 1);

    let edge = g.edg(l1);
    let towards = g
        .direction_node(l1, &edge.partial_routes[0])
        .expect("directed");
    assert_eq!(g.nd(towards).origin, Some(fx.n("C")));
    assert_ne!(edge.partial_routes[0].direction, RouteDirection::Both);
}

#[test]
fn test_partial_y_step_detaches_diverging_line() {
    init();
    let fx = partial_y();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let before = g.route_occurrence_count();

    assert!(g.untangle_partial_y_step().expect("partial y step"));
    assert_eq!(g.route_occurrence_count(), before);
    g.check_invariants().expect("invariants");

    assert_eq!(
        summary(&fx, &g),
        expect(&[
            ("*", "A", "L2"),
            ("*", "E", "L2"),
            ("A", "B", "L1 L3"),
            ("B", "C", "L1 L3"),
        ])
    );

    // E branches off to the right when walking north, so L2 takes slot 1
    let a = g.node_for_source(fx.n("A")).expect("a");
    for &e in &g.nd(a).adj_list {
        let part = g.edg(e).adj_etg_part(a);
        let expected = if g.edg(e).contains_route(fx.route("L2")) {
            1
        } else {
            0
        };
        assert_eq!(part.order, expected);
        assert!(part.was_cut);
    }
}

#[test]
fn test_partial_y_fixture_resolves_fully() {
    init();
    let fx = partial_y();
    let g = OptGraph::optimize(&fx.graph, Default::default()).expect("optimize");
    assert_eq!(
        summary(&fx, &g),
        expect(&[("A", "C", "L1 L3"), ("A", "E", "L2")])
    );
}

#[test]
fn test_chained_junctions_resolve_in_two_passes() {
    init();
    let fx = chained_partial_y();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let report = g.untangle().expect("untangle");

    assert_eq!(report.potential, vec![4, 2, 0]);
    assert!(report.potential.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(
        summary(&fx, &g),
        expect(&[
            ("A", "C", "L1 L3"),
            ("A", "E", "L2"),
            ("C", "F", "M"),
        ])
    );
    g.check_invariants().expect("invariants");

    // L1/L3 sit left of L2 when leaving A northwards
    let a = g.node_for_source(fx.n("A")).expect("a");
    let ordered: Vec<String> = g
        .nd(a)
        .ordered_edges
        .iter()
        .map(|&e| fx.label_of(&g, e, a).to_string())
        .collect();
    assert_eq!(ordered, vec!["C".to_string(), "E".to_string()]);
}

#[test]
fn test_dog_bone_step_keeps_one_trunk() {
    init();
    let fx = dog_bone();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let before = g.route_occurrence_count();
    let trunk_etg = {
        let p = g.node_for_source(fx.n("P")).expect("p");
        let q = g.node_for_source(fx.n("Q")).expect("q");
        let trunk = g
            .edge_ids()
            .find(|&e| g.edg(e).is_incident(p) && g.edg(e).is_incident(q))
            .expect("trunk");
        g.edg(trunk).etgs[0].etg
    };

    assert!(g.untangle_dog_bone_step().expect("dogbone step"));
    assert_eq!(g.route_occurrence_count(), before);
    assert!(g.node_for_source(fx.n("P")).is_none());
    assert!(g.node_for_source(fx.n("Q")).is_none());
    g.check_invariants().expect("invariants");

    let trunks: Vec<OptEdgeId> = g
        .edge_ids()
        .filter(|&e| g.edg(e).etgs.iter().any(|p| p.etg == trunk_etg))
        .collect();
    assert_eq!(trunks.len(), 2);
    let mut carried: Vec<RouteId> = trunks
        .iter()
        .flat_map(|&e| g.edg(e).route_ids())
        .collect();
    carried.sort_unstable();
    let mut expected = vec![fx.route("L1"), fx.route("L2")];
    expected.sort_unstable();
    assert_eq!(carried, expected);
    for &e in &trunks {
        let edge = g.edg(e);
        assert!(g.nd(edge.from).is_synthetic());
        assert!(g.nd(edge.to).is_synthetic());
    }

    g.simplify().expect("simplify");
    assert_eq!(
        summary(&fx, &g),
        expect(&[("P1", "Q1", "L1"), ("P2", "Q2", "L2")])
    );
}

#[test]
fn test_dog_bone_fixture_potential_drops_to_zero() {
    init();
    let fx = dog_bone();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let report = g.untangle().expect("untangle");
    assert_eq!(report.dog_bone, 1);
    assert_eq!(report.potential, vec![4, 0]);
}

#[test]
fn test_connection_exclusion_turns_y_into_partial_y() {
    init();
    let fx = y_junction();
    let b = fx.n("B");
    let l1 = fx.route("L1");
    let mut graph = fx.graph;
    let (ab, bc) = (graph.node(b).adj_list[0], graph.node(b).adj_list[1]);
    graph.add_conn_exc(b, l1, ab, bc);
    let fx = Fixture {
        graph,
        ids: fx.ids,
    };

    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let a = g.node_for_source(fx.n("A")).expect("a");
    let bn = g.node_for_source(b).expect("b");
    let trunk = g.nd(a).adj_list[0];
    assert!(!g.is_y_at(trunk, bn));
    assert!(g.is_partial_y_at(trunk, bn));

    let report = g.untangle().expect("untangle");
    assert_eq!(report.partial_y, 1);
    assert_eq!(
        summary(&fx, &g),
        expect(&[
            ("A", "B", "L1"),
            ("A", "D", "L2"),
            ("B", "C", "L1"),
        ])
    );
}

#[test]
fn test_directed_dog_bone_keeps_directions() {
    init();
    let fx = directed_dog_bone();
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    let before = g.route_occurrence_count();
    assert_eq!(g.untangle_potential(), 4);

    assert!(!g.untangle_y_step().expect("y step"));
    assert!(!g.untangle_partial_y_step().expect("partial y step"));
    assert!(g.untangle_dog_bone_step().expect("dogbone step"));
    assert_eq!(g.route_occurrence_count(), before);
    g.check_invariants().expect("invariants");

    // the trunk is source edge 0, cut once per line: L1 north, L2 south
    for (label, slot) in [("L1", 0), ("L2", 1)] {
        let views: Vec<OptEdgeId> = g
            .edge_ids()
            .filter(|&e| g.edg(e).etgs.iter().any(|p| p.etg == SourceEdgeId(0)))
            .filter(|&e| g.edg(e).route_ids() == vec![fx.route(label)])
            .collect();
        assert_eq!(views.len(), 1);
        let part = g.edg(views[0]).etgs[0];
        assert_eq!(part.order, slot);
        assert!(part.was_cut);
    }

    g.simplify().expect("simplify");
    assert_eq!(
        summary(&fx, &g),
        expect(&[("P1", "Q1", "L1"), ("P2", "Q2", "L2")])
    );
    for (label, end) in [("L1", "Q1"), ("L2", "Q2")] {
        let e = edges_with_routes(&g, &[fx.route(label)])[0];
        let occ = &g.edg(e).partial_routes[0];
        let towards = g.direction_node(e, occ).expect("directed");
        assert_eq!(g.nd(towards).origin, Some(fx.n(end)));
    }
    g.check_invariants().expect("invariants");
}

#[test]
fn test_crossing_trunk_is_split_then_untangled_again() {
    init();
    let fx = crossing_trunk();

    // splitting the trunk exposes a partial Y at P on the north-west leg
    let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
    g.simplify().expect("simplify");
    assert_eq!(g.untangle().expect("untangle").passes, 0);
    assert_eq!(g.split().expect("split"), 1);
    let p = g.node_for_source(fx.n("P")).expect("p");
    let north_west = g
        .edge_ids()
        .find(|&e| fx.endpoints(&g, e) == ("P".to_string(), "P1".to_string()))
        .expect("P-P1");
    assert!(g.is_partial_y_at(north_west, p));
    assert!(g.untangle_potential() > 0);

    let g = OptGraph::optimize(&fx.graph, Default::default()).expect("optimize");
    assert_eq!(g.untangle_potential(), 0);
    assert_eq!(
        summary(&fx, &g),
        expect(&[
            ("P", "P1", "L3"),
            ("P", "P2", "L2"),
            ("P", "Q", "L2"),
            ("P1", "Q", "L1"),
            ("Q", "Q1", "L1"),
            ("Q", "Q2", "L2"),
        ])
    );
}

#[test]
fn test_optimize_leaves_nothing_to_untangle_or_split() {
    init();
    for fx in all_fixtures() {
        let mut g = OptGraph::optimize(&fx.graph, Default::default()).expect("optimize");
        assert_eq!(g.untangle_potential(), 0);
        for rule in UntangleRule::ALL {
            assert!(g.edge_ids().all(|e| {
                let edge = g.edg(e);
                match rule {
                    UntangleRule::Y => !g.is_y_at(e, edge.from) && !g.is_y_at(e, edge.to),
                    UntangleRule::PartialY => {
                        !g.is_partial_y_at(e, edge.from) && !g.is_partial_y_at(e, edge.to)
                    }
                    UntangleRule::DogBone => !g.is_dog_bone(e),
                }
            }));
        }
        assert_eq!(g.split().expect("split"), 0);
    }
}

#[test]
fn test_split_rounds_count_against_pass_cap() {
    init();
    let fx = crossing_trunk();
    // one split round uses the only pass, the partial Y after it has none left
    let config = OptimConfig {
        max_untangle_passes: 1,
        ..Default::default()
    };
    let err = OptGraph::optimize(&fx.graph, config).expect_err("over budget");
    assert_eq!(
        err,
        TopoError::NonConvergentRewrite {
            cap: 1,
            potential: 1
        }
    );
}

#[test]
fn test_invariants_hold_after_every_pass() {
    init();
    for fx in all_fixtures() {
        let mut g = OptGraph::build(&fx.graph, Default::default()).expect("build");
        g.check_invariants().expect("after build");
        let count = g.route_occurrence_count();

        g.simplify().expect("simplify");
        g.check_invariants().expect("after simplify");
        assert_eq!(g.route_occurrence_count(), count);

        g.untangle().expect("untangle");
        g.check_invariants().expect("after untangle");
        assert_eq!(g.route_occurrence_count(), count);
        assert_eq!(g.untangle_potential(), 0);

        g.split().expect("split");
        g.check_invariants().expect("after split");
        assert_eq!(g.route_occurrence_count(), count);

        // splitting only raises degrees, so nothing new to contract
        assert_eq!(g.simplify().expect("simplify again"), 0);
    }
}

#[test]
fn test_optimize_all_matches_sequential_runs() {
    init();
    let fixtures = all_fixtures();
    let graphs: Vec<_> = fixtures.into_iter().map(|fx| fx.graph).collect();
    let config = OptimConfig::default();

    let results = crate::optimize_all(&graphs, &config);
    assert_eq!(results.len(), graphs.len());
    for (graph, result) in graphs.iter().zip(results) {
        let parallel = result.expect("optimize in parallel");
        let sequential = OptGraph::optimize(graph, config.clone()).expect("optimize");
        assert_eq!(parallel.stats(), sequential.stats());
    }
}
