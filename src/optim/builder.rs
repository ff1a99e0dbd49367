use super::graph::{EtgPart, OptEdge, OptGraph, OptNodeId, OptRouteOcc, RouteDirection};
use crate::config::OptimConfig;
use crate::error::{InvalidTopologyKind, TopoError};
use crate::geometry_utils::normalize_bearing;
use crate::line_graph::{LineEdge, LineGraph, SourceEdgeId};
use ahash::AHashSet;
use log::info;

fn reject(edge: SourceEdgeId, kind: InvalidTopologyKind) -> TopoError {
    TopoError::InvalidTopology { edge, kind }
}

fn validate_edge(id: SourceEdgeId, edge: &LineEdge) -> Result<(), TopoError> {
    if edge.from == edge.to {
        return Err(reject(id, InvalidTopologyKind::SelfLoop(edge.from)));
    }
    if edge.routes.is_empty() {
        return Err(reject(id, InvalidTopologyKind::NoRoutes));
    }

    let mut seen = AHashSet::new();
    for occ in &edge.routes {
        if !seen.insert(occ.route) {
            return Err(reject(id, InvalidTopologyKind::DuplicateRoute(occ.route)));
        }
        if let Some(node) = occ.direction {
            if node != edge.from && node != edge.to {
                return Err(reject(
                    id,
                    InvalidTopologyKind::ForeignDirection {
                        route: occ.route,
                        node,
                    },
                ));
            }
        }
    }
    Ok(())
}

// Two fronts leaving a node at the same bearing cannot be ordered.
fn validate_fronts(source: &LineGraph) -> Result<(), TopoError> {
    for (nid, node) in source.nodes() {
        for (i, a) in node.fronts.iter().enumerate() {
            let ba = normalize_bearing(a.out_angle);
            for b in &node.fronts[i + 1..] {
                if normalize_bearing(b.out_angle) == ba {
                    return Err(reject(
                        b.edge,
                        InvalidTopologyKind::CoincidentFronts {
                            node: nid,
                            other: a.edge,
                        },
                    ));
                }
            }
        }
    }
    Ok(())
}

impl<'a> OptGraph<'a> {
    /// Build the initial optimization graph: one node per source node, one
    /// single-part edge per source edge.
    pub fn build(source: &'a LineGraph, config: OptimConfig) -> Result<Self, TopoError> {
        for (id, edge) in source.edges() {
            validate_edge(id, edge)?;
        }
        validate_fronts(source)?;

        let mut g = OptGraph::empty(source, config);
        for (sid, node) in source.nodes() {
            g.add_node(Some(sid), node.pos);
        }

        for (eid, edge) in source.edges() {
            let routes = edge
                .routes
                .iter()
                .map(|occ| OptRouteOcc {
                    route: occ.route,
                    direction: match occ.direction {
                        None => RouteDirection::Both,
                        Some(n) if n == edge.to => RouteDirection::Forward,
                        Some(_) => RouteDirection::Backward,
                    },
                    style: occ.style.clone(),
                })
                .collect();

            g.add_edge(OptEdge::new(
                OptNodeId(edge.from.0),
                OptNodeId(edge.to.0),
                vec![EtgPart {
                    etg: eid,
                    dir: true,
                    order: 0,
                    was_cut: false,
                }],
                0,
                routes,
            ));
        }

        g.rebuild_adjacency();
        g.write_edge_order()?;

        info!(
            "Built optimization graph: {} nodes, {} edges, {} route occurrences",
            g.num_nodes(),
            g.num_edges(),
            g.route_occurrence_count()
        );
        Ok(g)
    }
}
