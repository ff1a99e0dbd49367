// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Topology simplification and edge ordering for schematic transit maps.
//!
//! A [`LineGraph`] of stations, track segments and the routes running over
//! them is reduced into an [`OptGraph`]: degree-2 chains are contracted,
//! Y, partial-Y and dogbone junctions are untangled, mixed edges are split
//! and every node keeps its incident edges in clockwise order.

pub mod config;
pub mod error;
pub mod geometry_utils;
pub mod line_graph;
pub mod optim;
pub mod route_registry;

pub use config::{OptimConfig, PenaltyConfig};
pub use error::{InvalidTopologyKind, TopoError};
pub use line_graph::{LineEdge, LineGraph, LineNode, RouteOcc, SourceEdgeId, SourceNodeId};
pub use optim::{OptGraph, OptGraphStats, UntangleReport, UntangleRule};
pub use route_registry::{LineStyle, Route, RouteId, RouteRegistry};

use rayon::prelude::*;

/// Optimizes independent line graphs (one per map component) in parallel.
/// Results come back in input order.
pub fn optimize_all<'a>(
    graphs: &'a [LineGraph],
    config: &OptimConfig,
) -> Vec<Result<OptGraph<'a>, TopoError>> {
    graphs
        .par_iter()
        .map(|graph| OptGraph::optimize(graph, config.clone()))
        .collect()
}
