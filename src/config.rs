use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OptimConfig {
    /// Hard cap on untangling passes. Exceeding it fails the graph.
    pub max_untangle_passes: usize,
    /// Fraction of an edge's source geometry at which untangling places
    /// its synthetic nodes, measured from the junction.
    pub untangle_offset: f64,
    // Verify conservation and cardinality after every batch
    pub check_invariants: bool,
    pub penalties: PenaltyConfig,
}

impl Default for OptimConfig {
    fn default() -> Self {
        Self {
            max_untangle_passes: 5000,
            untangle_offset: 0.05,
            check_invariants: true,
            penalties: PenaltyConfig::default(),
        }
    }
}

/// Weights handed to the downstream layout-penalty model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PenaltyConfig {
    pub same_seg_cross_pen: f64,
    pub diff_seg_cross_pen: f64,
    pub split_pen: f64,
    /// Scale node penalties by node degree.
    pub degree_weighted: bool,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            same_seg_cross_pen: 40.0,
            diff_seg_cross_pen: 10.0,
            split_pen: 10.0,
            degree_weighted: true,
        }
    }
}
