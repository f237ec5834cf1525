//! Evolution layer - periodic pruning, knowledge integration and capability growth.

#![warn(missing_docs, unused_crate_dependencies)]

mod metrics;
mod optimizer;

pub use metrics::{EvolutionReport, PerformanceSummary};
pub use optimizer::{
    EvolutionConfig, EvolutionOptimizer, EvolutionTargets, ExplorationConfig, ParameterAdjustment,
    SIMILAR_TO,
};
