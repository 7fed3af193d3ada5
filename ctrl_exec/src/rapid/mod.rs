//! # RAPID module
//!
//! Robot Actuated Parameter Iterative Development: a generational genetic
//! optimizer which runs entirely as a control task. Candidate controller
//! gains ([`Genome`]s held by [`Organism`]s) are evaluated one at a time by
//! driving the real (or simulated) actuator through scripted trials, scored
//! by overshoot and settling time, and evolved across generations.
//!
//! Organisms are never evaluated in parallel: they share the one physical
//! actuator under test.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod engine;
mod genome;
mod organism;
mod population;
mod settings;
mod tune;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Internal
pub use engine::*;
pub use genome::*;
pub use organism::*;
pub use population::*;
pub use settings::*;
pub use tune::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Configuration errors of the evolutionary subsystem, fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RapidError {
    #[error("Range [{0}, {1}] is malformed (need finite min <= max)")]
    InvalidRange(f64, f64),

    #[error("Population size {0} is too small (need at least 2)")]
    PopulationTooSmall(usize),

    #[error("Bottleneck {0} must leave at least 2 survivors of population {1}")]
    BottleneckTooLarge(usize, usize),

    #[error("Expected {expected} initial value ranges, found {found}")]
    InitialValuesLengthMismatch { expected: usize, found: usize },

    #[error("Mutation rate {0} must be non-negative")]
    InvalidMutationRate(f64),

    #[error("Need at least one generation")]
    NoGenerations,

    #[error("Need at least one gene bound")]
    NoGeneBounds,
}
