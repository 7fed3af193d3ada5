//! Organisms: genomes with recorded fitness

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::Genome;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Fitness of an organism which has not been evaluated, or whose trial was
/// aborted. All real fitness scores are non-negative, so unfit organisms sink
/// to the bottom of any ranking.
pub const UNFIT_FITNESS: f64 = -1.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A genome paired with the fitness its trial produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism {
    genome: Genome,
    fitness: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Organism {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: UNFIT_FITNESS,
        }
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// True once a trial has scored this organism.
    pub fn is_evaluated(&self) -> bool {
        self.fitness != UNFIT_FITNESS
    }

    /// Record a trial score. Non-finite or negative scores are demoted to the
    /// unfit sentinel so a broken trial can never win a generation.
    pub fn record_fitness(&mut self, fitness: f64) {
        self.fitness = if fitness.is_finite() && fitness >= 0.0 {
            fitness
        } else {
            UNFIT_FITNESS
        };
    }

    /// Clear any recorded fitness, returning the organism to unfit.
    pub fn reset_fitness(&mut self) {
        self.fitness = UNFIT_FITNESS;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::Range;
    use super::*;

    #[test]
    fn test_unfit_until_scored() {
        let bounds = vec![Range::new(0.0, 1.0).unwrap()];
        let mut org = Organism::new(Genome::from_values(&[0.5], &bounds));

        assert!(!org.is_evaluated());
        assert_eq!(org.fitness(), UNFIT_FITNESS);

        org.record_fitness(12.5);
        assert!(org.is_evaluated());
        assert_eq!(org.fitness(), 12.5);

        org.reset_fitness();
        assert!(!org.is_evaluated());
    }

    #[test]
    fn test_broken_scores_are_demoted() {
        let bounds = vec![Range::new(0.0, 1.0).unwrap()];
        let mut org = Organism::new(Genome::from_values(&[0.5], &bounds));

        org.record_fitness(f64::NAN);
        assert!(!org.is_evaluated());

        org.record_fitness(-3.0);
        assert!(!org.is_evaluated());

        org.record_fitness(0.0);
        assert!(org.is_evaluated());
    }
}
