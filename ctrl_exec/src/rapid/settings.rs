//! Evolution settings

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::{Range, RapidError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of an evolution run, loaded from `rapid.toml`.
///
/// Settings are validated once at load; a malformed file is fatal at startup
/// rather than a degraded run.
#[derive(Debug, Clone, Deserialize)]
pub struct RapidSettings {
    /// Number of organisms per generation
    pub population_size: usize,

    /// Number of organisms culled at the end of each generation
    pub bottleneck: usize,

    /// Number of generations to run before halting
    pub num_generations: usize,

    /// Mutation step as a fraction of each gene's bound span
    pub mutation_rate: f64,

    /// Mutation rate used instead when the run stagnates
    pub stagnation_mutation_rate: f64,

    /// Best-fitness move per generation at or below which the run counts as
    /// stagnant
    pub stagnation_threshold: f64,

    /// RNG seed, for reproducible runs. Absent means seed from entropy.
    pub seed: Option<u64>,

    /// Hard bounds on each gene
    pub gene_bounds: Vec<Range>,

    /// Optional narrower ranges to sample the first generation from, one per
    /// gene. Clamped into the gene bounds.
    pub initial_values: Option<Vec<Range>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RapidSettings {
    /// Check the settings for internal consistency.
    pub fn validate(&self) -> Result<(), RapidError> {
        if self.population_size < 2 {
            return Err(RapidError::PopulationTooSmall(self.population_size));
        }

        if self.population_size.saturating_sub(self.bottleneck) < 2 {
            return Err(RapidError::BottleneckTooLarge(
                self.bottleneck,
                self.population_size,
            ));
        }

        if self.num_generations == 0 {
            return Err(RapidError::NoGenerations);
        }

        if self.gene_bounds.is_empty() {
            return Err(RapidError::NoGeneBounds);
        }

        // Deserialized ranges bypass Range::new, so re-check them here
        for range in self
            .gene_bounds
            .iter()
            .chain(self.initial_values.iter().flatten())
        {
            Range::new(range.min, range.max)?;
        }

        if let Some(initial) = &self.initial_values {
            if initial.len() != self.gene_bounds.len() {
                return Err(RapidError::InitialValuesLengthMismatch {
                    expected: self.gene_bounds.len(),
                    found: initial.len(),
                });
            }
        }

        for rate in [self.mutation_rate, self.stagnation_mutation_rate] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(RapidError::InvalidMutationRate(rate));
            }
        }

        Ok(())
    }

    /// The ranges the first generation is sampled from: the initial-value
    /// ranges clamped into the gene bounds, or the bounds themselves.
    pub fn initial_ranges(&self) -> Vec<Range> {
        match &self.initial_values {
            Some(initial) => initial
                .iter()
                .zip(&self.gene_bounds)
                .map(|(init, bound)| Range {
                    min: bound.clamp(init.min),
                    max: bound.clamp(init.max),
                })
                .collect(),
            None => self.gene_bounds.clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn valid() -> RapidSettings {
        RapidSettings {
            population_size: 10,
            bottleneck: 4,
            num_generations: 5,
            mutation_rate: 0.05,
            stagnation_mutation_rate: 0.2,
            stagnation_threshold: 0.1,
            seed: Some(1),
            gene_bounds: vec![
                Range { min: 0.0, max: 2.0 },
                Range { min: 0.0, max: 0.5 },
                Range { min: 0.0, max: 1.0 },
                Range { min: 0.0, max: 1.0 },
            ],
            initial_values: None,
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_bottleneck_must_leave_two_survivors() {
        let mut s = valid();
        s.bottleneck = 9;
        assert!(matches!(
            s.validate(),
            Err(RapidError::BottleneckTooLarge(9, 10))
        ));
    }

    #[test]
    fn test_initial_values_length_checked() {
        let mut s = valid();
        s.initial_values = Some(vec![Range { min: 0.0, max: 1.0 }]);
        assert!(matches!(
            s.validate(),
            Err(RapidError::InitialValuesLengthMismatch {
                expected: 4,
                found: 1
            })
        ));
    }

    #[test]
    fn test_malformed_range_rejected() {
        let mut s = valid();
        s.gene_bounds[2] = Range { min: 1.0, max: 0.0 };
        assert!(matches!(s.validate(), Err(RapidError::InvalidRange(_, _))));
    }

    #[test]
    fn test_initial_ranges_clamped_into_bounds() {
        let mut s = valid();
        s.initial_values = Some(vec![
            Range {
                min: -1.0,
                max: 5.0,
            },
            Range { min: 0.1, max: 0.2 },
            Range { min: 0.0, max: 1.0 },
            Range { min: 0.0, max: 1.0 },
        ]);

        let ranges = s.initial_ranges();
        assert_eq!(ranges[0], Range { min: 0.0, max: 2.0 });
        assert_eq!(ranges[1], Range { min: 0.1, max: 0.2 });
    }
}
