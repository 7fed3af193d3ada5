//! Gene ranges and genomes

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::RapidError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An inclusive bound on one gene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// A candidate parameter vector.
///
/// Every gene is kept inside its corresponding [`Range`] at all times, which
/// makes it always safe to load a genome straight into a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Range {
    pub fn new(min: f64, max: f64) -> Result<Self, RapidError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(RapidError::InvalidRange(min, max));
        }
        Ok(Self { min, max })
    }

    /// Clamp a value into the range.
    pub fn clamp(&self, value: f64) -> f64 {
        util::maths::clamp(&value, &self.min, &self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// A uniform sample from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    /// The width of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl Genome {
    /// A genome with every gene sampled uniformly from its bound.
    pub fn random<R: Rng>(bounds: &[Range], rng: &mut R) -> Self {
        Self {
            genes: bounds.iter().map(|b| b.sample(rng)).collect(),
        }
    }

    /// A genome with explicit gene values, clamped into the bounds.
    pub fn from_values(values: &[f64], bounds: &[Range]) -> Self {
        Self {
            genes: values
                .iter()
                .zip(bounds)
                .map(|(v, b)| b.clamp(*v))
                .collect(),
        }
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Blend crossover: each child gene is a random convex combination of
    /// the two parent genes, so it always lies between them.
    pub fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        Self {
            genes: self
                .genes
                .iter()
                .zip(&other.genes)
                .map(|(a, b)| {
                    let w: f64 = rng.gen();
                    w * a + (1.0 - w) * b
                })
                .collect(),
        }
    }

    /// Perturb each gene by a zero-mean uniform step scaled by the mutation
    /// rate and the gene's bound span, clamping back into bounds.
    pub fn mutate<R: Rng>(&mut self, bounds: &[Range], rate: f64, rng: &mut R) {
        for (gene, bound) in self.genes.iter_mut().zip(bounds) {
            let step = bound.span() * rate;
            if step > 0.0 {
                *gene = bound.clamp(*gene + rng.gen_range(-step..=step));
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_range_rejects_malformed() {
        assert!(Range::new(1.0, 0.0).is_err());
        assert!(Range::new(f64::NAN, 1.0).is_err());
        assert!(Range::new(0.0, f64::INFINITY).is_err());
        assert!(Range::new(2.0, 2.0).is_ok());
    }

    /// No sequence of random construction, crossover and mutation may ever
    /// push a gene outside its bound.
    #[test]
    fn test_genomes_stay_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(42);
        let bounds = vec![
            Range::new(0.0, 1.0).unwrap(),
            Range::new(-5.0, 5.0).unwrap(),
            Range::new(100.0, 100.0).unwrap(),
        ];

        for _ in 0..1000 {
            let a = Genome::random(&bounds, &mut rng);
            let b = Genome::random(&bounds, &mut rng);
            let mut child = a.crossover(&b, &mut rng);
            child.mutate(&bounds, 0.5, &mut rng);

            for (gene, bound) in child.genes().iter().zip(&bounds) {
                assert!(bound.contains(*gene), "{} outside {:?}", gene, bound);
            }
        }
    }

    #[test]
    fn test_from_values_clamps() {
        let bounds = vec![Range::new(0.0, 1.0).unwrap(), Range::new(0.0, 1.0).unwrap()];
        let genome = Genome::from_values(&[-3.0, 0.5], &bounds);
        assert_eq!(genome.genes(), &[0.0, 0.5]);
    }

    #[test]
    fn test_crossover_stays_between_parents() {
        let mut rng = SmallRng::seed_from_u64(7);
        let bounds = vec![Range::new(0.0, 10.0).unwrap(); 8];
        let a = Genome::from_values(&[2.0; 8], &bounds);
        let b = Genome::from_values(&[8.0; 8], &bounds);

        let child = a.crossover(&b, &mut rng);
        for gene in child.genes() {
            assert!(*gene >= 2.0 && *gene <= 8.0);
        }
    }
}
