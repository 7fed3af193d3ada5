//! Populations and generational reproduction

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cmp::Ordering;

use rand::Rng;
use serde::Serialize;

use super::{Genome, Organism, Range};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One generation of organisms.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    organisms: Vec<Organism>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Population {
    /// A fully random population.
    pub fn random<R: Rng>(size: usize, bounds: &[Range], rng: &mut R) -> Self {
        Self {
            organisms: (0..size)
                .map(|_| Organism::new(Genome::random(bounds, rng)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub fn organism_mut(&mut self, index: usize) -> &mut Organism {
        &mut self.organisms[index]
    }

    /// Sort the population best-first.
    ///
    /// The sort is stable so equally-fit organisms keep their evaluation
    /// order, which keeps a whole run reproducible from its seed.
    pub fn rank(&mut self) {
        self.organisms.sort_by(|a, b| {
            b.fitness()
                .partial_cmp(&a.fitness())
                .unwrap_or(Ordering::Equal)
        });
    }

    /// The fittest organism. Only meaningful after [`Self::rank`].
    pub fn best(&self) -> Option<&Organism> {
        self.organisms.first()
    }

    /// Breed the next generation.
    ///
    /// The population is ranked, the bottom `bottleneck` organisms are culled
    /// and every slot of the new generation is filled with a mutated child of
    /// two distinct survivors. The first parent walks the survivor list so
    /// every survivor breeds at least once; the second is drawn uniformly
    /// from the remaining survivors.
    ///
    /// Survivor counts below 2 must be rejected at configuration time.
    pub fn reproduce<R: Rng>(
        &mut self,
        bottleneck: usize,
        mutation_rate: f64,
        bounds: &[Range],
        rng: &mut R,
    ) -> Self {
        self.rank();

        let survivor_count = self.organisms.len().saturating_sub(bottleneck);
        let survivors = &self.organisms[..survivor_count];

        let organisms = (0..self.organisms.len())
            .map(|i| {
                let p1 = i % survivor_count;
                let mut p2 = rng.gen_range(0..survivor_count - 1);
                if p2 >= p1 {
                    p2 += 1;
                }

                let mut child = survivors[p1].genome().crossover(survivors[p2].genome(), rng);
                child.mutate(bounds, mutation_rate, rng);
                Organism::new(child)
            })
            .collect();

        Self { organisms }
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

    fn bounds() -> Vec<Range> {
        vec![
            Range::new(0.0, 1.0).unwrap(),
            Range::new(0.0, 1.0).unwrap(),
            Range::new(0.0, 1.0).unwrap(),
            Range::new(0.0, 1.0).unwrap(),
        ]
    }

    #[test]
    fn test_rank_is_descending_and_stable() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut pop = Population::random(5, &bounds(), &mut rng);

        for (i, fitness) in [3.0, 7.0, 7.0, 1.0, 9.0].iter().enumerate() {
            pop.organism_mut(i).record_fitness(*fitness);
        }
        // Tag the two tied organisms so stability is observable
        let first_tied = pop.organisms()[1].genome().clone();

        pop.rank();

        let ranked: Vec<f64> = pop.organisms().iter().map(|o| o.fitness()).collect();
        assert_eq!(ranked, vec![9.0, 7.0, 7.0, 3.0, 1.0]);
        assert_eq!(pop.organisms()[1].genome(), &first_tied);
        assert_eq!(pop.best().unwrap().fitness(), 9.0);
    }

    #[test]
    fn test_reproduce_preserves_size_and_resets_fitness() {
        let mut rng = SmallRng::seed_from_u64(2);
        let b = bounds();
        let mut pop = Population::random(10, &b, &mut rng);

        for i in 0..10 {
            pop.organism_mut(i).record_fitness(i as f64);
        }

        let next = pop.reproduce(4, 0.1, &b, &mut rng);

        assert_eq!(next.len(), 10);
        assert!(next.organisms().iter().all(|o| !o.is_evaluated()));
        for org in next.organisms() {
            for (gene, bound) in org.genome().genes().iter().zip(&b) {
                assert!(bound.contains(*gene));
            }
        }
    }

    /// Culled organisms must contribute nothing to the next generation.
    #[test]
    fn test_reproduce_breeds_from_survivors_only() {
        let mut rng = SmallRng::seed_from_u64(3);
        let b = bounds();

        // Survivors hold low genes, culled organisms high ones; with no
        // mutation every blended child gene stays in the survivor band
        let mut pop = Population::random(10, &b, &mut rng);
        for i in 0..10 {
            let value = i as f64 / 10.0;
            *pop.organism_mut(i) = Organism::new(Genome::from_values(&[value; 4], &b));
            pop.organism_mut(i).record_fitness(10.0 - i as f64);
        }

        let next = pop.reproduce(4, 0.0, &b, &mut rng);

        // Survivors are the 6 fittest, genes 0.0 ..= 0.5
        for org in next.organisms() {
            for gene in org.genome().genes() {
                assert!(*gene <= 0.5 + 1e-12, "gene {} from culled organism", gene);
            }
        }
    }

}
