//! Generational evolution engine

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::task::{Task, TaskCtx};

use super::{Genome, Organism, Population, RapidError, RapidSettings, UNFIT_FITNESS};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A task which evaluates the genome it was built from.
///
/// `fitness` is only meaningful after the trial has completed; an aborted
/// trial reports [`UNFIT_FITNESS`].
pub trait Trial: Task {
    fn fitness(&self) -> f64;
}

/// Builds the trial for one candidate genome.
pub type TrialFactory = Box<dyn Fn(&Genome) -> Box<dyn Trial>>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The evolution run, itself a task.
///
/// Organisms are evaluated strictly one at a time: every trial drives the
/// same physical actuator, so there is never more than one live trial. Each
/// cycle the engine advances the current trial by one update; generations
/// turn over when the last organism has been scored.
pub struct RapidEngine {
    settings: RapidSettings,
    factory: TrialFactory,
    rng: SmallRng,

    population: Population,
    generation: usize,
    prev_best: Option<f64>,
    best_ever: Option<Organism>,

    trial: Option<Box<dyn Trial>>,
    state: EngineState,
}

/// Per-generation telemetry record saved into the session.
#[derive(Serialize)]
struct GenerationRecord {
    generation: usize,
    best_fitness: f64,
    mean_fitness: f64,
    best_genes: Vec<f64>,
    population: Population,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

enum EngineState {
    /// Start evaluating organism 0 of the current population
    Setup,

    /// Drive the live trial for one organism
    Evaluate { organism: usize },

    /// All generations run
    Done,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The mutation rate for the coming generation.
///
/// When the best fitness moved by no more than the stagnation threshold
/// since the previous generation the accelerated rate is used, kicking the
/// population out of a local optimum.
pub fn select_mutation_rate(
    prev_best: Option<f64>,
    best: f64,
    settings: &RapidSettings,
) -> f64 {
    match prev_best {
        Some(prev) if (best - prev).abs() <= settings.stagnation_threshold => {
            settings.stagnation_mutation_rate
        }
        _ => settings.mutation_rate,
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RapidEngine {
    pub fn new(settings: RapidSettings, factory: TrialFactory) -> Result<Self, RapidError> {
        settings.validate()?;

        let mut rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let population =
            Population::random(settings.population_size, &settings.initial_ranges(), &mut rng);

        Ok(Self {
            settings,
            factory,
            rng,
            population,
            generation: 0,
            prev_best: None,
            best_ever: None,
            trial: None,
            state: EngineState::Setup,
        })
    }

    /// The fittest organism seen over the whole run so far.
    pub fn best(&self) -> Option<&Organism> {
        self.best_ever.as_ref()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    fn start_trial(&mut self, organism: usize, ctx: &mut TaskCtx) {
        let mut trial = (self.factory)(self.population.organisms()[organism].genome());
        trial.begin(ctx);
        self.trial = Some(trial);
        self.state = EngineState::Evaluate { organism };
    }

    fn advance(&mut self, organism: usize, ctx: &mut TaskCtx) {
        self.trial = None;

        if organism + 1 < self.population.len() {
            self.start_trial(organism + 1, ctx);
        } else {
            self.finish_generation();
        }
    }

    fn finish_generation(&mut self) {
        self.population.rank();

        // Validation guarantees a non-empty population
        let best = self.population.best().cloned();
        let best = match best {
            Some(b) => b,
            None => return,
        };

        let mean = self
            .population
            .organisms()
            .iter()
            .map(|o| o.fitness())
            .sum::<f64>()
            / self.population.len() as f64;

        info!(
            "Generation {}: best fitness {:.3} (genes {:?}), mean {:.3}",
            self.generation + 1,
            best.fitness(),
            best.genome().genes(),
            mean
        );

        util::session::save(
            format!("rapid/generation_{:04}.json", self.generation),
            GenerationRecord {
                generation: self.generation,
                best_fitness: best.fitness(),
                mean_fitness: mean,
                best_genes: best.genome().genes().to_vec(),
                population: self.population.clone(),
            },
        );

        let improves = match &self.best_ever {
            Some(prev) => best.fitness() > prev.fitness(),
            None => true,
        };
        if improves {
            self.best_ever = Some(best.clone());
        }

        if self.generation + 1 >= self.settings.num_generations {
            info!("Evolution complete, top candidates:");
            for (i, org) in self.population.organisms().iter().take(3).enumerate() {
                info!(
                    "  #{}: fitness {:.3}, genes {:?}",
                    i + 1,
                    org.fitness(),
                    org.genome().genes()
                );
            }
            self.state = EngineState::Done;
            return;
        }

        let rate = select_mutation_rate(self.prev_best, best.fitness(), &self.settings);
        if rate != self.settings.mutation_rate {
            info!(
                "Best fitness stagnant, raising mutation rate to {}",
                rate
            );
        }
        self.prev_best = Some(best.fitness());

        let next = self.population.reproduce(
            self.settings.bottleneck,
            rate,
            &self.settings.gene_bounds,
            &mut self.rng,
        );
        self.population = next;
        self.generation += 1;
        self.state = EngineState::Setup;
    }
}

impl Task for RapidEngine {
    fn begin(&mut self, _ctx: &mut TaskCtx) {
        info!(
            "Starting evolution: {} organisms x {} generations, {} genes",
            self.settings.population_size,
            self.settings.num_generations,
            self.settings.gene_bounds.len()
        );
    }

    fn update(&mut self, ctx: &mut TaskCtx) {
        match self.state {
            EngineState::Setup => {
                info!(
                    "Generation {}/{}",
                    self.generation + 1,
                    self.settings.num_generations
                );
                self.start_trial(0, ctx);
            }
            EngineState::Evaluate { organism } => {
                let trial = match self.trial.as_mut() {
                    Some(t) => t,
                    None => return,
                };

                if trial.should_cancel(ctx) {
                    trial.stop(ctx);
                    warn!("Trial for organism {} aborted, marking unfit", organism);
                    self.population
                        .organism_mut(organism)
                        .record_fitness(UNFIT_FITNESS);
                    self.advance(organism, ctx);
                    return;
                }

                trial.update(ctx);
                if trial.has_completed() {
                    trial.end(ctx);
                    let fitness = trial.fitness();
                    self.population
                        .organism_mut(organism)
                        .record_fitness(fitness);
                    self.advance(organism, ctx);
                }
            }
            EngineState::Done => {}
        }
    }

    fn stop(&mut self, ctx: &mut TaskCtx) {
        if let Some(trial) = self.trial.as_mut() {
            trial.stop(ctx);
        }
        self.trial = None;
    }

    fn end(&mut self, _ctx: &mut TaskCtx) {
        if let Some(best) = &self.best_ever {
            info!(
                "Evolution run ended, best fitness {:.3} with genes {:?}",
                best.fitness(),
                best.genome().genes()
            );
        }
    }

    fn has_completed(&self) -> bool {
        matches!(self.state, EngineState::Done)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops::OperationState;
    use crate::task::FaultPolicy;
    use hw_if::sim::SimRig;

    use super::super::Range;

    /// Scores a genome by how close its first gene is to 1.5, no hardware.
    struct ClosenessTrial {
        score: f64,
        done: bool,
        abort: bool,
    }

    impl Task for ClosenessTrial {
        fn begin(&mut self, _ctx: &mut TaskCtx) {}

        fn update(&mut self, _ctx: &mut TaskCtx) {
            self.done = true;
        }

        fn stop(&mut self, _ctx: &mut TaskCtx) {}

        fn end(&mut self, _ctx: &mut TaskCtx) {}

        fn has_completed(&self) -> bool {
            self.done
        }

        fn should_cancel(&self, _ctx: &TaskCtx) -> bool {
            self.abort
        }
    }

    impl Trial for ClosenessTrial {
        fn fitness(&self) -> f64 {
            self.score
        }
    }

    fn settings() -> RapidSettings {
        RapidSettings {
            population_size: 8,
            bottleneck: 4,
            num_generations: 6,
            mutation_rate: 0.05,
            stagnation_mutation_rate: 0.2,
            stagnation_threshold: 0.01,
            seed: Some(99),
            gene_bounds: vec![Range { min: 0.0, max: 3.0 }],
            initial_values: None,
        }
    }

    fn factory(abort: bool) -> TrialFactory {
        Box::new(move |genome: &Genome| {
            let gene = genome.genes()[0];
            Box::new(ClosenessTrial {
                score: 100.0 / ((gene - 1.5).abs() + 1.0),
                done: false,
                abort,
            })
        })
    }

    fn run_to_completion(engine: &mut RapidEngine) -> usize {
        let mut ops = OperationState::new();
        let mut rig = SimRig::default();
        let mut cycles = 0;

        {
            let mut ctx = TaskCtx {
                time_s: 0.0,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            engine.begin(&mut ctx);
        }

        while !engine.has_completed() && cycles < 10_000 {
            let mut ctx = TaskCtx {
                time_s: cycles as f64 * 0.02,
                ops: &mut ops,
                io: &mut rig,
                policy: FaultPolicy::Strict,
            };
            engine.update(&mut ctx);
            cycles += 1;
        }

        cycles
    }

    #[test]
    fn test_engine_halts_after_all_generations() {
        let mut engine = RapidEngine::new(settings(), factory(false)).unwrap();
        let cycles = run_to_completion(&mut engine);

        assert!(engine.has_completed(), "did not halt in {} cycles", cycles);
        assert_eq!(engine.generation(), 5);

        let best = engine.best().expect("no best organism");
        assert!(best.is_evaluated());
        // The optimum is gene 1.5 with fitness 100; even a short run should
        // get most of the way there
        assert!(best.fitness() > 70.0, "best only {}", best.fitness());
    }

    #[test]
    fn test_engine_survives_all_trials_aborting() {
        let mut engine = RapidEngine::new(settings(), factory(true)).unwrap();
        run_to_completion(&mut engine);

        assert!(engine.has_completed());
        // Every organism was marked unfit, so no best was ever recorded
        // above the sentinel
        if let Some(best) = engine.best() {
            assert_eq!(best.fitness(), UNFIT_FITNESS);
        }
    }

    #[test]
    fn test_engine_rejects_bad_settings() {
        let mut s = settings();
        s.population_size = 1;
        assert!(RapidEngine::new(s, factory(false)).is_err());
    }

    #[test]
    fn test_mutation_rate_selection() {
        let s = settings();

        // First generation has no baseline
        assert_eq!(select_mutation_rate(None, 5.0, &s), s.mutation_rate);

        // A move larger than the threshold in either direction keeps the
        // base rate
        assert_eq!(select_mutation_rate(Some(5.0), 6.0, &s), s.mutation_rate);
        assert_eq!(select_mutation_rate(Some(5.0), 4.0, &s), s.mutation_rate);

        // A sub-threshold move accelerates
        assert_eq!(
            select_mutation_rate(Some(5.0), 5.005, &s),
            s.stagnation_mutation_rate
        );
    }
}
