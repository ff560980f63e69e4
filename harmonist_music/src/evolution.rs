// Genetic search over chord sequences.
//
// The controller owns one run: it seeds a random population from the key's
// chord pool, then for a fixed number of generations selects parent pairs by
// roulette wheel, breeds children (crossover then mutation), scores them, and
// keeps the fittest `population_size` of parents plus children. The fittest
// member of the final population is the result.
//
// Phases: Uninitialized -> Iterating { generation } -> Terminal. Generation
// g + 1 depends on generation g's full sorted population, so generations run
// strictly in order. Within a generation, scoring and breeding fan out over
// rayon; every child gets its own forked random stream, taken in a fixed
// order before the fan-out, so a seeded run is reproducible on any number of
// threads.
//
// A generation is computed into temporaries and only swapped in once it is
// complete, so the population is always consistent between generations. The
// observer passed to `run_with` is called at each boundary and may stop the
// run early.
//
// Depends on fitness.rs for scoring, selection.rs for parent draws and
// variation.rs for crossover and mutation.

use crate::chord::Accompaniment;
use crate::error::{Error, Result};
use crate::fitness::{FitnessEvaluator, FitnessWeights};
use crate::key::ChordPool;
use crate::melody::Melody;
use crate::selection::select_parents;
use crate::variation::{MUTATION_RATE, crossover, mutate};
use harmonist_prng::HarmonyRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tracing::{debug, info};

/// Evolution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Number of generations to run after the initial population.
    pub generations: usize,
    /// Members kept after every generation.
    pub population_size: usize,
    /// Children bred per generation, as a percentage of `population_size`.
    pub new_members_percentage: u32,
    /// Whether silent bars are part of the chord pool.
    pub allow_rest_chords: bool,
    /// Per-bar mutation probability.
    pub mutation_rate: f64,
    /// Fixed seed for a reproducible run; drawn from the clock if absent.
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            generations: 100,
            population_size: 1000,
            new_members_percentage: 30,
            allow_rest_chords: false,
            mutation_rate: MUTATION_RATE,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Children (and parent pairs) per generation.
    pub fn children_per_generation(&self) -> usize {
        self.new_members_percentage as usize * self.population_size / 100
    }

    pub fn validate(&self) -> Result<()> {
        if self.generations == 0 {
            return Err(Error::Config("generations must be positive".into()));
        }
        if self.population_size == 0 {
            return Err(Error::Config("population_size must be positive".into()));
        }
        if self.new_members_percentage > 100 {
            return Err(Error::Config(format!(
                "new_members_percentage must be within 0..=100, got {}",
                self.new_members_percentage
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(Error::Config(format!(
                "mutation_rate must be within 0..=1, got {}",
                self.mutation_rate
            )));
        }
        let children = self.children_per_generation();
        if children * 2 > self.population_size {
            return Err(Error::Config(format!(
                "{children} children per generation need {} distinct parents but population_size is {}",
                children * 2,
                self.population_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// `generation` generations have completed (0 = initial population only).
    Iterating { generation: usize },
    Terminal,
}

/// One scored population member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub accompaniment: Accompaniment,
    pub fitness: f64,
}

/// Fitness summary after a completed generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    /// 1-based index of the generation just completed.
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
}

pub struct Evolution<'a> {
    config: EvolutionConfig,
    evaluator: FitnessEvaluator<'a>,
    pool: ChordPool,
    bars: usize,
    seed: u64,
    rng: HarmonyRng,
    phase: Phase,
    population: Vec<Accompaniment>,
    fitnesses: Vec<f64>,
    fitness_sum: f64,
}

impl<'a> Evolution<'a> {
    /// Validate the configuration and build the chord pool. Fails before any
    /// population exists.
    pub fn new(melody: &'a Melody, config: EvolutionConfig, weights: FitnessWeights) -> Result<Self> {
        config.validate()?;
        weights.validate()?;
        let pool = melody.key().get_chords(config.allow_rest_chords);
        if pool.is_empty() {
            return Err(Error::EmptyPool);
        }
        let seed = config
            .seed
            .unwrap_or_else(|| HarmonyRng::from_entropy().next_u64());
        Ok(Evolution {
            evaluator: FitnessEvaluator::new(melody, weights),
            bars: melody.size_in_bars(),
            rng: HarmonyRng::new(seed),
            seed,
            pool,
            config,
            phase: Phase::Uninitialized,
            population: Vec::new(),
            fitnesses: Vec::new(),
            fitness_sum: 0.0,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &FitnessEvaluator<'a> {
        &self.evaluator
    }

    pub fn pool(&self) -> &ChordPool {
        &self.pool
    }

    /// Seed actually used (the configured one, or the clock-derived one).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn population(&self) -> &[Accompaniment] {
        &self.population
    }

    pub fn fitnesses(&self) -> &[f64] {
        &self.fitnesses
    }

    /// Build and score the initial random population. Only valid before the
    /// first generation; a started run is never reset.
    pub fn initialize(&mut self) -> Result<()> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Iterating { generation } => {
                return Err(Error::AlreadyInitialized { generation });
            }
            Phase::Terminal => {
                return Err(Error::RunFinished {
                    generations: self.config.generations,
                });
            }
        }
        let chords = self.pool.chords();
        let bars = self.bars;
        let streams: Vec<HarmonyRng> = (0..self.config.population_size)
            .map(|_| self.rng.fork())
            .collect();
        let population: Vec<Accompaniment> = streams
            .into_par_iter()
            .map(|mut rng| {
                (0..bars)
                    .map(|_| chords[rng.range_usize(0, chords.len())])
                    .collect()
            })
            .collect();
        let fitnesses = self.score_all(&population);

        info!(
            seed = self.seed,
            bars,
            pool = chords.len(),
            population = population.len(),
            "initial population ready"
        );
        self.commit(population, fitnesses);
        self.phase = Phase::Iterating { generation: 0 };
        Ok(())
    }

    /// Run one generation, initializing first if needed.
    pub fn step(&mut self) -> Result<GenerationStats> {
        let completed = match self.phase {
            Phase::Uninitialized => {
                self.initialize()?;
                0
            }
            Phase::Iterating { generation } => generation,
            Phase::Terminal => {
                return Err(Error::RunFinished {
                    generations: self.config.generations,
                });
            }
        };

        let n_children = self.config.children_per_generation();
        let (fathers, mothers) = select_parents(
            &self.population,
            &self.fitnesses,
            self.fitness_sum,
            n_children,
            &mut self.rng,
        )?;

        let streams: Vec<HarmonyRng> = (0..n_children).map(|_| self.rng.fork()).collect();
        let pool = &self.pool;
        let rate = self.config.mutation_rate;
        let children: Vec<Accompaniment> = fathers
            .par_iter()
            .zip(&mothers)
            .zip(streams)
            .map(|((father, mother), mut rng)| {
                let child = crossover(father, mother, &mut rng);
                mutate(child, pool, rate, &mut rng)
            })
            .collect();
        let child_fitnesses = self.score_all(&children);

        // Parents first, then children, so the stable sort keeps incumbents
        // below equally fit newcomers.
        let mut merged: Vec<(Accompaniment, f64)> = std::mem::take(&mut self.population)
            .into_iter()
            .zip(std::mem::take(&mut self.fitnesses))
            .chain(children.into_iter().zip(child_fitnesses))
            .collect();
        merged.sort_by(|a, b| a.1.total_cmp(&b.1));
        let survivors = merged.split_off(n_children);
        let (population, fitnesses): (Vec<_>, Vec<_>) = survivors.into_iter().unzip();
        debug_assert_eq!(population.len(), self.config.population_size);
        self.commit(population, fitnesses);

        let generation = completed + 1;
        self.phase = if generation >= self.config.generations {
            Phase::Terminal
        } else {
            Phase::Iterating { generation }
        };

        let stats = self.stats(generation);
        debug!(
            generation,
            best = stats.best,
            mean = stats.mean,
            worst = stats.worst,
            "generation complete"
        );
        Ok(stats)
    }

    /// Run every remaining generation and return the best member.
    pub fn run(&mut self) -> Result<Member> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Like `run`, but calls `observer` after each generation. Returning
    /// `ControlFlow::Break` stops the run at that boundary.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<Member>
    where
        F: FnMut(&GenerationStats) -> ControlFlow<()>,
    {
        if self.phase == Phase::Uninitialized {
            self.initialize()?;
        }
        while self.phase != Phase::Terminal {
            let stats = self.step()?;
            if observer(&stats).is_break() {
                info!(generation = stats.generation, "run stopped early");
                break;
            }
        }
        let best = self.best().ok_or(Error::EmptyPool)?;
        let breakdown = self.evaluator.breakdown(&best.accompaniment);
        info!(
            fitness = best.fitness,
            consonance = breakdown.consonance,
            repetition = breakdown.repetition,
            progression = breakdown.progression,
            accompaniment = %best.accompaniment,
            "best accompaniment"
        );
        Ok(best)
    }

    /// The fittest member; ties go to the later (newer) one.
    pub fn best(&self) -> Option<Member> {
        self.population
            .iter()
            .zip(&self.fitnesses)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(accompaniment, &fitness)| Member {
                accompaniment: accompaniment.clone(),
                fitness,
            })
    }

    fn score_all(&self, population: &[Accompaniment]) -> Vec<f64> {
        let evaluator = &self.evaluator;
        population.par_iter().map(|a| evaluator.evaluate(a)).collect()
    }

    fn commit(&mut self, population: Vec<Accompaniment>, fitnesses: Vec<f64>) {
        self.fitness_sum = fitnesses.iter().sum();
        self.population = population;
        self.fitnesses = fitnesses;
    }

    fn stats(&self, generation: usize) -> GenerationStats {
        let best = self.fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let worst = self.fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = self.fitness_sum / self.fitnesses.len().max(1) as f64;
        GenerationStats {
            generation,
            best,
            mean,
            worst,
        }
    }
}
