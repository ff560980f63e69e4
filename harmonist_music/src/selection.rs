// Fitness-proportional ("roulette wheel") parent selection.
//
// Parents are drawn without replacement: after each draw the chosen member
// leaves the candidate set and the wheel is rebuilt from the remaining
// fitnesses. Draws alternate between the fathers and mothers lists, and the
// two lists are consumed pairwise by index.
//
// The candidate set is a list of population indices; chromosomes are only
// cloned once they have been drawn.

use crate::chord::Accompaniment;
use crate::error::{Error, Result};
use harmonist_prng::HarmonyRng;

/// Turn fitnesses into probabilities that sum to exactly 1.
///
/// Rounding can leave the raw quotients slightly off. A shortfall is added
/// to the last probability; an excess is taken evenly from all of them.
pub fn calculate_probabilities(fitnesses: &[f64], fitness_sum: f64) -> Vec<f64> {
    let mut probabilities: Vec<f64> = fitnesses.iter().map(|f| f / fitness_sum).collect();
    let total: f64 = probabilities.iter().sum();
    if total < 1.0 {
        if let Some(last) = probabilities.last_mut() {
            *last += 1.0 - total;
        }
    } else if total > 1.0 {
        let delta = (total - 1.0) / probabilities.len() as f64;
        for p in probabilities.iter_mut() {
            *p -= delta;
        }
    }
    probabilities
}

/// Draw `n_pairs` father/mother pairs from the population.
///
/// Fails if the population cannot supply `2 * n_pairs` distinct parents, or
/// if the remaining fitness mass is not positive when a draw is needed.
pub fn select_parents(
    population: &[Accompaniment],
    fitnesses: &[f64],
    fitness_sum: f64,
    n_pairs: usize,
    rng: &mut HarmonyRng,
) -> Result<(Vec<Accompaniment>, Vec<Accompaniment>)> {
    if fitnesses.len() != population.len() {
        return Err(Error::Config(format!(
            "{} fitness values for {} population members",
            fitnesses.len(),
            population.len()
        )));
    }
    let requested = n_pairs * 2;
    if requested > population.len() {
        return Err(Error::NotEnoughParents {
            requested,
            available: population.len(),
        });
    }

    let mut candidates: Vec<usize> = (0..population.len()).collect();
    let mut remaining_sum = fitness_sum;
    let mut fathers = Vec::with_capacity(n_pairs);
    let mut mothers = Vec::with_capacity(n_pairs);

    for draw in 0..requested {
        if remaining_sum <= 0.0 || remaining_sum.is_nan() {
            return Err(Error::ZeroFitnessSum(remaining_sum));
        }
        let weights: Vec<f64> = candidates.iter().map(|&i| fitnesses[i]).collect();
        let probabilities = calculate_probabilities(&weights, remaining_sum);
        let slot = rng
            .weighted_index(&probabilities)
            .ok_or(Error::ZeroFitnessSum(remaining_sum))?;
        let chosen = candidates.swap_remove(slot);
        remaining_sum -= fitnesses[chosen];

        let parent = population[chosen].clone();
        if draw % 2 == 0 {
            fathers.push(parent);
        } else {
            mothers.push(parent);
        }
    }

    Ok((fathers, mothers))
}
