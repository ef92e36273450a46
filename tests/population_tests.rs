#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use std::sync::Arc;

use flappy_evo::EvolutionError;
use flappy_evo::simulation::genome::{
    Activation, CrossoverKind, Genome, LayerSpec, MutationKind, Structure,
};
use flappy_evo::simulation::params::SimulationParams;
use flappy_evo::simulation::population::{HistoryKind, HistoryMode, Population};
use flappy_evo::simulation::simulator::evaluate;
use proptest::prelude::*;
use rayon::ThreadPoolBuilder;

fn create_test_structure() -> Structure {
    Structure::new(vec![LayerSpec::new(1, Activation::Sigmoid)])
}

/// Population of `fitnesses.len()` random genomes with preset fitness values.
fn population_with_fitness(fitnesses: &[u32]) -> Population {
    let mut population = Population::new(fitnesses.len());
    population.new_genomes(&create_test_structure());
    for (candidate, &fitness) in population.candidates.iter_mut().zip(fitnesses) {
        candidate.fitness = fitness;
    }
    population
}

#[test]
fn test_new_genomes_fills_population() {
    let mut population = Population::new(12);
    population.new_genomes(&create_test_structure());

    assert_eq!(population.candidates.len(), 12);
    assert_eq!(population.current_generation, 1);
    assert!(population.candidates.iter().all(|c| c.fitness == 0));
}

#[test]
fn test_cull_keeps_fittest_parents() {
    let mut population = population_with_fitness(&[5, 40, 12, 3, 40, 8, 25, 1, 30, 9]);
    let fourth_genome = Arc::clone(&population.candidates[4].genome);
    let average_before = 173.0 / 10.0;

    population.cull(0.3);

    let kept: Vec<u32> = population.candidates.iter().map(|c| c.fitness).collect();
    assert_eq!(kept, vec![40, 40, 30]);
    // equal fitness keeps submission order
    assert!(Arc::ptr_eq(&population.candidates[1].genome, &fourth_genome));
    assert!(population.average_fitness() > average_before);
    assert!((population.average_fitness() - 110.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_parent_count_rounds_up() {
    let population = population_with_fitness(&[1; 10]);

    assert_eq!(population.parent_count(0.7), 7);
    assert_eq!(population.parent_count(0.25), 3);
    assert_eq!(population.parent_count(0.01), 1);
    assert_eq!(population.parent_count(1.0), 10);
}

#[test]
fn test_champion_prefers_first_on_ties() {
    let population = population_with_fitness(&[3, 9, 9, 2]);

    let champion = population.champion().unwrap();
    assert_eq!(champion.fitness, 9);
    assert!(Arc::ptr_eq(
        &champion.genome,
        &population.candidates[1].genome
    ));
}

#[test]
fn test_repopulate_restores_size() {
    let mut population = population_with_fitness(&[4, 8, 15, 16, 23, 42, 7, 1]);
    population.cull(0.25);
    let parents: Vec<Arc<Genome>> = population
        .candidates
        .iter()
        .map(|c| Arc::clone(&c.genome))
        .collect();

    population
        .repopulate(CrossoverKind::OnePoint, MutationKind::Gaussian, 0.1)
        .unwrap();

    assert_eq!(population.candidates.len(), 8);
    assert_eq!(population.current_generation, 2);
    for (candidate, parent) in population.candidates.iter().zip(&parents) {
        assert!(Arc::ptr_eq(&candidate.genome, parent));
        assert_eq!(candidate.fitness, 0);
    }
    for child in &population.candidates[parents.len()..] {
        assert_eq!(child.genome.structure(), create_test_structure());
    }
}

#[test]
fn test_repopulate_empty_population_fails() {
    let mut population = Population::new(5);

    let err = population
        .repopulate(CrossoverKind::Uniform, MutationKind::Uniform, 0.1)
        .unwrap_err();
    assert!(matches!(err, EvolutionError::EmptyPopulation));
}

#[test]
fn test_history_mode_from_config() {
    assert_eq!(
        HistoryMode::from_config(HistoryKind::Absolute, 50.0).unwrap(),
        HistoryMode::Absolute(50)
    );
    assert_eq!(
        HistoryMode::from_config(HistoryKind::Champ, 0.0).unwrap(),
        HistoryMode::Champ
    );
    assert!(HistoryMode::from_config(HistoryKind::Absolute, 0.0).is_err());
    assert!(HistoryMode::from_config(HistoryKind::Percentage, 1.5).is_err());
}

#[test]
fn test_history_kept_count() {
    assert_eq!(HistoryMode::None.kept_count(100), 0);
    assert_eq!(HistoryMode::Champ.kept_count(100), 1);
    assert_eq!(HistoryMode::Absolute(50).kept_count(100), 50);
    assert_eq!(HistoryMode::Absolute(500).kept_count(100), 100);
    assert_eq!(HistoryMode::Percentage(0.1).kept_count(100), 10);
    assert_eq!(HistoryMode::Percentage(0.001).kept_count(100), 1);
    assert_eq!(HistoryMode::Entire.kept_count(100), 100);
}

#[test]
fn test_parallel_evaluation_matches_sequential() {
    let params = SimulationParams {
        goal_score: 3,
        seed: Some(17),
    };
    let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    let mut population = Population::new(10);
    population.new_genomes(&create_test_structure());

    population.evaluate(&pool, &params).unwrap();

    assert_eq!(population.candidates.len(), 10);
    for candidate in &population.candidates {
        let expected = evaluate(Arc::clone(&candidate.genome), &params).unwrap();
        assert!(candidate.fitness > 0);
        assert_eq!(candidate.fitness, expected.fitness);
        assert_eq!(candidate.score, expected.score);
    }

    let mean = population
        .candidates
        .iter()
        .map(|c| f64::from(c.fitness))
        .sum::<f64>()
        / 10.0;
    assert!((population.average_fitness() - mean).abs() < 1e-9);
    assert!(population.max_score() <= params.goal_score);
}

#[test]
fn test_full_generation_cycle() {
    let params = SimulationParams {
        goal_score: 2,
        seed: Some(3),
    };
    let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    let mut population = Population::new(20);
    population.new_genomes(&create_test_structure());

    for generation in 1..=3 {
        assert_eq!(population.current_generation, generation);
        population.evaluate(&pool, &params).unwrap();
        population.cull(0.2);
        assert_eq!(population.candidates.len(), 4);
        population
            .repopulate(CrossoverKind::Uniform, MutationKind::Gaussian, 0.2)
            .unwrap();
        assert_eq!(population.candidates.len(), 20);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_cull_count_and_order(
        fitnesses in prop::collection::vec(0u32..500, 1..40),
        percentage in 0.01f64..=1.0
    ) {
        let mut population = population_with_fitness(&fitnesses);
        let expected = ((fitnesses.len() as f64 * percentage) - 1e-9).ceil().max(1.0) as usize;

        population.cull(percentage);

        prop_assert_eq!(population.candidates.len(), expected.min(fitnesses.len()));
        let mut sorted = fitnesses.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let kept: Vec<u32> = population.candidates.iter().map(|c| c.fitness).collect();
        prop_assert_eq!(&kept[..], &sorted[..kept.len()]);
    }
}
