#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use flappy_evo::Config;
use flappy_evo::config::CreationMode;
use flappy_evo::simulation::genome::Genome;
use flappy_evo::simulation::persistence::{
    generation_folder, read_folder, record_path, save_genome, saved_generations,
};
use flappy_evo::simulation::population::HistoryKind;
use flappy_evo::simulation::trainer::Trainer;
use tempfile::tempdir;

/// Small, fast settings that write everything below `root`.
fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.population.size = 10;
    config.population.total_generations = 2;
    config.population.workers = 2;
    config.population.parents_folder = root.join("latest_genomes");
    config.history.mode = HistoryKind::Absolute;
    config.history.value = 3.0;
    config.history.folder = root.join("history");
    config.evolution.parent_percentage = 0.3;
    config.simulation.goal_score = 2000;
    config.simulation.seed = Some(11);
    config
}

#[test]
fn test_run_writes_parents_and_history() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let mut trainer = Trainer::new(config.clone()).unwrap();
    let summary = trainer.run().unwrap();

    assert_eq!(summary.persistence_failures, 0);
    assert!(summary.reports.len() == 2 || summary.goal_reached);
    for (i, report) in summary.reports.iter().enumerate() {
        assert_eq!(report.generation as usize, i + 1);
        assert!(report.champion_fitness > 0);
        assert!(report.parent_average_fitness >= report.average_fitness);

        let folder = generation_folder(&config.history.folder, report.generation);
        assert_eq!(fs::read_dir(folder).unwrap().count(), 3);
    }

    assert_eq!(read_folder(&config.population.parents_folder).unwrap().len(), 3);
}

#[test]
fn test_run_stops_at_goal_score() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.population.total_generations = 5;
    // random genomes only sometimes pass the first obstacle
    config.simulation.goal_score = 1;

    let mut trainer = Trainer::new(config).unwrap();
    let summary = trainer.run().unwrap();

    let last = summary.reports.last().unwrap();
    assert_eq!(summary.goal_reached, last.goal_reached);
    if summary.goal_reached {
        assert!(last.champion_score >= 1);
        assert!(summary.reports[..summary.reports.len() - 1]
            .iter()
            .all(|r| !r.goal_reached));
    } else {
        assert_eq!(summary.reports.len(), 5);
    }
}

#[test]
fn test_load_mode_continues_from_parents() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    Trainer::new(config.clone()).unwrap().run().unwrap();

    let mut resumed = test_config(dir.path());
    resumed.population.creation = CreationMode::Load;
    resumed.population.load_folder = config.population.parents_folder.clone();
    resumed.history.folder = dir.path().join("resumed_history");

    let trainer = Trainer::new(resumed).unwrap();
    let population = trainer.population();
    assert_eq!(population.candidates.len(), 10);
    assert_eq!(population.size, 10);
    assert_eq!(population.current_generation, 2);

    let parents = read_folder(&config.population.parents_folder).unwrap();
    for (candidate, parent) in population.candidates.iter().zip(&parents) {
        assert_eq!(*candidate.genome, *parent);
    }
}

#[test]
fn test_load_mode_without_records_fails() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.population.creation = CreationMode::Load;
    config.population.load_folder = dir.path().join("nothing_here");

    assert!(Trainer::new(config).is_err());
}

#[test]
fn test_unwritable_history_is_skipped() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a folder").unwrap();
    config.history.folder = blocker.join("history");
    config.population.total_generations = 1;

    let summary = Trainer::new(config).unwrap().run().unwrap();

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.persistence_failures, 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.population.workers = 0;

    assert!(Trainer::new(config).is_err());
}

#[test]
fn test_new_run_replaces_old_champions() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.history.mode = HistoryKind::Champ;
    fs::create_dir_all(&config.history.folder).unwrap();
    let stale = Genome::new(&config.structure());
    for generation in 1..=5 {
        save_genome(record_path(&config.history.folder, generation), &stale).unwrap();
    }

    let summary = Trainer::new(config.clone()).unwrap().run().unwrap();

    let expected: Vec<u32> = summary.reports.iter().map(|r| r.generation).collect();
    assert_eq!(
        saved_generations(&config.history.folder, true).unwrap(),
        expected
    );
    assert!(!record_path(&config.history.folder, 5).exists());
}

#[test]
fn test_parents_folder_containing_history_is_rejected() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.population.parents_folder = dir.path().to_path_buf();

    assert!(Trainer::new(config).is_err());
}
