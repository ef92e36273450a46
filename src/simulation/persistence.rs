//! Genome records on disk.
//!
//! Every genome is one JSON file named by its 1-based index, so a folder of
//! records reloads in the order it was written. History keeps one folder per
//! generation, or one champion file per generation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

use super::genome::Genome;

const CURRENT_RECORD_VERSION: u32 = 1;
const RECORD_EXTENSION: &str = "json";

/// Borrowing form used when writing, to avoid cloning the genome.
#[derive(Serialize)]
struct GenomeRecordRef<'a> {
    version: u32,
    genome: &'a Genome,
}

#[derive(Deserialize)]
struct GenomeRecord {
    version: u32,
    genome: Genome,
}

/// Path of record `index` inside `folder`.
pub fn record_path(folder: impl AsRef<Path>, index: usize) -> PathBuf {
    folder
        .as_ref()
        .join(format!("{index}.{RECORD_EXTENSION}"))
}

/// Subfolder holding one generation's history.
pub fn generation_folder(history: impl AsRef<Path>, generation: u32) -> PathBuf {
    history.as_ref().join(generation.to_string())
}

/// Writes a single genome record.
pub fn save_genome(path: impl AsRef<Path>, genome: &Genome) -> Result<()> {
    let path = path.as_ref();
    let record = GenomeRecordRef {
        version: CURRENT_RECORD_VERSION,
        genome,
    };
    let data =
        serde_json::to_string(&record).map_err(|e| EvolutionError::persistence(path, e))?;
    fs::write(path, data).map_err(|e| EvolutionError::persistence(path, e))
}

/// Reads and validates a single genome record.
pub fn load_genome(path: impl AsRef<Path>) -> Result<Genome> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| EvolutionError::persistence(path, e))?;
    let record: GenomeRecord =
        serde_json::from_str(&content).map_err(|e| EvolutionError::persistence(path, e))?;

    if record.version > CURRENT_RECORD_VERSION {
        return Err(EvolutionError::persistence(
            path,
            format!(
                "record version {} is newer than supported version {CURRENT_RECORD_VERSION}",
                record.version
            ),
        ));
    }

    record
        .genome
        .validate()
        .map_err(|e| EvolutionError::persistence(path, e))?;
    Ok(record.genome)
}

/// Replaces the contents of `folder` with one record per genome.
///
/// Returns the number of records written.
pub fn write_folder<'a>(
    folder: impl AsRef<Path>,
    genomes: impl IntoIterator<Item = &'a Genome>,
) -> Result<usize> {
    let folder = folder.as_ref();
    if folder.exists() {
        fs::remove_dir_all(folder).map_err(|e| EvolutionError::persistence(folder, e))?;
    }
    fs::create_dir_all(folder).map_err(|e| EvolutionError::persistence(folder, e))?;

    let mut written = 0;
    for (i, genome) in genomes.into_iter().enumerate() {
        save_genome(record_path(folder, i + 1), genome)?;
        written += 1;
    }

    tracing::debug!("wrote {} genome records to {}", written, folder.display());
    Ok(written)
}

/// Loads every record in `folder`, ordered by index.
///
/// Fails if the folder is missing or empty, if any record is corrupt, or if
/// the records do not all share one structure.
pub fn read_folder(folder: impl AsRef<Path>) -> Result<Vec<Genome>> {
    let folder = folder.as_ref();
    let entries = fs::read_dir(folder).map_err(|e| EvolutionError::persistence(folder, e))?;

    let mut indexed = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| EvolutionError::persistence(folder, e))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }
        match path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<usize>().ok())
        {
            Some(index) => indexed.push((index, path)),
            None => tracing::debug!("skipping unindexed file {}", path.display()),
        }
    }

    if indexed.is_empty() {
        return Err(EvolutionError::persistence(folder, "no genome records found"));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let genomes = indexed
        .iter()
        .map(|(_, path)| load_genome(path))
        .collect::<Result<Vec<_>>>()?;

    let structure = genomes[0].structure();
    if let Some(i) = genomes.iter().position(|g| g.structure() != structure) {
        return Err(EvolutionError::structure_mismatch(format!(
            "record {} in {} differs in structure from the first record",
            indexed[i].0,
            folder.display()
        )));
    }

    tracing::debug!("read {} genome records from {}", genomes.len(), folder.display());
    Ok(genomes)
}

/// Removes the history left by an earlier run, if any.
pub fn clear_history(history: impl AsRef<Path>) -> Result<()> {
    let history = history.as_ref();
    if history.exists() {
        fs::remove_dir_all(history).map_err(|e| EvolutionError::persistence(history, e))?;
        tracing::debug!("cleared previous history in {}", history.display());
    }
    Ok(())
}

/// Generation numbers saved in `history`, ascending.
///
/// Champion histories are flat `<generation>.json` records; every other
/// layout has one numbered subfolder per generation.
pub fn saved_generations(history: impl AsRef<Path>, champs: bool) -> Result<Vec<u32>> {
    let history = history.as_ref();
    let entries = fs::read_dir(history).map_err(|e| EvolutionError::persistence(history, e))?;

    let mut generations = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| EvolutionError::persistence(history, e))?
            .path();
        let name = if champs {
            let is_record = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION);
            is_record.then(|| path.file_stem()).flatten()
        } else if path.is_dir() {
            path.file_name()
        } else {
            None
        };
        if let Some(generation) = name
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<u32>().ok())
        {
            generations.push(generation);
        }
    }

    if generations.is_empty() {
        return Err(EvolutionError::persistence(history, "no saved generations found"));
    }
    generations.sort_unstable();
    Ok(generations)
}

/// Adds the champion of `generation` to a flat champion history.
pub fn write_champion(history: impl AsRef<Path>, generation: u32, genome: &Genome) -> Result<()> {
    let history = history.as_ref();
    fs::create_dir_all(history).map_err(|e| EvolutionError::persistence(history, e))?;
    save_genome(record_path(history, generation as usize), genome)
}
