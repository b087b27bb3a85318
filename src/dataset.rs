use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use rand::Rng;
use walkdir::WalkDir;

use crate::{
    batch::{Alignment, SentenceBatch},
    constants::{PAD_INDEX, TRAIN_VALIDATION_SPLIT},
    grouper::{GroupExt, Grouper},
    vocab::Vocab,
};

/// A corpus directory split file-by-file into training and validation sets.
#[derive(Debug, Clone)]
pub struct DataSet {
    training: DataSubset,
    validation: DataSubset,
}

impl DataSet {
    pub fn new<R: Rng + ?Sized>(
        data_dir: &Path,
        vocab: Arc<Vocab>,
        batch_size: usize,
        rng: &mut R,
    ) -> Self {
        // Enumerate all files in the data directory and split them into training and validation sets.
        Self::from_files(Self::enumerate_files(data_dir), vocab, batch_size, rng)
    }

    pub fn from_files<R: Rng + ?Sized>(
        file_paths: Vec<PathBuf>,
        vocab: Arc<Vocab>,
        batch_size: usize,
        rng: &mut R,
    ) -> Self {
        let mut training_paths = Vec::with_capacity(file_paths.len());
        let mut validation_paths = Vec::new();
        for path in file_paths {
            if rng.gen_bool(TRAIN_VALIDATION_SPLIT) {
                training_paths.push(path);
            } else {
                validation_paths.push(path);
            }
        }
        debug!(
            "{} training files, {} validation files",
            training_paths.len(),
            validation_paths.len()
        );
        DataSet {
            training: DataSubset::new(training_paths, vocab.clone(), batch_size),
            validation: DataSubset::new(validation_paths, vocab, batch_size),
        }
    }

    /// Every regular file under `data_dir`, in a stable order.
    pub fn enumerate_files(data_dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(data_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }

    /// Drops `excluded` from `files`, comparing canonical paths so that
    /// `./data/vocab.json` and `data/vocab.json` name the same file. Nothing is
    /// dropped when `excluded` does not exist yet.
    pub fn exclude_file(files: Vec<PathBuf>, excluded: &Path) -> Vec<PathBuf> {
        let Ok(excluded) = excluded.canonicalize() else {
            return files;
        };
        files
            .into_iter()
            .filter(|path| path.canonicalize().map_or(true, |path| path != excluded))
            .collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.training.paths.iter().chain(&self.validation.paths)
    }

    pub fn get_training_dataset(&self) -> DataSubset {
        self.training.clone()
    }

    pub fn get_validation_dataset(&self) -> DataSubset {
        self.validation.clone()
    }
}

/// One pass over a set of files, yielding left-aligned batches of
/// `batch_size` sentences. Clone it to start another epoch.
#[derive(Debug, Clone)]
pub struct DataSubset {
    paths: Vec<PathBuf>,
    batches: Grouper<Sentences>,
}

impl DataSubset {
    pub fn new(paths: Vec<PathBuf>, vocab: Arc<Vocab>, batch_size: usize) -> Self {
        let sentences = Sentences {
            // Files are popped from the back, so reverse to read them in order.
            pending: paths.iter().rev().cloned().collect(),
            lines: Vec::new().into_iter(),
            vocab,
        };
        DataSubset {
            paths,
            batches: sentences.grouper(batch_size, Vec::new()),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Iterator for DataSubset {
    type Item = SentenceBatch;

    /// Returns the next batch; the final one is padded with empty sentences.
    fn next(&mut self) -> Option<Self::Item> {
        let group = self.batches.next()?;
        Some(SentenceBatch::from_sentences(&group, Alignment::Left, PAD_INDEX))
    }
}

/// Lazily reads files one at a time and encodes each non-empty line.
#[derive(Debug, Clone)]
struct Sentences {
    pending: Vec<PathBuf>,
    lines: std::vec::IntoIter<String>,
    vocab: Arc<Vocab>,
}

impl Iterator for Sentences {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for line in self.lines.by_ref() {
                let sentence = self.vocab.encode(&line);
                // Only <eos> means the line had no words.
                if sentence.len() > 1 {
                    return Some(sentence);
                }
            }
            let path = self.pending.pop()?;
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    self.lines = text
                        .lines()
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                        .into_iter();
                }
                Err(err) => warn!("skipping {}: {err}", path.display()),
            }
        }
    }
}
