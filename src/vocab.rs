use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{EOS_INDEX, EOS_TOKEN, PAD_INDEX, PAD_TOKEN, UNK_INDEX, UNK_TOKEN},
    error::{Error, Result},
    tokenizer::read_words,
};

const RESERVED: [&str; 3] = [PAD_TOKEN, UNK_TOKEN, EOS_TOKEN];

/// Bidirectional token <-> index table. The first entries are always
/// `<pad>`, `<unk>` and `<eos>` at their reserved indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabFile", into = "VocabFile")]
pub struct Vocab {
    tokens: Vec<String>,
    index: HashMap<String, i64>,
}

/// On-disk form: just the ordered token list.
#[derive(Serialize, Deserialize)]
struct VocabFile {
    tokens: Vec<String>,
}

impl TryFrom<VocabFile> for Vocab {
    type Error = Error;

    fn try_from(file: VocabFile) -> Result<Self> {
        for (i, reserved) in RESERVED.iter().enumerate() {
            if file.tokens.get(i).map(String::as_str) != Some(*reserved) {
                return Err(Error::Vocab(format!(
                    "expected reserved token {reserved} at index {i}"
                )));
            }
        }
        let mut index = HashMap::with_capacity(file.tokens.len());
        for (i, token) in file.tokens.iter().enumerate() {
            if index.insert(token.clone(), i as i64).is_some() {
                return Err(Error::Vocab(format!("duplicate token {token:?}")));
            }
        }
        Ok(Vocab {
            tokens: file.tokens,
            index,
        })
    }
}

impl From<Vocab> for VocabFile {
    fn from(vocab: Vocab) -> Self {
        VocabFile {
            tokens: vocab.tokens,
        }
    }
}

impl Vocab {
    /// Builds a vocabulary from the reserved entries followed by `tokens`
    /// in order. Repeats and reserved literals are ignored.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Vocab {
            tokens: Vec::new(),
            index: HashMap::new(),
        };
        for token in RESERVED {
            vocab.push(token.to_string());
        }
        for token in tokens {
            vocab.push(token.into());
        }
        vocab
    }

    /// Counts normalized words across every line of `paths` and keeps the
    /// `max_size` most frequent (all of them when `None`). Ties are broken
    /// alphabetically so the result is deterministic. Unreadable or non-UTF-8
    /// files are skipped with a warning, matching the dataset reader.
    pub fn from_corpus(paths: &[PathBuf], max_size: Option<usize>) -> Result<Self> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut read = 0;
        for path in paths {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    continue;
                }
            };
            read += 1;
            for line in text.lines() {
                for word in read_words(line) {
                    *counts.entry(word).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(word, _)| !RESERVED.contains(&word.as_str()))
            .collect();
        ranked.sort_by(|(a, a_count), (b, b_count)| b_count.cmp(a_count).then_with(|| a.cmp(b)));
        if let Some(max_size) = max_size {
            ranked.truncate(max_size);
        }
        debug!(
            "built vocabulary of {} words from {read} of {} files",
            ranked.len(),
            paths.len()
        );
        Ok(Self::from_tokens(ranked.into_iter().map(|(word, _)| word)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    fn push(&mut self, token: String) {
        if !self.index.contains_key(&token) {
            self.index.insert(token.clone(), self.tokens.len() as i64);
            self.tokens.push(token);
        }
    }

    /// Index of `token`, or the unknown index if it is not in the table.
    pub fn index(&self, token: &str) -> i64 {
        self.index.get(token).copied().unwrap_or(UNK_INDEX)
    }

    pub fn token(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.tokens.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn pad_index(&self) -> i64 {
        PAD_INDEX
    }

    pub fn unk_index(&self) -> i64 {
        UNK_INDEX
    }

    pub fn eos_index(&self) -> i64 {
        EOS_INDEX
    }

    /// Normalizes `line` and maps it to indices, terminated by `<eos>`.
    pub fn encode(&self, line: &str) -> Vec<i64> {
        read_words(line)
            .map(|word| self.index(&word))
            .chain(std::iter::once(EOS_INDEX))
            .collect()
    }
}
