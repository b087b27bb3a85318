use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::{
    anneal::KlAnneal,
    error::{Error, Result},
    optim::{OptimizerKind, OptimizerSettings},
};

/// Hyperparameters and paths for a sentence VAE run. Parsed once at
/// startup and handed out by reference.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "seqvae", about = "Sentence VAE language model data pipeline")]
pub struct Config {
    /// Data path
    #[arg(long, default_value = "data")]
    pub data_path: PathBuf,

    /// Save file
    #[arg(long, default_value = "models/recent.dat")]
    pub save_file: PathBuf,

    /// File to load model from
    #[arg(long, default_value = "")]
    pub load_file: String,

    /// Vocabulary file (JSON); built from the data path when missing
    #[arg(long, default_value = "data/vocab.json")]
    pub vocab_file: PathBuf,

    /// Keep only this many of the most frequent words when building the vocabulary
    #[arg(long)]
    pub max_vocab_size: Option<usize>,

    /// Batch size
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of learnable dimensions in word embeddings
    #[arg(long, default_value_t = 352)]
    pub word_emb_size: i64,

    /// Number of RNN layers
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    /// RNN hidden state size
    #[arg(long, default_value_t = 384)]
    pub hidden_size: i64,

    /// Latent representation size
    #[arg(long, default_value_t = 16)]
    pub latent_size: i64,

    /// Word dropout probability for decoder input
    #[arg(long, default_value_t = 0.66)]
    pub word_dropout: f64,

    /// Number of classes to sample for softmax
    #[arg(long, default_value_t = 1000)]
    pub softmax_samples: i64,

    /// Gradient clipping
    #[arg(long, default_value_t = 20.0)]
    pub max_grad_norm: f64,

    /// The step to reach 0.5 for KL divergence weight annealing
    #[arg(long, default_value_t = 3500)]
    pub anneal_bias: u64,

    /// Training mode, turn off for testing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub training: bool,

    /// Optimizer to use (sgd, adam, adagrad, adadelta)
    #[arg(long, default_value = "adam", value_parser = parse_optimizer)]
    pub optimizer: OptimizerKind,

    /// Optimizer initial learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Maximum number of epochs to run for
    #[arg(long, default_value_t = 10000)]
    pub max_epoch: u64,

    /// Maximum number of steps to run for
    #[arg(long, default_value_t = 9999999)]
    pub max_steps: u64,

    /// Print every these many steps
    #[arg(long, default_value_t = 50)]
    pub print_every: u64,

    /// Save every these many steps (0 to disable, -1 for each epoch)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub save_every: i64,

    /// Overwrite the same file each time
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub save_overwrite: bool,

    /// Validate every these many epochs (0 to disable)
    #[arg(long, default_value_t = 1)]
    pub validate_every: u64,

    /// Seed for data splitting and word dropout; drawn from entropy when unset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to libtorch_cuda.so, preloaded because libtorch loads CUDA lazily
    #[arg(long)]
    pub libtorch_cuda: Option<PathBuf>,
}

fn parse_optimizer(name: &str) -> std::result::Result<OptimizerKind, String> {
    name.parse().map_err(|err: Error| err.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["seqvae"])
    }
}

impl Config {
    /// Checks the invariants clap cannot express.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch_size", self.batch_size as i64),
            ("word_emb_size", self.word_emb_size),
            ("num_layers", self.num_layers as i64),
            ("hidden_size", self.hidden_size),
            ("latent_size", self.latent_size),
            ("softmax_samples", self.softmax_samples),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.word_dropout) {
            return Err(Error::InvalidConfig(format!(
                "word_dropout must be a probability, got {}",
                self.word_dropout
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.max_grad_norm > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "max_grad_norm must be positive, got {}",
                self.max_grad_norm
            )));
        }
        if self.save_every < -1 {
            return Err(Error::InvalidConfig(format!(
                "save_every must be -1, 0 or a step count, got {}",
                self.save_every
            )));
        }
        Ok(())
    }

    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings::new(self.optimizer, self.learning_rate)
    }

    pub fn kl_anneal(&self) -> KlAnneal {
        KlAnneal::centered(self.anneal_bias)
    }
}
