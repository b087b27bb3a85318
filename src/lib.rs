//! Building blocks for training a recurrent sentence VAE language model on
//! top of `tch`: configuration, text normalization, vocabulary and batching,
//! word dropout, KL annealing, optimizer selection and a few layers.

pub mod anneal;
pub mod batch;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod display;
pub mod dropout;
pub mod error;
pub mod grouper;
pub mod layers;
pub mod optim;
pub mod tokenizer;
pub mod vocab;

pub use error::{Error, Result};
