use std::{
    ffi::CString,
    io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use rand::{SeedableRng, rngs::StdRng};
use tch::Device;

use seqvae::{
    config::Config, dataset::DataSet, display::display_sentences, dropout::word_dropout,
    vocab::Vocab,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();
    config.validate()?;

    // Kludge to load CUDA since libtorch seems to load it lazily, causing is_available to return false.
    if let Some(library) = &config.libtorch_cuda {
        preload_library(library)?;
    }
    let device = Device::cuda_if_available();
    info!("using device {device:?}, optimizer {}", config.optimizer);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    // The vocabulary file may live inside the data directory; it is not corpus text.
    let files = DataSet::exclude_file(
        DataSet::enumerate_files(&config.data_path),
        &config.vocab_file,
    );
    let vocab = Arc::new(load_or_build_vocab(&config, &files)?);
    info!("vocabulary has {} entries", vocab.len());

    let dataset = DataSet::from_files(files, vocab.clone(), config.batch_size, &mut rng);
    let anneal = config.kl_anneal();
    let mut step = 0;
    for batch in dataset.get_training_dataset() {
        if step >= config.max_steps {
            break;
        }
        let decoder_input = word_dropout(&batch, &vocab, config.word_dropout, &mut rng)?;
        let tensor = decoder_input.to_tensor(device);
        if config.print_every > 0 && step % config.print_every == 0 {
            info!(
                "step {step}: batch {:?}, kl weight {:.4}",
                tensor.size(),
                anneal.weight(step)
            );
            display_sentences(&mut io::stdout().lock(), decoder_input.rows(), &vocab, false)?;
        }
        step += 1;
    }
    info!("streamed {step} training batches");
    Ok(())
}

fn load_or_build_vocab(config: &Config, files: &[PathBuf]) -> Result<Vocab> {
    if config.vocab_file.exists() {
        return Vocab::load(&config.vocab_file)
            .with_context(|| format!("loading {}", config.vocab_file.display()));
    }
    if files.is_empty() {
        bail!(
            "no vocabulary at {} and no data under {}",
            config.vocab_file.display(),
            config.data_path.display()
        );
    }
    let vocab = Vocab::from_corpus(files, config.max_vocab_size)?;
    vocab
        .save(&config.vocab_file)
        .with_context(|| format!("saving {}", config.vocab_file.display()))?;
    info!("saved vocabulary to {}", config.vocab_file.display());
    Ok(vocab)
}

fn preload_library(path: &Path) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())?;
    let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
    if handle.is_null() {
        bail!("could not load {}", path.display());
    }
    Ok(())
}
