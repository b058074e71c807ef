//! Command line tool to train a relation classifier

use anyhow::anyhow;
use burn::{
    backend::{libtorch::LibTorchDevice, Autodiff, LibTorch},
    config::Config as _,
};
use pico_args::Arguments;
use relation_trainer::pipelines::relation_classification::{config::Training, training};

const HELP: &str = "\
Usage: train [OPTIONS]

Options:
  -h, --help              Print help
  -c, --config            A JSON config file, such as a previous run's config.json
  --train-path            The training split (required without --config)
  --test-path             The test split (required without --config)
  -n, --num-epochs        Number of epochs to train for
  -b, --batch-size        Batch size
  --learning-rate         Initial learning rate
  --embeddings            Pretrained vectors: 'none', 'word2vec', 'glove100' or 'glove300'
  --embeddings-path       The pretrained vector file, if not the default location
  --evaluate-every        Evaluate on the test split every this many steps
  --output-format         Prediction file format: 'labels' or 'semeval'
  --runs-dir              Parent directory for run outputs (defaults to 'runs')
  --seed                  Seed for shuffling and initialization
  --cpu                   Train on the CPU even when CUDA is available
";

#[derive(Debug)]
struct Args {
    config: Option<String>,
    train_path: Option<String>,
    test_path: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    embeddings: Option<String>,
    embeddings_path: Option<String>,
    evaluate_every: Option<usize>,
    output_format: Option<String>,
    runs_dir: Option<String>,
    seed: Option<u64>,
    cpu: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            train_path: pargs.opt_value_from_str("--train-path")?,
            test_path: pargs.opt_value_from_str("--test-path")?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            learning_rate: pargs.opt_value_from_str("--learning-rate")?,
            embeddings: pargs.opt_value_from_str("--embeddings")?,
            embeddings_path: pargs.opt_value_from_str("--embeddings-path")?,
            evaluate_every: pargs.opt_value_from_str("--evaluate-every")?,
            output_format: pargs.opt_value_from_str("--output-format")?,
            runs_dir: pargs.opt_value_from_str("--runs-dir")?,
            seed: pargs.opt_value_from_str("--seed")?,
            cpu: pargs.contains("--cpu"),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }

    /// Start from the config file or the defaults, then apply the flags
    fn config(&self) -> anyhow::Result<Training> {
        let mut config = match &self.config {
            Some(path) => Training::load(path)
                .map_err(|e| anyhow!("Unable to load config {}: {}", path, e))?,
            None => Training::new(
                self.train_path
                    .clone()
                    .ok_or_else(|| anyhow!("Missing required argument: --train-path"))?,
                self.test_path
                    .clone()
                    .ok_or_else(|| anyhow!("Missing required argument: --test-path"))?,
            ),
        };

        if let Some(train_path) = &self.train_path {
            config.train_path = train_path.clone();
        }

        if let Some(test_path) = &self.test_path {
            config.test_path = test_path.clone();
        }

        if let Some(num_epochs) = self.num_epochs {
            config.num_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }

        if let Some(embeddings) = &self.embeddings {
            config.embeddings = embeddings.clone();
        }

        if self.embeddings_path.is_some() {
            config.embeddings_path = self.embeddings_path.clone();
        }

        if let Some(evaluate_every) = self.evaluate_every {
            config.evaluate_every = evaluate_every;
        }

        if let Some(output_format) = &self.output_format {
            config.output_format = output_format.clone();
        }

        if let Some(runs_dir) = &self.runs_dir {
            config.runs_dir = runs_dir.clone();
        }

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        Ok(config)
    }
}

/// Pick CUDA when present, falling back to the CPU only when soft placement allows it
fn select_device(config: &Training, force_cpu: bool) -> anyhow::Result<LibTorchDevice> {
    let device = if force_cpu {
        LibTorchDevice::Cpu
    } else if tch::Cuda::is_available() {
        LibTorchDevice::Cuda(0)
    } else if config.allow_soft_placement {
        LibTorchDevice::Cpu
    } else {
        return Err(anyhow!(
            "No CUDA device is available and allow_soft_placement is disabled"
        ));
    };

    if config.log_device_placement {
        log::info!("Placing computation on {:?}", device);
    }

    if !config.gpu_allow_growth {
        log::debug!("gpu_allow_growth is off; libtorch allocates GPU memory on demand regardless");
    }

    Ok(device)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let config = args.config()?;
    let device = select_device(&config, args.cpu)?;

    let (run, outcome) = training::train::<Autodiff<LibTorch>>(device, config).await?;

    println!(
        "Finished {} steps in {}, best macro-F1 {:.4}",
        outcome.steps,
        run.root().display(),
        outcome.best_f1
    );

    Ok(())
}
