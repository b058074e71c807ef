//! Command line tool to score a corpus with a trained checkpoint

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use pico_args::Arguments;
use relation_trainer::pipelines::relation_classification::{inference::infer, run::RunDirectory};

const HELP: &str = "\
Usage: infer RUN_DIR CHECKPOINT CORPUS [OPTIONS]

Arguments:
  RUN_DIR              A training run directory holding config.json and vocab.json
  CHECKPOINT           The model file to load (e.g., 'checkpoints/model-0.812-1200.mpk')
  CORPUS               The corpus to score

Options:
  -h, --help           Print help
  -o, --output         Where to write predictions (defaults to RUN_DIR/inference.txt)
  --cpu                Run on the CPU even when CUDA is available
";

#[derive(Debug)]
struct Args {
    /// The training run directory
    run_dir: PathBuf,

    /// The checkpoint to load
    checkpoint: PathBuf,

    /// The corpus to score
    corpus: String,

    /// The prediction file
    output: Option<PathBuf>,

    /// Skip CUDA
    cpu: bool,
}

fn parse_args() -> Result<Option<Args>> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let missing = |name: &'static str| {
        move |e| match e {
            pico_args::Error::MissingArgument => anyhow!("Missing required argument: {}", name),
            _ => anyhow!("{}", e),
        }
    };

    let args = Args {
        output: pargs.opt_value_from_str(["-o", "--output"])?,
        cpu: pargs.contains("--cpu"),
        run_dir: pargs.free_from_str().map_err(missing("RUN_DIR"))?,
        checkpoint: pargs.free_from_str().map_err(missing("CHECKPOINT"))?,
        corpus: pargs.free_from_str().map_err(missing("CORPUS"))?,
    };

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = parse_args()? else {
        println!("{}", HELP);
        return Ok(());
    };

    let device = if !args.cpu && tch::Cuda::is_available() {
        LibTorchDevice::Cuda(0)
    } else {
        LibTorchDevice::Cpu
    };

    let run = RunDirectory::new(args.run_dir);

    let (output, evaluation) = infer::<Autodiff<LibTorch>>(
        device,
        &run,
        &args.checkpoint,
        &args.corpus,
        args.output,
    )
    .await?;

    println!(
        "Wrote {} predictions to {}\nMacro-averaged F1 excluding Other: {:.4}",
        evaluation.predictions.len(),
        output.display(),
        evaluation.f1
    );

    Ok(())
}
