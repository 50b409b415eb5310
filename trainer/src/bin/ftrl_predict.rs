use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;

use ftrl_core::{clamp_pred, data::SampleReader, log_loss, LrModel, SparseVec};

/// Scores a LIBSVM-format test file with a saved weights file and reports
/// accuracy and mean log-loss.
#[derive(Parser, Debug)]
#[command(name = "ftrl_predict", version)]
struct Cli {
    /// Test file to score
    #[arg(short = 't', long = "test")]
    test: PathBuf,

    /// Weights file written by ftrl_train
    #[arg(short = 'm', long = "model")]
    model: PathBuf,

    /// Output file, one prediction per line
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let model = LrModel::<f64>::from_file(&cli.model)
        .with_context(|| format!("failed to load model {}", cli.model.display()))?;
    let reader = SampleReader::open(&cli.test)
        .with_context(|| format!("failed to open test file {}", cli.test.display()))?;
    let mut out = BufWriter::new(
        File::create(&cli.output)
            .with_context(|| format!("failed to create {}", cli.output.display()))?,
    );

    let mut x: SparseVec<f64> = Vec::new();
    let mut samples = 0usize;
    let mut correct = 0usize;
    let mut loss = 0f64;

    while let Some(y) = reader.read_sample(&mut x) {
        let pred = clamp_pred(model.predict(&x));
        writeln!(out, "{pred:.6}")?;

        samples += 1;
        if (pred > 0.5) == (y > 0.0) {
            correct += 1;
        }
        loss += log_loss(y, pred);
    }
    out.flush()?;

    if samples > 0 {
        println!(
            "Accuracy = {:.2}% ({correct}/{samples})",
            correct as f64 / samples as f64 * 100.0
        );
        println!("Log-likelihood = {:.6}", loss / samples as f64);
    }

    Ok(())
}
