use clap::Parser;
use raincast::io::{load_corpus, FsSink};
use raincast::{
    AlgorithmRegistry, ChannelPipeline, ParameterAxis, ParameterSpace, SsimScorer, SweepOutcome,
    TrialLoop,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Invoked by the driver as: raincast <algo> <t|r> <param-file> <src> <dest>
#[derive(Parser, Debug)]
#[command(author, version, about = "Optical-flow parameter sweep trainer for radar nowcasting")]
struct Cli {
    /// Flow algorithm mnemonic (fb, per).
    algo: String,
    /// Mode letter: `t` runs the training sweep, `r` is the reserved apply path.
    mode: String,
    /// Name of the parameter output file, created inside DEST_DIR.
    param_file: String,
    /// Directory holding the chronologically named source images.
    src_dir: PathBuf,
    /// Directory receiving the parameter file and predicted images.
    dest_dir: PathBuf,
    /// Stop after this many parameter sets.
    #[arg(long, value_name = "N")]
    trial_cap: Option<u64>,
    /// JSON file overriding the swept parameter axes.
    #[arg(long, value_name = "FILE")]
    space: Option<PathBuf>,
    /// Evaluate colour channels sequentially instead of in parallel.
    #[arg(long)]
    sequential: bool,
    /// Enable tracing output for progress and timing.
    #[arg(long)]
    trace: bool,
}

/// JSON mirror of the library's parameter space.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct SpaceConfig {
    scale: Vec<f32>,
    levels: Vec<usize>,
    smoothing: Vec<usize>,
    iterations: Vec<usize>,
    poly_area: Vec<usize>,
    poly_width: Option<Vec<f32>>,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            scale: (1..=9).map(|i| i as f32 / 10.0).collect(),
            levels: (1..=10).collect(),
            smoothing: (1..=10).map(|i| 2 * i).collect(),
            iterations: (1..=10).collect(),
            poly_area: (1..=10).collect(),
            poly_width: None,
        }
    }
}

impl TryFrom<SpaceConfig> for ParameterSpace {
    type Error = raincast::RaincastError;

    fn try_from(config: SpaceConfig) -> Result<Self, Self::Error> {
        let space = ParameterSpace::new(
            ParameterAxis::new(config.scale)?,
            ParameterAxis::new(config.levels)?,
            ParameterAxis::new(config.smoothing)?,
            ParameterAxis::new(config.iterations)?,
            ParameterAxis::new(config.poly_area)?,
        )?;
        Ok(match config.poly_width {
            Some(values) => space.with_poly_width_axis(ParameterAxis::new(values)?),
            None => space,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("raincast=info".parse()?))
            .with_target(false)
            .init();
    }

    if !cli.mode.starts_with('t') {
        return Err(format!(
            "mode \"{}\" selects the run/apply path, which is not implemented yet",
            cli.mode
        )
        .into());
    }

    let space: ParameterSpace = match &cli.space {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let config: SpaceConfig = serde_json::from_str(&text)?;
            config.try_into()?
        }
        None => SpaceConfig::default().try_into()?,
    };

    // Resolve the mnemonic before any corpus work starts.
    let generator = AlgorithmRegistry::create(&cli.algo, space).map_err(|err| {
        format!(
            "{err} (known algorithms: {})",
            AlgorithmRegistry::mnemonics().join(", ")
        )
    })?;

    let corpus = load_corpus(&cli.src_dir)?;
    let sink = FsSink::create(&cli.dest_dir, &cli.param_file)?;

    let mut sweep = TrialLoop::new(
        corpus,
        generator,
        Box::new(SsimScorer::default()),
        Box::new(sink),
    );
    if cli.sequential {
        sweep = sweep.with_pipeline(ChannelPipeline::sequential());
    }
    if let Some(cap) = cli.trial_cap {
        sweep = sweep.with_trial_cap(cap);
    }

    let report = sweep.run()?;

    let ending = match report.outcome {
        SweepOutcome::Exhausted => "parameter space exhausted",
        SweepOutcome::CapReached => "trial cap reached",
    };
    println!(
        "{ending}: {} parameter sets, {} rows, {:.3}s",
        report.trials,
        report.rows,
        report.elapsed.as_secs_f64()
    );

    Ok(())
}
