use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::{info, LevelFilter};

use enumsynth::arith::ArithEvaluator;
use enumsynth::problem::read_problem;
use enumsynth::search::DEFAULT_MAX_SIZE;
use enumsynth::{synthesize, SearchLimits, Strategy, SynthResult};

#[derive(Parser, Debug)]
#[command(name = "enumsynth", about = "Enumerative synthesis of expressions from input/output examples")]
struct Cli {
    /// Path to the JSON problem file (grammar and examples)
    file: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Strategy::BottomUp)]
    strategy: Strategy,
    /// Largest program, in nodes, the bottom-up search builds
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: usize,
    /// Give up after this many search steps
    #[arg(long)]
    max_steps: Option<usize>,
    /// Give up after this many milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Print progress information while searching
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    info!("Started");

    let file_display = cli.file.display().to_string();
    let problem = read_problem(&cli.file)
        .with_context(|| format!("reading problem from {}", file_display))?;
    let grammar = problem.grammar()
        .with_context(|| format!("building grammar from {}", file_display))?;
    let evaluator = ArithEvaluator::new(&grammar)
        .with_context(|| format!("interpreting the grammar of {}", file_display))?;
    let limits = SearchLimits {
        max_size: cli.max_size,
        max_steps: cli.max_steps,
        time_limit: cli.time_limit_ms.map(Duration::from_millis),
    };

    match synthesize(&grammar, &problem.examples, &evaluator, cli.strategy, &limits)? {
        SynthResult::Program(program) => println!("{}", program.display(&grammar)),
        SynthResult::ProgramNotFound => {
            println!("Exhausted all candidates up to the search bound without a valid program")
        },
        SynthResult::Timeout => println!("synthesis ran out of time"),
    }

    Ok(())
}
