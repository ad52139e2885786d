#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use torus_life::backend::BackendKind;
use torus_life::{LifeResult, TorusLife, TorusLifeConfig, snapshot};

const DEFAULT_GENERATIONS: u64 = 250;

/// Evolve a Game of Life snapshot on a torus.
#[derive(Parser, Debug)]
#[command(name = "torus-life")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Toroidal Game of Life with sequential, parallel and GPU backends", long_about = None)]
struct Cli {
    /// Input snapshot
    #[arg(long = "load", value_name = "PATH", required_unless_present = "list_devices")]
    input: Option<PathBuf>,

    /// Output snapshot
    #[arg(long = "save", value_name = "PATH", required_unless_present = "list_devices")]
    output: Option<PathBuf>,

    /// Generations to compute (0 means the default)
    #[arg(long, default_value_t = DEFAULT_GENERATIONS)]
    generations: u64,

    /// Backend: sequential|parallel|offload (aliases seq, omp, ocl)
    #[arg(long, default_value = "sequential")]
    mode: BackendKind,

    /// Worker threads for the parallel backend (1-16)
    #[arg(long)]
    threads: Option<usize>,

    /// Device index for the offload backend (see --list-devices)
    #[arg(long)]
    device: Option<usize>,

    /// Reference snapshot to compare the saved output against
    #[arg(long = "fc", value_name = "PATH")]
    compare: Option<PathBuf>,

    /// Print init, kernel and finalize wall-clock times
    #[arg(long)]
    measure: bool,

    /// List compute devices for the offload backend and exit
    #[arg(long)]
    list_devices: bool,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[cfg(feature = "offload")]
fn list_devices() {
    let devices = torus_life::offload::enumerate_devices();
    println!(
        "{} platforms, {} devices detected",
        torus_life::offload::platform_count(&devices),
        devices.len()
    );
    for device in &devices {
        println!("{device}");
    }
}

#[cfg(not(feature = "offload"))]
fn list_devices() {
    println!("built without the `offload` feature: no compute devices");
}

fn run(cli: Cli) -> LifeResult<()> {
    if cli.list_devices {
        list_devices();
        return Ok(());
    }
    let (Some(input), Some(output)) = (cli.input, cli.output) else {
        return Err(torus_life::LifeError::config("--load and --save are required"));
    };
    let generations = if cli.generations == 0 {
        DEFAULT_GENERATIONS
    } else {
        cli.generations
    };

    let mut config = TorusLifeConfig::default().backend(cli.mode);
    if let Some(n) = cli.threads {
        config = config.thread_count(n);
    }
    if let Some(index) = cli.device {
        config = config.device_index(index);
    }

    let start = Instant::now();
    let grid = snapshot::read(&input)?;
    let mut engine = TorusLife::with_config(grid, config)?;
    let init_secs = start.elapsed().as_secs_f64();
    if cli.measure {
        println!("init time in seconds {init_secs:.6};");
    }

    let start = Instant::now();
    engine.step_n(generations)?;
    let kernel_secs = start.elapsed().as_secs_f64();
    if cli.measure {
        println!("kernel time in seconds {kernel_secs:.6};");
    }
    log::info!(
        "{generations} generations on {} backend, population {}",
        engine.backend_kind(),
        engine.population()
    );

    let start = Instant::now();
    let grid = engine.into_grid();
    snapshot::write(&output, &grid)?;
    if let Some(reference) = cli.compare {
        if snapshot::files_match(&output, &reference)? {
            println!("Files are identical");
        } else {
            println!(
                "Files differ: {} vs {}",
                output.display(),
                reference.display()
            );
        }
    }
    let finalize_secs = start.elapsed().as_secs_f64();
    if cli.measure {
        println!("finalize time in seconds {finalize_secs:.6};");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .format_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
