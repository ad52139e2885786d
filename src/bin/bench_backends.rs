#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::RngCore;
use rand::SeedableRng;
use std::env;
use std::time::Instant;
use torus_life::backend::BackendKind;
use torus_life::{CellState, Grid, TorusLife, TorusLifeConfig};

#[derive(Clone, Debug)]
struct BenchConfig {
    density: f64,
    iters: u64,
    seed: u64,
    threads: Option<usize>,
    offload: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            density: 0.42,
            iters: 50,
            seed: 0x5EED_1234_ABCD_EF01,
            threads: None,
            offload: false,
        }
    }
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--density" => {
                if let Some(v) = args.next() {
                    cfg.density = v.parse().expect("--density expects f64");
                }
            }
            "--iters" => {
                if let Some(v) = args.next() {
                    cfg.iters = v.parse().expect("--iters expects u64");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = v.parse().expect("--seed expects u64");
                }
            }
            "--threads" => {
                if let Some(v) = args.next() {
                    cfg.threads = Some(v.parse().expect("--threads expects usize"));
                }
            }
            "--offload" => cfg.offload = true,
            other => panic!(
                "unknown argument: {other}\nusage: bench_backends [--density F] [--iters N] [--seed N] [--threads N] [--offload]"
            ),
        }
    }
    cfg
}

fn random_grid(size: usize, density: f64, seed: u64) -> Grid {
    let mut grid = Grid::new(size, size).expect("bench grid");
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let threshold = (u64::MAX as f64 * density) as u64;
    for y in 0..size {
        for x in 0..size {
            if rng.next_u64() <= threshold {
                grid.set_cell(x, y, CellState::Alive).expect("in bounds");
            }
        }
    }
    grid
}

fn bench(grid: &Grid, config: TorusLifeConfig, iters: u64) -> Option<(f64, u64)> {
    let mut engine = match TorusLife::with_config(grid.clone(), config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("skipping: {err}");
            return None;
        }
    };
    let start = Instant::now();
    engine.step_n(iters).expect("benchmark run failed");
    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    let pop = engine.population();
    std::hint::black_box(engine.into_grid());
    Some((total_ms, pop))
}

fn main() {
    let cfg = parse_args();
    let sizes: &[usize] = &[256, 512, 1024, 2048];

    let mut backends = vec![
        ("sequential", TorusLifeConfig::default()),
        ("parallel", {
            let c = TorusLifeConfig::default().backend(BackendKind::Parallel);
            match cfg.threads {
                Some(n) => c.thread_count(n),
                None => c,
            }
        }),
    ];
    if cfg.offload {
        backends.push((
            "offload",
            TorusLifeConfig::default().backend(BackendKind::Offload),
        ));
    }

    println!(
        "{:<12} {:<10} {:>8} {:>12} {:>10} {:>10}",
        "Backend", "Grid", "Iters", "Total(ms)", "Avg(ms)", "Pop"
    );
    println!("{}", "-".repeat(68));

    for &size in sizes {
        let grid = random_grid(size, cfg.density, cfg.seed);
        let mut reference_pop = None;
        for (name, config) in &backends {
            let Some((total_ms, pop)) = bench(&grid, config.clone(), cfg.iters) else {
                continue;
            };
            let status = match reference_pop {
                None => {
                    reference_pop = Some(pop);
                    ""
                }
                Some(expected) if expected == pop => "",
                Some(_) => " MISMATCH",
            };
            println!(
                "{:<12} {:<10} {:>8} {:>12.1} {:>10.4} {:>10}{}",
                name,
                format!("{size}x{size}"),
                cfg.iters,
                total_ms,
                total_ms / cfg.iters as f64,
                pop,
                status
            );
        }
    }
}
