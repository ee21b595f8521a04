use std::{fs, io::Write, path::PathBuf};

use argh::FromArgs;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use basin_finder::{BasinFinder, BasinFinderConfig, BasinOutputs, ExecutionStrategy};
use basin_tensor::{Tensor3, TensorError};

#[derive(FromArgs, Debug)]
/// Run the basin finder along the middle axis of a 3-d tensor.
struct Args {
    /// path to a JSON tensor with "shape" and "data" fields
    #[argh(option, short = 'i')]
    input: Option<PathBuf>,

    /// shape of the random tensor used without --input, as d0,d1,d2
    #[argh(option, default = "[1, 16, 1]", from_str_fn(parse_shape))]
    shape: [usize; 3],

    /// probability of a random sample being a source
    #[argh(option, default = "0.1")]
    density: f64,

    /// seed of the random tensor
    #[argh(option, default = "0")]
    seed: u64,

    /// execution strategy: serial, slabs or rows
    #[argh(
        option,
        default = "ExecutionStrategy::ParallelRows",
        from_str_fn(parse_strategy)
    )]
    strategy: ExecutionStrategy,

    /// number of threads of a local pool, overrides --strategy
    #[argh(option, short = 'n')]
    threads: Option<usize>,

    /// skip the breakpoint and apex outputs
    #[argh(switch)]
    no_envelope: bool,

    /// path of the output JSON file, stdout otherwise
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

fn parse_shape(value: &str) -> Result<[usize; 3], String> {
    let dims = value
        .split(',')
        .map(|d| d.trim().parse::<usize>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    dims.try_into()
        .map_err(|dims: Vec<usize>| format!("expected 3 dimensions, got {}", dims.len()))
}

fn parse_strategy(value: &str) -> Result<ExecutionStrategy, String> {
    match value {
        "serial" => Ok(ExecutionStrategy::Serial),
        "slabs" => Ok(ExecutionStrategy::ParallelSlabs),
        "rows" => Ok(ExecutionStrategy::ParallelRows),
        _ => Err(format!("unknown strategy: {value}")),
    }
}

/// Sources are zero, every other sample is larger than any squared distance.
fn random_sources(
    shape: [usize; 3],
    density: f64,
    seed: u64,
) -> Result<Tensor3<f32>, TensorError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let far = (shape[1] * shape[1]) as f32;
    Tensor3::from_shape_fn(shape, |_| {
        if rng.random_bool(density) {
            0.0
        } else {
            far
        }
    })
}

#[derive(Serialize)]
struct Report<'a> {
    distances: &'a Tensor3<f32>,
    basins: &'a Tensor3<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakpoints: Option<&'a Tensor3<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apexes: Option<&'a Tensor3<i32>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let src: Tensor3<f32> = match &args.input {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => {
            if !(0.0..=1.0).contains(&args.density) {
                return Err(format!("density must be in [0, 1], got {}", args.density).into());
            }
            random_sources(args.shape, args.density, args.seed)?
        }
    };
    log::info!("input tensor of shape {:?}", src.shape);

    let config = BasinFinderConfig {
        expose_envelope: !args.no_envelope,
        strategy: args
            .threads
            .map(ExecutionStrategy::Fixed)
            .unwrap_or(args.strategy),
    };
    let finder = BasinFinder::new(config);

    let now = std::time::Instant::now();
    let outputs: BasinOutputs<f32, i32> = finder.compute(&src)?;
    log::info!("computed {} basins in {:?}", outputs.basins.numel(), now.elapsed());

    let report = Report {
        distances: &outputs.distances,
        basins: &outputs.basins,
        breakpoints: outputs.envelope.as_ref().map(|e| &e.breakpoints),
        apexes: outputs.envelope.as_ref().map(|e| &e.apexes),
    };

    // non-finite breakpoints serialize as null
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => fs::write(path, json)?,
        None => writeln!(std::io::stdout(), "{json}")?,
    }

    Ok(())
}
