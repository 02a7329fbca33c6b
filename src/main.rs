use probtensor::config::Config;
use probtensor::dataset::DatasetModule;
use probtensor::{random, Distribution, Exponential, Tensor, TensorError};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parse an optional positional argument
fn arg<T: std::str::FromStr>(args: &[String], idx: usize, name: &str, default: T) -> probtensor::Result<T> {
    match args.get(idx) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| TensorError::InvalidConfig {
            var: name.to_string(),
            value: raw.clone(),
        }),
    }
}

fn main() -> probtensor::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let rate: f32 = arg(&args, 0, "rate", 1.5)?;
    let samples: usize = arg(&args, 1, "samples", 20000)?;

    let config = Config::from_env()?;
    random::seed(config.seed);
    info!(seed = config.seed, rate, samples, "=== Exponential distribution ===");

    let dist = Exponential::new(Tensor::new(vec![rate], vec![1]))?;
    info!(
        mean = dist.mean().item(),
        variance = dist.variance().item(),
        entropy = dist.entropy().item(),
        "analytic moments"
    );

    let draws = dist.sample(&[samples]);
    info!(
        mean = draws.mean_axis(Some(0), false).item(),
        variance = draws.var_axis(0, false).item(),
        "empirical moments"
    );

    for module in DatasetModule::ALL {
        info!(
            module = module.name(),
            loader = module.is_loader(),
            cache = %module.cache_dir(&config).display(),
            "{}",
            module.description()
        );
    }

    Ok(())
}
