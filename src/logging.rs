use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `level`; each `-v` raises the default one step.
pub fn init(level: LevelFilter, verbose: u8) -> Result<()> {
    let filter = EnvFilter::builder().with_default_directive(raise(level, verbose).into()).from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}

fn raise(level: LevelFilter, verbose: u8) -> LevelFilter {
    const STEPS: [LevelFilter; 6] = [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];
    let current = STEPS.iter().position(|step| *step == level).unwrap_or(3);
    STEPS[(current + usize::from(verbose)).min(STEPS.len() - 1)]
}
