use clap::Parser;
use color_eyre::Result;
use organizer::{Config, Organizer, Profile, cli::Cli};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// RUST_LOG wins over the configured level; invalid filters fall back
fn init_tracing(config_level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .or_else(|| EnvFilter::try_new(config_level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::get_config_path(profile)?,
    };
    let created = !config_path.exists();
    let config = Config::load_from(&config_path, profile)?;
    init_tracing(&config.log_level);
    if created {
        tracing::info!(path = %config_path.display(), "created default config");
    }
    tracing::debug!(?profile, database = %config.get_database_path().display(), "starting");

    let app = Organizer::open(&config)?;
    organizer::cli::run(cli.command, &app, &config)?;

    Ok(())
}
