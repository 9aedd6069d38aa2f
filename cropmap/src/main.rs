//! Point d'entrée CLI pour cropmap

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use cropmap::cli::{self, Commands, PlayOptions};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Carte choroplèthe des comtés américains, année par année
#[derive(Parser)]
#[command(name = "cropmap")]
#[command(author, version)]
#[command(about = "Carte choroplèthe des métriques agricoles et climatiques par comté, année par année")]
#[command(long_about = "Lecture de la frise 1980-2023 sans affichage, export GeoJSON stylé et légendes.\n\nLes données sont lues dans CROPMAP_DATA_DIR (ou data.data_dir de la configuration).")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Play {
            config,
            data_dir,
            metric,
            from,
            on_end,
            tick_ms,
            select,
            report,
        } => {
            info!(config = %config, "Play");
            cli::cmd_play(PlayOptions {
                config,
                data_dir,
                metric,
                from,
                on_end,
                tick_ms,
                select,
                report,
            })
            .await?;
        }
        Commands::Export {
            config,
            data_dir,
            metric,
            output,
        } => {
            info!(config = %config, output = %output.display(), "Export vers GeoJSON");
            cli::cmd_export(&config, data_dir.as_deref(), metric.as_deref(), &output)?;
        }
        Commands::Legend { config, metric } => {
            cli::cmd_legend(&config, metric.as_deref())?;
        }
        Commands::Years { config, data_dir } => {
            cli::cmd_years(&config, data_dir.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
