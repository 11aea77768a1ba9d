use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use filmviews::error_display::user_message_from_report;
use filmviews::{
    export_tables, AppConfig, Args, ConfigManager, DerivedTables, ExportOptions, Pipeline,
    PipelineInputs,
};
use tracing_subscriber::EnvFilter;

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(filmviews::APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration file written to: {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

/// RUST_LOG, then the config filter, then "info".
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.logging.filter.as_deref().unwrap_or("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(derived: &DerivedTables) {
    println!("Rows after join: {}", derived.complete.height());
    if let Some(window) = derived.window {
        println!(
            "Top films for {}-{:02}: {}",
            window.year,
            window.month,
            derived.top_films_in_window.height()
        );
    }
    println!(
        "Categories: {}, languages: {}, correlated columns: {}",
        derived.category_totals.height(),
        derived.language_totals.height(),
        derived.correlation.len()
    );
}

fn run(args: &Args) -> Result<()> {
    let mut config = AppConfig::load_with(filmviews::APP_NAME, args.config.as_deref())?;
    config.apply_args(args);
    config.validate()?;
    init_tracing(&config);

    let inputs =
        PipelineInputs::from_args(args).ok_or_else(|| eyre!("all four input tables are required"))?;
    let pipeline = Pipeline::from_config(&config);
    let sources = pipeline.load(&inputs)?;
    let derived = pipeline.run(&sources)?;
    print_summary(&derived);

    if let Some(dir) = &config.output.directory {
        let options = ExportOptions {
            format: config.output_format(),
            compression: config.compression(),
        };
        let written = export_tables(&derived, dir, &options)?;
        println!("Wrote {} files to {}", written.len(), dir.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", user_message_from_report(&e));
        std::process::exit(1);
    }
    Ok(())
}
