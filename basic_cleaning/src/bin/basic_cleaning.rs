use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use basic_cleaning::cli::USAGE;
use basic_cleaning::store::StoreFactory;
use basic_cleaning::{AppConfig, CleanArgs, Cleaner, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn clean(args: CleanArgs) -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        store = %config.store.store_type,
        root = %config.store.root.display(),
        "Using tracking store"
    );

    let store = StoreFactory::create(&config.store).context("Failed to open tracking store")?;
    if !store.health_check().await? {
        bail!("Tracking store is not healthy");
    }

    let summary = Cleaner::new(store, &config)
        .run(&args)
        .await
        .context("Basic cleaning failed")?;

    info!(
        run = %summary.run_id,
        input = %summary.input_artifact,
        input_rows = summary.input_rows,
        output_rows = summary.output_rows,
        artifact = %summary.output_artifact.qualified_name(),
        "Cleaning completed"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match CleanArgs::parse_from(std::env::args().skip(1)) {
        Ok(Command::Clean(args)) => args,
        Ok(Command::Help) => {
            print!("{}", USAGE);
            return;
        }
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(e.exit_code());
        }
    };

    init_tracing();

    if let Err(e) = clean(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
