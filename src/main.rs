use clap::Parser;
use log::{error, info, LevelFilter};

use lumina::{AiService, App, Cli, Config, FileStore, PersistentStore, Result, Workspace};

pub fn initialize_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs().format_module_path(true);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let backend = FileStore::open(&config.data_dir)?.with_quota(config.storage_quota_bytes);
    let ai = AiService::from_config(&config);
    let workspace = Workspace::load(PersistentStore::new(backend), ai).into_shared();

    let app = App::new(workspace, config, cli.verbose);
    app.run(cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);
    info!("Application starting up");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("Application shutting down");
}
