use clap::Parser;
use tracing::{error, info};

use clickstats::cli::{Cli, Commands};
use clickstats::config::{StaticConfig, get_config, init_config};
use clickstats::system::lifetime::{listen_for_shutdown, perform_shutdown, prepare_startup};
use clickstats::system::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        match output {
            Some(path) => {
                if let Err(e) = StaticConfig::default().save_to_file(path) {
                    eprintln!("Failed to write config to {}: {}", path, e);
                    std::process::exit(1);
                }
                println!("Sample configuration written to {}", path);
            }
            None => println!("{}", StaticConfig::generate_sample_config()),
        }
        return;
    }

    if let Err(e) = init_config(&cli.config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    let config = get_config();

    // guard 必须存活到进程退出
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut context = match prepare_startup(&config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    context.manager.start_all();
    info!("clickstats is running, press Ctrl+C to stop");

    listen_for_shutdown().await;
    perform_shutdown(&mut context.manager).await;

    if let Err(e) = context.db.close().await {
        error!("Failed to close database connection: {}", e);
    }
    info!("Bye");
}
