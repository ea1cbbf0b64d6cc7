use std::error::Error;

use clap::Parser;
use env_logger::Builder;
use log::{debug, info, LevelFilter};

use mvpnd::cli::{query_mvpnd, Args, Command, RunOptions};
use mvpnd::{config, MvpnServer, Server};

async fn run(args: &Args, options: &RunOptions) -> Result<(), Box<dyn Error>> {
    let config = config::from_file(&options.config_path)?;
    debug!(
        "Found {} instances in {}",
        config.instances.len(),
        options.config_path
    );

    let engine = MvpnServer::from_config(&config)?;
    let (server, _engine_task) = Server::spawn(engine, &config.project_manager);
    let _api = server.serve_rpc_api(args.api_socket()?)?;

    tokio::signal::ctrl_c().await?;
    info!("Stopping mvpnd...");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let (mvpnd_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("mvpnd"), mvpnd_level)
        .filter(None, other_level)
        .init();
    info!("Logging at levels {}/{}", mvpnd_level, other_level);

    match &args.cmd {
        Command::Run(options) => run(&args, options).await?,
        _ => query_mvpnd(&args).await,
    }
    Ok(())
}
