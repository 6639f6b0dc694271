mod app;
mod config;
mod export;
mod logging;
mod model;
mod net;
mod runtime;
mod ui;

use anyhow::{Context, Result};

use app::App;
use config::parse_args;
use logging::init as init_logging;
use net::build_client;
use runtime::{init_terminal, restore_terminal, run_app};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    info!("opensky-tui starting");
    debug!(
        "config path: {} api_base: {} timeout: {:?}",
        config.config_path.display(),
        config.api_base,
        config.timeout()
    );

    let client = build_client(config.timeout()).context("Failed to build HTTP client")?;
    let app = App::new(&config);

    let mut terminal = init_terminal()?;
    let res = run_app(&mut terminal, app, client);
    restore_terminal(&mut terminal)?;

    if let Err(err) = res {
        warn!("runtime error: {err}");
        eprintln!("{err}");
    }

    info!("opensky-tui exited");
    Ok(())
}
