use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use session_store::SessionStore;
use zen::app::App;
use zen::config::ZenConfig;
use zen::shutdown::install_shutdown_handler;
use zen::terminal::TerminalHost;
use zen_pick::{init_logging, BackendMode, Picker};

#[derive(Debug, Parser)]
#[command(name = "zen", version, about = "Terminal workbench with file pickers and session resume")]
struct Args {
    /// Files to open at startup.
    files: Vec<PathBuf>,

    /// Directory holding `last_file` and `session.json`.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to `<config_dir>/zen/config.toml`).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Never use the rich picker backend.
    #[arg(long)]
    no_backend: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ZenConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_logging(args.verbose, config.write_log.as_deref());
    if args.no_backend {
        config.picker.backend = BackendMode::Off;
    }

    let data_dir = config
        .resolve_data_dir(args.data_dir.as_deref())
        .context("resolving data directory")?;
    let store = SessionStore::new(data_dir);
    let root = std::env::current_dir().context("reading current directory")?;

    let layout = Arc::new(Mutex::new(Value::Null));
    let _shutdown = install_shutdown_handler(store.clone(), Arc::clone(&layout))
        .context("installing signal handlers")?;

    let host = TerminalHost::new(io::stdin().lock(), io::stdout(), root, store.clone());
    let picker = Picker::new(config.picker);
    let mut app = App::new(host, picker, store).with_shared_layout(layout);

    app.open_initial(&args.files);
    app.run();
    Ok(())
}
