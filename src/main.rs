use std::io::{self, BufRead};
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{info, Level};

use stickies::config::AppConfig;
use stickies::shell::{Reply, Shell};
use stickies::{AppContext, NoteStore};

async fn watch(shell: &mut Shell, ticks: u32, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    for _ in 0..ticks {
        interval.tick().await;
        println!("{}", shell.refresh(Utc::now()));
    }
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level.parse::<Level>().unwrap_or(Level::INFO))
        .with_writer(io::stderr)
        .init();

    info!("Starting Stickies");
    info!("Loaded configuration: {:?}", config);

    config.prepare_dirs()?;
    let store = NoteStore::open(config.db_path(), config.store.on_schema_drift)?;
    let mut ctx = AppContext::new(store);
    ctx.load_all()?;

    let mut shell = Shell::new(
        ctx,
        config.dashboard.default_sort,
        config.dashboard.preview_chars,
        config.export_path(),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    println!("{}", shell.refresh(Utc::now()));
    println!("Type `help` for commands.");

    for line in io::stdin().lock().lines() {
        let line = line?;
        match shell.run_line(&line, Utc::now()) {
            Reply::Print(text) if text.is_empty() => {}
            Reply::Print(text) => println!("{text}"),
            Reply::Watch(ticks) => {
                runtime.block_on(watch(&mut shell, ticks, config.dashboard.refresh.period()))
            }
            Reply::Quit => break,
        }
    }

    info!("Stickies shut down");
    Ok(())
}
