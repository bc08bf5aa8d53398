use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zibu_core::{PetMarker, SystemClock, ZibuConfig};
use zibu_limbic::NeedsSimulation;
use zibu_memory::SqliteStore;

mod repl;

use repl::{ReplCommand, USAGE};

#[derive(Parser, Debug)]
#[command(name = "zibu", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "zibu.toml")]
    config: String,

    /// Path to the pet database (overrides the config file)
    #[arg(short, long, env = "ZIBU_DB_PATH")]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let config = ZibuConfig::load_or_default(&args.config);
    let db_path = args.db.unwrap_or_else(|| config.storage.db_path.clone());

    info!("Opening pet state at {}...", db_path);
    let store = Arc::new(SqliteStore::new(&db_path).await?);
    let sim = NeedsSimulation::start(&config, store, Arc::new(SystemClock)).await;

    println!("Zibu is here. Type 'help' for commands, 'quit' to exit.");
    println!("{}", sim.marker().describe());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match repl::parse(&line) {
            Ok(ReplCommand::Quit) => break,
            Ok(ReplCommand::Empty) => continue,
            Ok(ReplCommand::Help) => println!("{}", USAGE),
            Ok(command) => {
                if let Err(e) = dispatch(&sim, command).await {
                    error!("Command failed: {:#}", e);
                    break;
                }
            }
            Err(e) => println!("{}\n{}", e, USAGE),
        }
    }

    sim.shutdown().await?;
    info!("Goodbye from Zibu");
    Ok(())
}

async fn dispatch(sim: &NeedsSimulation, command: ReplCommand) -> anyhow::Result<()> {
    match command {
        ReplCommand::Status => {
            print_status(&sim.state().await?);
            return Ok(());
        }
        ReplCommand::Select(tool) => {
            sim.select_tool(tool).await?;
            println!("{}", tool.instructions());
        }
        ReplCommand::Picker(category) => sim.open_picker(category).await?,
        ReplCommand::Deselect => sim.deselect().await?,
        ReplCommand::Press => sim.press_start().await?,
        ReplCommand::Release => sim.press_end().await?,
        ReplCommand::Swipe(dx) => sim.drag_release(dx).await?,
        ReplCommand::Shake(sample) => sim.shake(sample).await?,
        ReplCommand::App(state) => sim.set_app_state(state).await?,
        ReplCommand::Tick => sim.tick().await?,
        ReplCommand::Help | ReplCommand::Quit | ReplCommand::Empty => {}
    }
    println!("{}", sim.state().await?.describe());
    Ok(())
}

fn print_status(marker: &PetMarker) {
    for status in marker.statuses() {
        println!(
            "  {:<7} {:>3}%  {:?} ({})",
            status.channel.as_str(),
            status.percent,
            status.band,
            status.band.color()
        );
    }
    let flags = marker.flags;
    println!(
        "  tool: {}  sleeping: {}  feeding: {}  upset: {}",
        marker.tool.map(|t| t.key()).unwrap_or("none"),
        flags.is_sleeping,
        flags.is_feeding,
        flags.is_upset
    );
    println!(
        "  animation: {:?}  last saved: {}",
        marker.animation, marker.last_updated
    );
}
