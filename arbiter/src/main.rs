//! Interactive arbiter: play against engines served by a bot host from the terminal.
//!
//! Commands are read line by line from stdin (`help` lists them). Logs go to a daily rolling
//! file in the log directory, so stdout stays readable.

mod effects;
mod input;
mod view;

use std::path::PathBuf;

use anyhow::Context;
use arbiter::{spawn_arbiter, ArbiterConfig, ArbiterHandle, Participant};
use chess::PlayerSide;
use clap::Parser;
use engine::TcpConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use effects::TerminalEffects;
use input::{parse_command, Input, HELP};

/// Command-line flags. Each overrides the matching environment variable.
#[derive(Parser)]
#[command(name = "arbiter", about = "Play chess against UCI engines behind a bot host")]
struct Cli {
    /// Bot host address (host:port).
    #[arg(long)]
    addr: Option<String>,

    /// Search time per engine move, in milliseconds.
    #[arg(long)]
    movetime: Option<u64>,

    /// Who plays white: `human` or an engine identity.
    #[arg(long, default_value = "human")]
    white: Participant,

    /// Who plays black: `human` or an engine identity.
    #[arg(long, default_value = "human")]
    black: Participant,

    /// Start with auto-play disabled.
    #[arg(long)]
    manual: bool,

    /// Connect to the bot host on start-up.
    #[arg(long)]
    connect: bool,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ArbiterConfig::from_env();
    if let Some(addr) = cli.addr {
        config.bot_addr = addr;
    }
    if let Some(movetime) = cli.movetime {
        config.movetime_ms = movetime;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }

    arbiter::config::prepare_log_dir(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "arbiter");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Arbiter starting up");
    println!("Arbiter - bot host at {}", config.bot_addr);
    println!("Debug logs: {}/arbiter.YYYY-MM-DD", config.log_dir.display());
    println!("Type 'help' for commands.");

    let handle = spawn_arbiter(
        &config,
        TcpConnector::new(config.bot_addr.clone()),
        TerminalEffects,
    );

    let (snapshot, events) = handle.subscribe().await?;
    println!("{}", view::describe_snapshot(&snapshot));
    tokio::spawn(print_events(events));

    handle.set_participant(PlayerSide::White, cli.white).await?;
    handle.set_participant(PlayerSide::Black, cli.black).await?;
    if cli.manual {
        handle.set_auto_play(false).await?;
    }
    if cli.connect {
        report(handle.connect().await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(Input::Quit)) => break,
            Ok(Some(input)) => dispatch(&handle, input).await?,
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }

    handle.shutdown().await;
    tracing::info!("Arbiter shutting down");
    Ok(())
}

/// Run one command. Rejections are printed; only a dead actor is fatal.
async fn dispatch(handle: &ArbiterHandle, input: Input) -> anyhow::Result<()> {
    match input {
        Input::Connect => report(handle.connect().await),
        Input::Disconnect => handle.disconnect().await?,
        Input::Move(token) => report(handle.make_move(token).await.map(|_| ())),
        Input::NewGame => {
            handle.new_game().await?;
        }
        Input::LoadFen(fen) => report(handle.load_fen(fen).await.map(|_| ())),
        Input::Navigate(nav) => {
            if handle.navigate(nav).await? {
                let snap = handle.get_snapshot().await?;
                println!("{}", view::describe_snapshot(&snap));
            } else {
                println!("Already there");
            }
        }
        Input::Bind(side, participant) => handle.set_participant(side, participant).await?,
        Input::AutoPlay(enabled) => handle.set_auto_play(enabled).await?,
        Input::Stop => report(handle.stop_search().await),
        Input::Raw { identity, text } => report(handle.send_raw(identity, text).await),
        Input::Show => {
            let snap = handle.get_snapshot().await?;
            println!("{}", view::describe_snapshot(&snap));
        }
        Input::Help => println!("{}", HELP),
        Input::Quit => {}
    }
    Ok(())
}

fn report(result: Result<(), arbiter::ArbiterError>) {
    if let Err(e) = result {
        println!("Error: {}", e);
    }
}

/// Print notices as they arrive, and the game whenever the live position moves.
async fn print_events(events: tokio::sync::broadcast::Receiver<arbiter::ArbiterEvent>) {
    let mut stream = BroadcastStream::new(events);
    let mut last_shown = None;
    while let Some(event) = stream.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Event printer lagged: {}", e);
                continue;
            }
        };
        if let arbiter::ArbiterEvent::StateChanged(snap) = &event {
            let key = (snap.game.handle, snap.move_count());
            if last_shown != Some(key) {
                last_shown = Some(key);
                println!("{}", view::describe_snapshot(snap));
            }
        }
        if let Some(notice) = view::describe_event(&event) {
            println!("{}", notice);
        }
    }
}
