//! Hosts a Peril server and a few players in one process.
//!
//! Every stdin line is routed by its first word: `server <command>` goes to
//! the server, `<player> <command>` to that player.
//!
//! ```text
//! $ peril-local alice bob
//! alice spawn rome infantry
//! bob spawn gaul cavalry
//! bob move rome 0
//! server pause
//! alice status
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use peril::prelude::*;
use peril::protocol::routing::WAR_QUEUE;
use peril::{CLIENT_HELP, SERVER_HELP};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "peril-local")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Usernames of the players to seat
    #[arg(required = true, num_args = 1..)]
    players: Vec<String>,

    /// File the server appends the game log to
    #[arg(short, long, default_value = "game.log")]
    log: PathBuf,

    /// Deliveries allowed before a requeued message is dropped (0 = unlimited)
    #[arg(long, default_value = "10")]
    max_attempts: u32,

    /// Have all players compete on one shared war queue
    #[arg(long)]
    shared_war_queue: bool,
}

type Players = BTreeMap<String, PerilClient<InMemoryBroker>>;

#[tokio::main]
async fn main() -> ExitCode {
    peril::init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), PerilError> {
    let mut config = PerilConfig::default()
        .retry(RetryPolicy::with_max_attempts(args.max_attempts))
        .log_path(args.log);
    if args.shared_war_queue {
        config = config.war_queue(WarQueue::Shared(WAR_QUEUE.to_string()));
    }
    let broker = InMemoryBroker::new();

    let sink = FileLogSink::new(config.log_path.clone());
    let server = PerilServer::start(broker.clone(), sink, config.clone()).await?;

    let mut players = Players::new();
    for username in args.players {
        if username == "server" || players.contains_key(&username) {
            eprintln!("skipping player name {username:?}");
            continue;
        }
        let client = PerilClient::connect(broker.clone(), username.clone(), config.clone()).await?;
        players.insert(username, client);
    }
    println!(
        "peril: {} player(s) seated, logging to {}",
        players.len(),
        config.log_path.display()
    );
    println!("type `<player> help` or `server help`");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };
        if !dispatch(&server, &players, &line).await {
            break;
        }
    }

    for (username, client) in players {
        if let Err(e) = client.shutdown().await {
            tracing::warn!(%username, error = %e, "player shutdown failed");
        }
    }
    server.shutdown().await
}

/// Runs one input line. Returns `false` when the session should end.
async fn dispatch(
    server: &PerilServer<InMemoryBroker, FileLogSink>,
    players: &Players,
    line: &str,
) -> bool {
    let line = line.trim();
    let Some((target, rest)) = line.split_once(char::is_whitespace).or_else(|| {
        (!line.is_empty()).then_some((line, ""))
    }) else {
        return true;
    };

    if target == "server" {
        return match ServerCommand::parse(rest) {
            Ok(None) | Ok(Some(ServerCommand::Help)) => {
                println!("{SERVER_HELP}");
                true
            }
            Ok(Some(ServerCommand::Quit)) => false,
            Ok(Some(cmd)) => {
                report(server.execute(cmd).await);
                true
            }
            Err(e) => {
                println!("server: {e}");
                true
            }
        };
    }

    let Some(client) = players.get(target) else {
        println!("no player named {target:?}");
        return true;
    };
    match Command::parse(rest) {
        Ok(None) | Ok(Some(Command::Help)) => println!("{CLIENT_HELP}"),
        Ok(Some(Command::Quit)) => return false,
        Ok(Some(cmd)) => report(client.execute(cmd).await.map(|out| format!("{target}: {out}"))),
        Err(e) => println!("{target}: {e}"),
    }
    true
}

fn report(result: Result<String, PerilError>) {
    match result {
        Ok(out) => println!("{out}"),
        Err(e) => println!("error: {e}"),
    }
}
