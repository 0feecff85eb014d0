//! Bargain - terminal driver for the negotiation engine
//!
//! Reads one command per line from stdin and prints the negotiation as it
//! unfolds. Logs go to stderr.

use bargain::runtime::TokioDelay;
use bargain::{
    Agent, BonusSource, HistoryEntry, HistoryKind, NegotiationConfig, NegotiationHandle,
    NegotiationRuntime, NegotiationSnapshot, NegotiationStatus, RuntimeError, SeededBonus, Split,
    ThreadRngBonus,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let json_logs = std::env::var("BARGAIN_LOG_FORMAT").is_ok_and(|f| f == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bargain=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Configuration
    let config = NegotiationConfig::from_env();

    let seed = std::env::var("BARGAIN_SEED")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok());
    let bonus: Box<dyn BonusSource + Send> = if let Some(seed) = seed {
        tracing::info!(seed, "Using seeded counterpart");
        Box::new(SeededBonus::new(seed))
    } else {
        Box::new(ThreadRngBonus)
    };

    tracing::info!(
        total_resources = config.total_resources,
        max_rounds = config.max_rounds,
        "Negotiation configured"
    );
    let handle = NegotiationRuntime::spawn(&config, bonus, TokioDelay)?;

    print_rules(&config);
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Rules => print_rules(&config),
            Input::Invalid(message) => println!("{message}"),
            Input::Command(command) => run_command(&handle, &config, command).await,
        }
        prompt();
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum PlayerCommand {
    Start,
    Offer(u32),
    Accept,
    Reset,
    Status,
    History,
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Empty,
    Quit,
    Rules,
    Invalid(String),
    Command(PlayerCommand),
}

fn parse_input(line: &str) -> Input {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Input::Empty;
    };

    match (verb.to_ascii_lowercase().as_str(), words.next()) {
        ("start", None) => Input::Command(PlayerCommand::Start),
        ("accept", None) => Input::Command(PlayerCommand::Accept),
        ("reset", None) => Input::Command(PlayerCommand::Reset),
        ("status", None) => Input::Command(PlayerCommand::Status),
        ("history", None) => Input::Command(PlayerCommand::History),
        ("rules" | "help", None) => Input::Rules,
        ("quit" | "exit", None) => Input::Quit,
        ("offer", Some(amount)) => match amount.parse::<u32>() {
            Ok(share) => Input::Command(PlayerCommand::Offer(share)),
            Err(_) => Input::Invalid(format!("Invalid proposal: '{amount}' is not a whole number")),
        },
        ("offer", None) => Input::Invalid("Usage: offer <your share>".to_string()),
        _ => Input::Invalid(format!("Unknown command: {}", line.trim())),
    }
}

async fn run_command(handle: &NegotiationHandle, config: &NegotiationConfig, command: PlayerCommand) {
    let result = match command {
        PlayerCommand::Start => handle.start().await,
        PlayerCommand::Offer(share) => {
            if !config.counterpart_delay.is_zero() {
                println!("Counterpart is thinking...");
            }
            handle.propose(share).await
        }
        PlayerCommand::Accept => handle.accept_current_offer().await,
        PlayerCommand::Reset => handle.reset().await,
        PlayerCommand::Status => handle.snapshot().await,
        PlayerCommand::History => match handle.snapshot().await {
            Ok(snapshot) => {
                print_history(&snapshot);
                return;
            }
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(snapshot) => println!("{}", describe_snapshot(&snapshot)),
        Err(RuntimeError::Transition(e)) => println!("{e}"),
        Err(e) => {
            tracing::warn!(error = %e, "Command failed");
            println!("{e}");
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_rules(config: &NegotiationConfig) {
    println!(
        "Divide {} resources with the counterpart. Take turns making offers: \
         propose how much you keep with `offer <n>`, or `accept` the counterpart's \
         last offer. The game ends when an offer is accepted or after {} rounds, \
         in which case the counterpart's final offer stands.",
        config.total_resources, config.max_rounds
    );
    println!("Commands: start, offer <n>, accept, reset, status, history, rules, quit");
}

fn print_history(snapshot: &NegotiationSnapshot) {
    if snapshot.history.is_empty() {
        println!("No negotiation yet.");
    }
    for entry in &snapshot.history {
        println!("Round {}: {}", entry.round, describe_entry(entry));
    }
}

fn subject(agent: Agent) -> &'static str {
    match agent {
        Agent::Player => "You",
        Agent::Counterpart => "Counterpart",
    }
}

fn describe_split(split: Split) -> String {
    format!(
        "[{} for you, {} for the counterpart]",
        split.player, split.counterpart
    )
}

fn describe_entry(entry: &HistoryEntry) -> String {
    match entry.kind {
        HistoryKind::Started => "Negotiation started".to_string(),
        HistoryKind::Offered { split } => {
            format!("{} offered {}", subject(entry.agent), describe_split(split))
        }
        HistoryKind::Accepted { split } => {
            format!("{} accepted {}", subject(entry.agent), describe_split(split))
        }
        HistoryKind::RoundsExhausted { split } => format!(
            "Maximum rounds reached, final division {}",
            describe_split(split)
        ),
    }
}

fn describe_snapshot(snapshot: &NegotiationSnapshot) -> String {
    match snapshot.status() {
        NegotiationStatus::NotStarted => "No negotiation running. Type `start` to begin.".to_string(),
        NegotiationStatus::InProgress => match snapshot.last_offer() {
            Some(offer) if snapshot.can_accept() => format!(
                "Round {}/{}: counterpart offers {}. `accept` or `offer <n>`.",
                snapshot.current_round,
                snapshot.max_rounds,
                describe_split(offer.split)
            ),
            _ => format!(
                "Round {}/{}: your move. How much of {} do you keep? `offer <n>`.",
                snapshot.current_round, snapshot.max_rounds, snapshot.total_resources
            ),
        },
        NegotiationStatus::Accepted => match snapshot.final_proposal() {
            Some(offer) => format!(
                "Deal! {} accepted {}.",
                subject(offer.by.other()),
                describe_split(offer.split)
            ),
            None => "Deal!".to_string(),
        },
        NegotiationStatus::RoundsExhausted => match snapshot.final_proposal() {
            Some(offer) => format!(
                "Out of rounds. The counterpart's last offer stands: {}.",
                describe_split(offer.split)
            ),
            None => "Out of rounds.".to_string(),
        },
    }
}
