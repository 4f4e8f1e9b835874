//! Console demonstration of the funnel router running entirely against
//! simulated channels: no host backend required.
//!
//! ```text
//! funnel_demo hello '$abc' 2+3 4x5
//! ```
//!
//! `A+B` and `AxB` go to the AddXY module, everything else is echoed. A
//! leading `$` makes the echo module re-send the rest of the string as a
//! second request, visible as an extra turn in the output.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use port_funnel::modules::add_xy::{self, AddXy, AddXyMessage, AddXyState};
use port_funnel::modules::echo::{self, Echo, EchoMessage, EchoState};
use port_funnel::{FunnelTable, Inbox, SimulatedChannel, StateAccessor};

#[derive(Parser, Debug)]
#[command(name = "funnel_demo", about = "Route messages through simulated funnel modules")]
struct Cli {
    /// Messages to send: `A+B` adds, `AxB` multiplies, anything else echoes.
    #[arg(required = true)]
    messages: Vec<String>,

    /// Show the accumulated per-module state after the run.
    #[arg(long)]
    show_state: bool,
}

#[derive(Debug, Clone, Default)]
struct AppState {
    echo: EchoState,
    add_xy: AddXyState,
}

#[derive(Debug, Default)]
struct AppModel {
    turns: usize,
}

enum AppEffect {
    Print(String),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let inbox = Inbox::new();

    let mut table: FunnelTable<AppState, AppModel, AppEffect> = FunnelTable::new();
    table.register(
        Echo,
        StateAccessor::new(|s: &AppState| s.echo.clone(), |sub, s| s.echo = sub),
        Box::new(SimulatedChannel::new(Echo, echo::simulate, inbox.clone())),
        |response, _state, model| {
            model.turns += 1;
            response
                .messages()
                .iter()
                .map(|msg| match msg {
                    EchoMessage::Request(s) => AppEffect::Print(format!("echo: {s}")),
                    EchoMessage::Startup => AppEffect::Print("echo backend ready".into()),
                })
                .collect()
        },
    )?;
    table.register(
        AddXy,
        StateAccessor::new(|s: &AppState| s.add_xy.clone(), |sub, s| s.add_xy = sub),
        Box::new(SimulatedChannel::new(AddXy, add_xy::simulate, inbox.clone())),
        |response, _state, model| {
            model.turns += 1;
            response.messages().into_iter().filter_map(describe).collect()
        },
    )?;

    let mut state = AppState::default();
    let mut model = AppModel::default();

    for raw in &cli.messages {
        match parse_arithmetic(raw) {
            Some(msg) => table.send(&AddXy, &msg)?,
            None => table.send(&Echo, &EchoMessage::Request(raw.clone()))?,
        }
    }

    // The event loop: each queued wire value is a separate inbound turn;
    // performing its effects may queue further turns (the `$` convention).
    while let Some(wire) = inbox.pop() {
        let effects = table.dispatch(&wire, &mut state, &mut model)?;
        for AppEffect::Print(line) in table.perform(effects) {
            println!("{line}");
        }
    }

    if cli.show_state {
        println!("turns: {}", model.turns);
        println!("echo history: {:?}", state.echo.history);
        println!("add_xy history: {:?}", state.add_xy.history);
    }
    Ok(())
}

fn describe(msg: &AddXyMessage) -> Option<AppEffect> {
    match msg {
        AddXyMessage::Sum { x, y, result } => Some(AppEffect::Print(format!("{x} + {y} = {result}"))),
        AddXyMessage::Product { x, y, result } => {
            Some(AppEffect::Print(format!("{x} * {y} = {result}")))
        }
        _ => None,
    }
}

fn parse_arithmetic(raw: &str) -> Option<AddXyMessage> {
    let parse = |sep: char| -> Option<(i64, i64)> {
        let (x, y) = raw.split_once(sep)?;
        Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
    };
    if let Some((x, y)) = parse('+') {
        return Some(AddXyMessage::Add { x, y });
    }
    if let Some((x, y)) = parse('x') {
        return Some(AddXyMessage::Multiply { x, y });
    }
    None
}
