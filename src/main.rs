//! Entry point for `sr-arq`.
//!
//! Runs a Selective-Repeat transfer through the built-in channel simulator
//! and reports the counters.  All protocol work lives in the library
//! modules; `main.rs` owns only process setup (logging, argument parsing)
//! and the final report.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use sr_arq::simulator::{ChannelConfig, Simulation};
use sr_arq::{Message, SeqSpace};

/// Selective-Repeat ARQ simulation over a lossy, corrupting channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of messages to submit.
    #[arg(short = 'n', long, default_value_t = 20)]
    messages: u64,

    /// Milliseconds between successive submissions.
    #[arg(long, default_value_t = 40)]
    interval_ms: u64,

    /// Probability that the channel drops a packet (0.0 - 1.0).
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,

    /// Probability that the channel corrupts a packet (0.0 - 1.0).
    #[arg(short, long, default_value_t = 0.0)]
    corrupt: f64,

    /// Send window size.
    #[arg(short, long, default_value_t = 6)]
    window: i32,

    /// Sequence-space size (must be at least twice the window).
    #[arg(short, long, default_value_t = 13)]
    seqspace: i32,

    /// Retransmit timeout in milliseconds.
    #[arg(short, long, default_value_t = 30)]
    timeout_ms: u64,

    /// RNG seed; identical seeds reproduce identical runs.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let space = SeqSpace::new(cli.window, cli.seqspace)?;
    let config = ChannelConfig {
        loss_rate: cli.loss.clamp(0.0, 1.0),
        corrupt_rate: cli.corrupt.clamp(0.0, 1.0),
        ..ChannelConfig::default()
    };

    let mut sim = Simulation::new(
        space,
        Duration::from_millis(cli.timeout_ms),
        config,
        cli.seed,
    );

    let messages =
        (0..cli.messages).map(|i| Message::new(format!("message {i:04}").as_bytes()));
    sim.submit_spaced(messages, Duration::from_millis(cli.interval_ms));

    // Plenty of headroom for retransmissions; only a pathological
    // configuration (e.g. --loss 1.0) hits the bound.
    let budget = (cli.messages as usize + 1) * 200;
    let processed = sim.run(budget);

    let snd = sim.sender_stats();
    let rcv = sim.receiver_stats();
    let chan = sim.channel_tally();

    println!("simulated time         {:?}", sim.now());
    println!("events processed       {processed}");
    println!();
    println!("packets sent           {}", snd.packets_sent);
    println!("packets resent         {}", snd.packets_resent);
    println!("acks received          {}", snd.total_acks_received);
    println!("new acks               {}", snd.new_acks);
    println!("window-full rejects    {}", snd.window_full);
    println!();
    println!("packets received       {}", rcv.packets_received);
    println!("delivered in order     {}", rcv.delivered);
    println!();
    println!("channel losses         {}", chan.lost);
    println!("channel corruptions    {}", chan.corrupted);

    if rcv.delivered < cli.messages - snd.window_full {
        log::warn!(
            "transfer incomplete: {} of {} accepted messages delivered",
            rcv.delivered,
            cli.messages - snd.window_full
        );
    }

    Ok(())
}
