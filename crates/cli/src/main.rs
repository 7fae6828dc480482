mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "bond-cli", about = "Bond and donation developer CLI")]
struct Cli {
    /// Address registry JSON document.
    #[arg(long, global = true, value_name = "PATH")]
    registry: Option<PathBuf>,
    /// Network (chain) id to resolve contracts on.
    #[arg(long, global = true, default_value_t = 137)]
    network: u64,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a bond deposit.
    Quote(commands::read::QuoteArgs),
    /// Show an address's bond position.
    Position(commands::read::PositionArgs),
    /// Donation drive totals and the caller's token balance.
    DonationStats(commands::read::DonationStatsArgs),
    /// Approve a bond depository to spend the reserve token.
    Approve(commands::write::ApproveArgs),
    /// Deposit reserve tokens into a bond.
    Bond(commands::write::BondArgs),
    /// Redeem vested payout.
    Redeem(commands::write::RedeemArgs),
    /// Approve the donation drive for an exact amount.
    ApproveDonation(commands::write::DonationArgs),
    /// Donate to the drive.
    Donate(commands::write::DonationArgs),
    /// Convert a decimal string into its fixed-point integer.
    ToFixed(commands::fixed::ToFixedArgs),
    /// Convert a fixed-point integer into its decimal string.
    FromFixed(commands::fixed::FromFixedArgs),
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        .build();
    // stdout carries command output; logs go to stderr
    if TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("logger already initialized");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let ctx = commands::common::Context {
        registry: cli.registry,
        network: cli.network,
    };
    let result = match cli.command {
        Commands::Quote(args) => commands::read::quote(&ctx, args),
        Commands::Position(args) => commands::read::position(&ctx, args),
        Commands::DonationStats(args) => commands::read::donation_stats(&ctx, args),
        Commands::Approve(args) => commands::write::approve(&ctx, args),
        Commands::Bond(args) => commands::write::bond(&ctx, args),
        Commands::Redeem(args) => commands::write::redeem(&ctx, args),
        Commands::ApproveDonation(args) => commands::write::approve_donation(&ctx, args),
        Commands::Donate(args) => commands::write::donate(&ctx, args),
        Commands::ToFixed(args) => commands::fixed::to_fixed(args),
        Commands::FromFixed(args) => commands::fixed::from_fixed(args),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
