use anyhow::{ensure, Result};
use bond_sdk::{
    AddressRegistry, BondId, BondRequest, FixedPoint, PositionReader, Slippage,
    TransactionOrchestrator, TxOutcome,
};
use clap::Args;
use log::warn;

use super::common::{
    format_tx_hash, parse_address, CliTransport, ConsoleReporter, Context, TxArgs,
};

#[derive(Clone, Debug, Args)]
pub struct ApproveArgs {
    pub bond: BondId,
    #[command(flatten)]
    pub tx: TxArgs,
}

#[derive(Clone, Debug, Args)]
pub struct BondArgs {
    pub bond: BondId,
    /// Reserve-token amount to deposit.
    #[arg(long)]
    pub amount: String,
    /// Address credited with the bond.
    #[arg(long, value_name = "HEX40")]
    pub depositor: String,
    /// Tolerated bond price increase in basis points.
    #[arg(long, default_value_t = 200)]
    pub slippage_bps: u32,
    #[command(flatten)]
    pub tx: TxArgs,
}

#[derive(Clone, Debug, Args)]
pub struct RedeemArgs {
    pub bond: BondId,
    /// Receives the payout (ignored by legacy depositories).
    #[arg(long, value_name = "HEX40")]
    pub recipient: String,
    /// Stake the payout instead of sending it.
    #[arg(long, default_value_t = false)]
    pub autostake: bool,
    #[command(flatten)]
    pub tx: TxArgs,
}

#[derive(Clone, Debug, Args)]
pub struct DonationArgs {
    /// Donation-token amount.
    #[arg(long)]
    pub amount: String,
    #[command(flatten)]
    pub tx: TxArgs,
}

pub fn approve(ctx: &Context, args: ApproveArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let transport = args.tx.transport()?;
    let outcome = TransactionOrchestrator::new(&registry, &transport).approve_bond(
        args.bond,
        ctx.network,
        &ConsoleReporter,
    )?;
    print_outcome(&outcome.tx);
    println!("allowance: {}", outcome.allowance);
    transport.print_dry_run();
    Ok(())
}

pub fn bond(ctx: &Context, args: BondArgs) -> Result<()> {
    ensure!(
        args.slippage_bps <= 10_000,
        "--slippage-bps must be at most 10000"
    );
    let registry = ctx.load_registry()?;
    let request = BondRequest {
        bond: args.bond,
        amount: args.amount,
        depositor: parse_address(&args.depositor)?,
        slippage: Some(Slippage::from_bps(args.slippage_bps)),
    };
    let transport = args.tx.transport()?;
    warn_if_unapproved(&registry, &transport, ctx.network, &request);
    let outcome = TransactionOrchestrator::new(&registry, &transport).bond(
        &request,
        ctx.network,
        &ConsoleReporter,
    )?;
    print_outcome(&outcome.tx);
    println!("max price: {}", outcome.max_price);
    if let Some(balance) = outcome.balance {
        println!("balance: {balance}");
    }
    transport.print_dry_run();
    Ok(())
}

pub fn redeem(ctx: &Context, args: RedeemArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let recipient = parse_address(&args.recipient)?;
    let transport = args.tx.transport()?;
    let outcome = TransactionOrchestrator::new(&registry, &transport).redeem(
        args.bond,
        recipient,
        args.autostake,
        ctx.network,
        &ConsoleReporter,
    )?;
    print_outcome(&outcome);
    transport.print_dry_run();
    Ok(())
}

pub fn approve_donation(ctx: &Context, args: DonationArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let transport = args.tx.transport()?;
    let outcome = TransactionOrchestrator::new(&registry, &transport).approve_donation(
        &args.amount,
        ctx.network,
        &ConsoleReporter,
    )?;
    print_outcome(&outcome.tx);
    println!("allowance: {}", outcome.allowance);
    transport.print_dry_run();
    Ok(())
}

pub fn donate(ctx: &Context, args: DonationArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let transport = args.tx.transport()?;
    let outcome = TransactionOrchestrator::new(&registry, &transport).donate(
        &args.amount,
        ctx.network,
        &ConsoleReporter,
    )?;
    print_outcome(&outcome);
    transport.print_dry_run();
    Ok(())
}

/// Flags a deposit the depository cannot pull yet. The bond is still
/// attempted; malformed amounts are left for the orchestrator to reject.
fn warn_if_unapproved(
    registry: &AddressRegistry,
    transport: &CliTransport,
    network: u64,
    request: &BondRequest,
) {
    let Ok(deployment) = registry.bond(network, request.bond) else {
        return;
    };
    let Ok(amount) = FixedPoint::parse(&request.amount, deployment.reserve_precision) else {
        return;
    };
    match PositionReader::new(registry, transport).read_user_position(
        request.depositor,
        request.bond,
        network,
    ) {
        Ok(position) if !position.has_approval(&amount) => println!(
            "warning: allowance {} does not cover {amount}; run `approve {}` first",
            position.allowance, request.bond
        ),
        Ok(_) => {}
        Err(err) => warn!("allowance check skipped: {err}"),
    }
}

fn print_outcome(outcome: &TxOutcome) {
    println!("tx hash: {}", format_tx_hash(outcome.tx_hash));
    if let Some(block) = outcome.receipt.block_number {
        println!("block: {block}");
    }
}
