use anyhow::Result;
use bond_sdk::{BondId, DonationReader, PositionReader, QuoteEngine};
use clap::Args;

use super::common::{parse_address, Context, RpcArgs};

#[derive(Clone, Debug, Args)]
pub struct QuoteArgs {
    /// Bond identifier (klima_bct_lp, bct_usdc_lp, dai, dai_v1).
    pub bond: BondId,
    /// Reserve-token amount to price; empty prices the placeholder deposit.
    #[arg(long, default_value = "")]
    pub amount: String,
    #[command(flatten)]
    pub rpc: RpcArgs,
}

#[derive(Clone, Debug, Args)]
pub struct PositionArgs {
    pub bond: BondId,
    /// Depositor address.
    #[arg(long, value_name = "HEX40")]
    pub address: String,
    #[command(flatten)]
    pub rpc: RpcArgs,
}

#[derive(Clone, Debug, Args)]
pub struct DonationStatsArgs {
    /// Donor address.
    #[arg(long, value_name = "HEX40")]
    pub address: String,
    #[command(flatten)]
    pub rpc: RpcArgs,
}

pub fn quote(ctx: &Context, args: QuoteArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let transport = args.rpc.read_transport()?;
    let quote = QuoteEngine::new(&registry, &transport).compute_bond_quote(
        args.bond,
        &args.amount,
        ctx.network,
    )?;

    println!("bond: {}", quote.bond);
    println!("amount: {}", quote.amount);
    println!("payout: {}", quote.payout);
    println!("bond price: {}", quote.bond_price);
    println!("market price: {}", quote.market_price);
    println!("discount: {}", quote.discount);
    println!("debt ratio: {}", quote.debt_ratio);
    println!("max payout: {}", quote.max_payout);
    println!("vesting term: {} blocks", quote.vesting_term);
    if let Some(warning) = &quote.warning {
        println!("warning: {warning}");
    }
    Ok(())
}

pub fn position(ctx: &Context, args: PositionArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let address = parse_address(&args.address)?;
    let transport = args.rpc.read_transport()?;
    let position = PositionReader::new(&registry, &transport).read_user_position(
        address,
        args.bond,
        ctx.network,
    )?;

    println!("bond: {}", position.bond);
    println!("interest due: {}", position.interest_due);
    println!("pending payout: {}", position.pending_payout);
    println!("maturation block: {}", position.maturation_block);
    println!("allowance: {}", position.allowance);
    println!("balance: {}", position.balance);
    Ok(())
}

pub fn donation_stats(ctx: &Context, args: DonationStatsArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    let owner = parse_address(&args.address)?;
    let transport = args.rpc.read_transport()?;
    let reader = DonationReader::new(&registry, &transport);
    let stats = reader.donation_stats(owner, ctx.network)?;
    let allowance = reader.donation_allowance(owner, ctx.network)?;

    println!("balance: {}", stats.balance);
    println!("allowance: {allowance}");
    println!("total donated: {}", stats.total_donated);
    println!("goal: {}", stats.goal);
    if stats.goal_reached() {
        println!("goal reached");
    }
    Ok(())
}
