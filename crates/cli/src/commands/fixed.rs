use alloy_primitives::U256;
use anyhow::{anyhow, Result};
use bond_sdk::{from_fixed_point, to_fixed_point, Precision};
use clap::Args;

#[derive(Clone, Debug, Args)]
pub struct ToFixedArgs {
    /// Decimal amount, e.g. 12.5
    pub value: String,
    #[arg(long, default_value_t = 18, value_parser = clap::value_parser!(u8).range(0..=77))]
    pub decimals: u8,
}

#[derive(Clone, Debug, Args)]
pub struct FromFixedArgs {
    /// Base-10 integer magnitude.
    pub raw: String,
    #[arg(long, default_value_t = 18, value_parser = clap::value_parser!(u8).range(0..=77))]
    pub decimals: u8,
}

pub fn to_fixed(args: ToFixedArgs) -> Result<()> {
    let raw = to_fixed_point(&args.value, Precision(args.decimals))?;
    println!("{raw}");
    Ok(())
}

pub fn from_fixed(args: FromFixedArgs) -> Result<()> {
    let raw = U256::from_str_radix(args.raw.trim(), 10)
        .map_err(|err| anyhow!("parse {:?} as an integer: {err}", args.raw))?;
    println!("{}", from_fixed_point(raw, Precision(args.decimals)));
    Ok(())
}
