//! Per-network address registry for bond, market and donation contracts.
//!
//! The registry is loaded from a JSON document shaped like:
//!
//! ```json
//! {
//!   "networks": {
//!     "137": {
//!       "market": { "pair": "0x..", "protocol_is_token0": false },
//!       "bonds": [
//!         {
//!           "id": "klima_bct_lp",
//!           "kind": { "type": "liquidity_pool", "calculator": "0x..", "pool": "0x.." },
//!           "depository": "0x..",
//!           "reserve": "0x.."
//!         }
//!       ],
//!       "donation": { "contract": "0x..", "token": "0x.." }
//!     }
//!   }
//! }
//! ```
//!
//! Precision fields default to 18 decimals for reserves and bond prices and
//! 9 decimals for the market price. `payoutFor` results default per kind:
//! 9 decimals for liquidity-pool bonds, 18 for single-reserve and legacy
//! bonds.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    amount::Precision,
    error::{Error, Result},
};

/// Chain id a deployment lives on.
pub type NetworkId = u64;

/// Enumerated tag selecting a depository/reserve/calculator triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondId {
    /// Protocol-token/BCT liquidity-pool bond.
    KlimaBctLp,
    /// BCT/USDC liquidity-pool bond.
    BctUsdcLp,
    /// Stablecoin bond with 1:1 reserve backing.
    Dai,
    /// First-generation stablecoin bond.
    DaiV1,
}

impl BondId {
    pub const ALL: [BondId; 4] = [Self::KlimaBctLp, Self::BctUsdcLp, Self::Dai, Self::DaiV1];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KlimaBctLp => "klima_bct_lp",
            Self::BctUsdcLp => "bct_usdc_lp",
            Self::Dai => "dai",
            Self::DaiV1 => "dai_v1",
        }
    }
}

impl fmt::Display for BondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BondId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| Error::Registry(format!("unknown bond id `{value}`")))
    }
}

/// Which depository ABI a bond speaks for positions and redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositoryGeneration {
    /// `depositorInfo` / `calculatePendingPayout` / `redeem()`.
    Legacy,
    /// `bondInfo` / `pendingPayoutFor` / `redeem(recipient, stake)`.
    Current,
}

/// How a bond values its reserve deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BondKind {
    /// LP-token reserve valued through a bonding calculator before `payoutFor`.
    LiquidityPool { calculator: Address, pool: Address },
    /// Single reserve token with 1:1 backing.
    SingleReserve,
    /// Single reserve token on a first-generation depository.
    Legacy,
}

impl BondKind {
    pub fn generation(&self) -> DepositoryGeneration {
        match self {
            Self::Legacy => DepositoryGeneration::Legacy,
            Self::LiquidityPool { .. } | Self::SingleReserve => DepositoryGeneration::Current,
        }
    }

    /// Scale of `payoutFor` when the registry does not name one.
    pub fn default_payout_precision(&self) -> Precision {
        match self {
            Self::LiquidityPool { .. } => Precision::PROTOCOL_TOKEN,
            Self::SingleReserve | Self::Legacy => Precision::RESERVE_TOKEN,
        }
    }
}

fn reserve_precision() -> Precision {
    Precision::RESERVE_TOKEN
}

fn protocol_precision() -> Precision {
    Precision::PROTOCOL_TOKEN
}

/// Everything needed to price, read and transact against one bond.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondDeployment {
    pub id: BondId,
    pub kind: BondKind,
    /// Bond depository; also the spender that reserve approvals target.
    pub depository: Address,
    /// Token deposited into the bond.
    pub reserve: Address,
    #[serde(default = "reserve_precision")]
    pub reserve_precision: Precision,
    /// Precision of `payoutFor` results; see [`Self::payout_precision`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_precision: Option<Precision>,
    /// Precision of `bondPriceInUSD`.
    #[serde(default = "reserve_precision")]
    pub bond_price_precision: Precision,
}

impl BondDeployment {
    /// Scale `payoutFor` quotes are expressed at.
    pub fn payout_precision(&self) -> Precision {
        self.payout_precision
            .unwrap_or_else(|| self.kind.default_payout_precision())
    }
}

/// Liquidity pair the protocol token's market price is read from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDeployment {
    pub pair: Address,
    /// True when the protocol token is `token0` of the pair.
    pub protocol_is_token0: bool,
    #[serde(default = "protocol_precision")]
    pub protocol_precision: Precision,
    /// Precision of the token the price is quoted in.
    #[serde(default = "reserve_precision")]
    pub quote_precision: Precision,
    /// Precision the market price is expressed at.
    #[serde(default = "protocol_precision")]
    pub price_precision: Precision,
}

/// Donation drive and the token it accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationDeployment {
    pub contract: Address,
    pub token: Address,
    #[serde(default = "reserve_precision")]
    pub token_precision: Precision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeployment {
    pub market: MarketDeployment,
    #[serde(default)]
    pub bonds: Vec<BondDeployment>,
    #[serde(default)]
    pub donation: Option<DonationDeployment>,
}

impl NetworkDeployment {
    pub fn bond(&self, id: BondId) -> Option<&BondDeployment> {
        self.bonds.iter().find(|bond| bond.id == id)
    }
}

/// Resolves contract addresses and precisions per network id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRegistry {
    networks: BTreeMap<NetworkId, NetworkDeployment>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a registry document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let registry: Self =
            serde_json::from_str(json).map_err(|err| Error::Registry(err.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| Error::Registry(format!("read {}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Registers (or replaces) the deployment for `network`.
    pub fn insert(&mut self, network: NetworkId, deployment: NetworkDeployment) -> Result<()> {
        validate_network(network, &deployment)?;
        self.networks.insert(network, deployment);
        Ok(())
    }

    pub fn networks(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.networks.keys().copied()
    }

    pub fn network(&self, network: NetworkId) -> Result<&NetworkDeployment> {
        self.networks
            .get(&network)
            .ok_or(Error::UnknownNetwork(network))
    }

    pub fn bond(&self, network: NetworkId, id: BondId) -> Result<&BondDeployment> {
        self.network(network)?
            .bond(id)
            .ok_or_else(|| Error::UnknownBond {
                bond: id.to_string(),
                network,
            })
    }

    pub fn market(&self, network: NetworkId) -> Result<&MarketDeployment> {
        self.network(network).map(|deployment| &deployment.market)
    }

    pub fn donation(&self, network: NetworkId) -> Result<&DonationDeployment> {
        self.network(network)?
            .donation
            .as_ref()
            .ok_or(Error::DonationUnavailable(network))
    }

    fn validate(&self) -> Result<()> {
        for (network, deployment) in &self.networks {
            validate_network(*network, deployment)?;
        }
        Ok(())
    }
}

fn validate_network(network: NetworkId, deployment: &NetworkDeployment) -> Result<()> {
    let market = &deployment.market;
    check_precisions(
        network,
        &[market.protocol_precision, market.quote_precision, market.price_precision],
    )?;
    if let Some(donation) = &deployment.donation {
        check_precisions(network, &[donation.token_precision])?;
    }
    for (index, bond) in deployment.bonds.iter().enumerate() {
        if deployment.bonds[..index].iter().any(|other| other.id == bond.id) {
            return Err(Error::Registry(format!(
                "bond {} registered twice on network {network}",
                bond.id
            )));
        }
        if bond.depository == Address::ZERO || bond.reserve == Address::ZERO {
            return Err(Error::Registry(format!(
                "bond {} on network {network} has a zero address",
                bond.id
            )));
        }
        if matches!(bond.kind, BondKind::LiquidityPool { calculator, .. } if calculator == Address::ZERO)
        {
            return Err(Error::Registry(format!(
                "liquidity-pool bond {} on network {network} has no calculator",
                bond.id
            )));
        }
        check_precisions(
            network,
            &[bond.reserve_precision, bond.payout_precision(), bond.bond_price_precision],
        )?;
    }
    Ok(())
}

/// `10^77` is the largest power of ten a 256-bit word holds.
fn check_precisions(network: NetworkId, precisions: &[Precision]) -> Result<()> {
    match precisions.iter().find(|precision| precision.decimals() > 77) {
        Some(precision) => Err(Error::Registry(format!(
            "{precision} on network {network} exceeds the 77 a 256-bit amount can hold"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_NETWORK: NetworkId = 137;

    pub(crate) fn sample_registry_json() -> String {
        serde_json::json!({
            "networks": {
                "137": {
                    "market": {
                        "pair": format!("{}", Address::repeat_byte(0x50)),
                        "protocol_is_token0": false
                    },
                    "bonds": [
                        {
                            "id": "klima_bct_lp",
                            "kind": {
                                "type": "liquidity_pool",
                                "calculator": format!("{}", Address::repeat_byte(0x31)),
                                "pool": format!("{}", Address::repeat_byte(0x32))
                            },
                            "depository": format!("{}", Address::repeat_byte(0x11)),
                            "reserve": format!("{}", Address::repeat_byte(0x32))
                        },
                        {
                            "id": "dai",
                            "kind": { "type": "single_reserve" },
                            "depository": format!("{}", Address::repeat_byte(0x12)),
                            "reserve": format!("{}", Address::repeat_byte(0x22))
                        },
                        {
                            "id": "dai_v1",
                            "kind": { "type": "legacy" },
                            "depository": format!("{}", Address::repeat_byte(0x13)),
                            "reserve": format!("{}", Address::repeat_byte(0x22))
                        }
                    ],
                    "donation": {
                        "contract": format!("{}", Address::repeat_byte(0x40)),
                        "token": format!("{}", Address::repeat_byte(0x41))
                    }
                }
            }
        })
        .to_string()
    }

    pub(crate) fn sample_registry() -> AddressRegistry {
        AddressRegistry::from_json_str(&sample_registry_json()).expect("sample registry")
    }

    #[test]
    fn loads_bonds_with_default_precisions() {
        let registry = sample_registry();
        let lp = registry.bond(SAMPLE_NETWORK, BondId::KlimaBctLp).unwrap();
        assert_eq!(lp.reserve_precision, Precision::RESERVE_TOKEN);
        assert_eq!(lp.payout_precision(), Precision::PROTOCOL_TOKEN);
        assert_eq!(lp.bond_price_precision, Precision::RESERVE_TOKEN);
        assert_eq!(
            lp.kind,
            BondKind::LiquidityPool {
                calculator: Address::repeat_byte(0x31),
                pool: Address::repeat_byte(0x32),
            }
        );

        let dai = registry.bond(SAMPLE_NETWORK, BondId::Dai).unwrap();
        assert_eq!(dai.payout_precision, None);
        assert_eq!(dai.payout_precision(), Precision::RESERVE_TOKEN);
        assert_eq!(dai.kind.generation(), DepositoryGeneration::Current);

        let legacy = registry.bond(SAMPLE_NETWORK, BondId::DaiV1).unwrap();
        assert_eq!(legacy.kind.generation(), DepositoryGeneration::Legacy);
        assert_eq!(legacy.payout_precision(), Precision::RESERVE_TOKEN);

        let market = registry.market(SAMPLE_NETWORK).unwrap();
        assert_eq!(market.price_precision, Precision::PROTOCOL_TOKEN);
        assert!(registry.donation(SAMPLE_NETWORK).is_ok());
    }

    #[test]
    fn lookups_report_missing_entries() {
        let registry = sample_registry();
        assert!(matches!(
            registry.network(1),
            Err(Error::UnknownNetwork(1))
        ));
        assert!(matches!(
            registry.bond(SAMPLE_NETWORK, BondId::BctUsdcLp),
            Err(Error::UnknownBond { network: 137, .. })
        ));
    }

    #[test]
    fn duplicate_bond_ids_are_rejected() {
        let mut registry = sample_registry();
        let mut deployment = registry.network(SAMPLE_NETWORK).unwrap().clone();
        let duplicate = deployment.bonds[0].clone();
        deployment.bonds.push(duplicate);
        let err = registry.insert(80001, deployment).expect_err("duplicate");
        assert!(matches!(err, Error::Registry(_)));
    }

    #[test]
    fn oversized_precision_is_rejected() {
        let json = sample_registry_json().replace(
            "\"id\":\"dai\"",
            "\"id\":\"dai\",\"payout_precision\":78",
        );
        assert!(json.contains("\"payout_precision\":78"));
        let err = AddressRegistry::from_json_str(&json).expect_err("precision");
        assert!(matches!(err, Error::Registry(ref message) if message.contains("78 decimals")));
    }

    #[test]
    fn explicit_payout_precision_overrides_kind_default() {
        let json = sample_registry_json().replace(
            "\"id\":\"klima_bct_lp\"",
            "\"id\":\"klima_bct_lp\",\"payout_precision\":18",
        );
        let registry = AddressRegistry::from_json_str(&json).unwrap();
        let lp = registry.bond(SAMPLE_NETWORK, BondId::KlimaBctLp).unwrap();
        assert_eq!(lp.payout_precision, Some(Precision::RESERVE_TOKEN));
        assert_eq!(lp.payout_precision(), Precision::RESERVE_TOKEN);
        assert_eq!(
            BondKind::SingleReserve.default_payout_precision(),
            Precision::RESERVE_TOKEN
        );
    }

    #[test]
    fn registry_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, sample_registry_json()).unwrap();
        let loaded = AddressRegistry::load(&path).unwrap();
        assert_eq!(loaded, sample_registry());
        assert_eq!(loaded.networks().collect::<Vec<_>>(), vec![SAMPLE_NETWORK]);
    }

    #[test]
    fn bond_ids_parse_from_snake_case() {
        for id in BondId::ALL {
            assert_eq!(id.as_str().parse::<BondId>().unwrap(), id);
        }
        assert!("ohm_dai".parse::<BondId>().is_err());
    }
}
