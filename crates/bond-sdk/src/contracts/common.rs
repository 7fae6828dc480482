use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    error::{Error, Result},
    transport::{EvmCall, EvmTransport, EvmViewTransport},
};

/// Hash returned by the transport after submitting an EVM transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxHash(pub B256);

impl TxHash {
    pub fn bytes(self) -> [u8; 32] {
        self.0.into()
    }
}

impl From<B256> for TxHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

/// Narrows a block count or height returned by a contract to `u64`.
pub(crate) fn block_number(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::Decode(format!("{field}: {value} does not fit a block number")))
}

/// Encodes `call`, runs it as an `eth_call` against `to` and decodes the return.
pub(crate) fn call_view<T, C>(transport: &T, to: Address, call: C) -> Result<C::Return>
where
    T: EvmViewTransport + ?Sized,
    C: SolCall,
{
    let calldata = call.abi_encode();
    let evm_call = EvmCall::new(to, Bytes::from(calldata), U256::ZERO);
    let raw = transport.call_view(evm_call)?;
    C::abi_decode_returns(&raw, true)
        .map_err(|err| Error::Decode(format!("{} return: {err}", C::SIGNATURE)))
}

/// Encodes `call` and submits it as a transaction against `to`.
pub(crate) fn send_call<T, C>(transport: &T, to: Address, call: C, gas_limit: u64) -> Result<TxHash>
where
    T: EvmTransport + ?Sized,
    C: SolCall,
{
    let calldata = call.abi_encode();
    let evm_call =
        EvmCall::new(to, Bytes::from(calldata), U256::ZERO).with_gas_limit(gas_limit);
    transport.send(evm_call).map(Into::into)
}
