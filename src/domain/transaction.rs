//! Fee-proxy request, signed transaction and receipt types.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};

use super::contracts::IFeeProxy;
use super::errors::BuildError;

/// Arguments of `callWithFeePreferences`.
///
/// `max_payment` must cover the quoted fee; the builder refuses to sign
/// otherwise so an under-provisioned request never reaches the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeProxyRequest {
    /// Token the gas is paid in.
    pub paying_asset: Address,
    /// Upper bound on the fee, in fee-token base units.
    pub max_payment: U256,
    /// Contract the inner call is forwarded to.
    pub target: Address,
    /// Calldata of the wrapped call.
    pub inner_payload: Bytes,
}

impl FeeProxyRequest {
    /// Reject zero addresses and empty payloads.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.paying_asset.is_zero() {
            return Err(BuildError::InvalidRequest("paying asset is the zero address".into()));
        }
        if self.target.is_zero() {
            return Err(BuildError::InvalidRequest("target is the zero address".into()));
        }
        if self.inner_payload.is_empty() {
            return Err(BuildError::InvalidRequest("inner payload is empty".into()));
        }
        Ok(())
    }

    /// Calldata for the fee proxy.
    pub fn encode(&self) -> Result<Bytes, BuildError> {
        self.validate()?;

        let max_payment = u128::try_from(self.max_payment)
            .map_err(|_| BuildError::MaxPaymentOverflow(self.max_payment))?;

        let call = IFeeProxy::callWithFeePreferencesCall {
            asset: self.paying_asset,
            maxPayment: max_payment,
            target: self.target,
            input: self.inner_payload.clone(),
        };
        Ok(call.abi_encode().into())
    }
}

/// Output of the signer: network-ready bytes and their hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub tx_hash: TxHash,
    pub raw: Bytes,
}

/// A signed outer transaction. Immutable; identified by `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Bytes,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

/// Mined transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub success: bool,
}

impl Receipt {
    /// Native-asset cost the node reports for this receipt, in wei.
    pub fn native_cost(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn request() -> FeeProxyRequest {
        FeeProxyRequest {
            paying_asset: address!("CCcCCcCC00000C64000000000000000000000000"),
            max_payment: U256::from(2_000_000_000_000_000_000u128),
            target: address!("CCcCCcCC00000C64000000000000000000000000"),
            inner_payload: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]),
        }
    }

    #[test]
    fn test_encode_round_trips_through_abi() {
        let data = request().encode().unwrap();
        assert_eq!(&data[..4], IFeeProxy::callWithFeePreferencesCall::SELECTOR);

        let decoded = IFeeProxy::callWithFeePreferencesCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.maxPayment, 2_000_000_000_000_000_000u128);
        assert_eq!(decoded.input, request().inner_payload);
    }

    #[test]
    fn test_zero_addresses_rejected() {
        let mut req = request();
        req.target = Address::ZERO;
        assert!(matches!(req.encode(), Err(BuildError::InvalidRequest(_))));

        let mut req = request();
        req.paying_asset = Address::ZERO;
        assert!(matches!(req.validate(), Err(BuildError::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let mut req = request();
        req.inner_payload = Bytes::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_max_payment_must_fit_uint128() {
        let mut req = request();
        req.max_payment = U256::from(u128::MAX) + U256::from(1);
        assert_eq!(req.encode(), Err(BuildError::MaxPaymentOverflow(req.max_payment)));
    }

    #[test]
    fn test_receipt_native_cost() {
        let receipt = Receipt {
            tx_hash: TxHash::ZERO,
            block_number: Some(1),
            gas_used: 50_000,
            effective_gas_price: 7_500_000_000_000,
            success: true,
        };
        assert_eq!(receipt.native_cost(), U256::from(375_000_000_000_000_000u128));
    }
}
