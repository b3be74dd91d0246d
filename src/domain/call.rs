//! Call descriptors and calldata encoding.
//!
//! A `CallDescriptor` names a target contract, a human-readable method
//! signature (`transfer(address,uint256)`) and the typed arguments.
//! Arguments are checked against the declared parameter types before
//! anything is encoded, so a `uint128` passed where `uint256` is
//! declared fails instead of being silently widened.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes, U256};

use super::errors::EncodingError;

/// Immutable description of one contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    target: Address,
    signature: String,
    args: Vec<DynSolValue>,
}

impl CallDescriptor {
    pub fn new(target: Address, signature: impl Into<String>, args: Vec<DynSolValue>) -> Self {
        Self {
            target,
            signature: signature.into(),
            args,
        }
    }

    /// ERC-20 `transfer(recipient, amount)` on `token`.
    pub fn erc20_transfer(token: Address, recipient: Address, amount: U256) -> Self {
        Self::new(
            token,
            "transfer(address,uint256)",
            vec![
                DynSolValue::Address(recipient),
                DynSolValue::Uint(amount, 256),
            ],
        )
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn args(&self) -> &[DynSolValue] {
        &self.args
    }

    /// Amount of `token` this call moves out of the sender: the ERC-20
    /// `transfer` amount when the call is one on `token`, zero otherwise.
    pub fn outflow_of(&self, token: Address) -> U256 {
        if self.target != token || self.signature != "transfer(address,uint256)" {
            return U256::ZERO;
        }
        match self.args.get(1) {
            Some(DynSolValue::Uint(amount, 256)) => *amount,
            _ => U256::ZERO,
        }
    }

    /// Selector-prefixed calldata for this call.
    pub fn encode(&self) -> Result<Bytes, EncodingError> {
        encode(self)
    }
}

/// Encode a call descriptor into calldata.
///
/// Pure: the same descriptor always yields the same bytes.
pub fn encode(descriptor: &CallDescriptor) -> Result<Bytes, EncodingError> {
    let function = Function::parse(&descriptor.signature).map_err(|e| {
        EncodingError::InvalidSignature {
            signature: descriptor.signature.clone(),
            reason: e.to_string(),
        }
    })?;

    if function.inputs.len() != descriptor.args.len() {
        return Err(EncodingError::ArgumentCount {
            method: function.name.clone(),
            expected: function.inputs.len(),
            actual: descriptor.args.len(),
        });
    }

    for (index, (param, value)) in function.inputs.iter().zip(&descriptor.args).enumerate() {
        let ty = param.resolve().map_err(|e| EncodingError::UnsupportedType {
            method: function.name.clone(),
            reason: e.to_string(),
        })?;

        if !ty.matches(value) {
            return Err(EncodingError::ArgumentMismatch {
                method: function.name.clone(),
                index,
                expected: ty.sol_type_name().into_owned(),
            });
        }
    }

    function
        .abi_encode_input(&descriptor.args)
        .map(Bytes::from)
        .map_err(|e| EncodingError::UnsupportedType {
            method: function.name.clone(),
            reason: e.to_string(),
        })
}
