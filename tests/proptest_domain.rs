//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that encoding, fee math and balance
//! deltas hold their invariants across random inputs.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, I256, U256};
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use fee_proxy_transfer::domain::balance::{delta, BalanceSnapshot};
use fee_proxy_transfer::domain::pricing::native_cost_units;
use fee_proxy_transfer::domain::{
    BuildError, CallDescriptor, EncodingError, FeePolicy, GasLimitPolicy,
};

fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

fn u256() -> impl Strategy<Value = U256> {
    any::<[u8; 32]>().prop_map(U256::from_be_bytes)
}

/// Decimal in [1, 3] with up to four decimal places.
fn multiplier() -> impl Strategy<Value = Decimal> {
    (10_000i64..=30_000).prop_map(|m| Decimal::new(m, 4))
}

// ── Call Encoder Properties ─────────────────────────────────

proptest! {
    /// The same descriptor always encodes to the same bytes.
    #[test]
    fn encode_is_deterministic(token in address(), to in address(), amount in u256()) {
        let call = CallDescriptor::erc20_transfer(token, to, amount);
        let first = call.encode().unwrap();
        let second = call.clone().encode().unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 68);
        prop_assert_eq!(&first[..4], &[0xa9, 0x05, 0x9c, 0xbb][..]);
    }

    /// Any integer width other than the declared one is rejected.
    #[test]
    fn mismatched_width_rejected(bits in (1usize..32).prop_map(|b| b * 8), amount in any::<u64>()) {
        let call = CallDescriptor::new(
            Address::ZERO,
            "transfer(address,uint256)",
            vec![DynSolValue::Address(Address::ZERO), DynSolValue::Uint(U256::from(amount), bits)],
        );
        let is_mismatch = matches!(call.encode(), Err(EncodingError::ArgumentMismatch { index: 1, .. }));
        prop_assert!(is_mismatch);
    }
}

// ── Fee Policy Properties ───────────────────────────────────

proptest! {
    /// When `max_payment` succeeds it always covers the quoted fee and
    /// never exceeds the cap.
    #[test]
    fn max_payment_covers_fee(
        fee in any::<u128>(),
        buffer in multiplier(),
        cap in 1u128..=u128::MAX,
    ) {
        let policy = FeePolicy::new(buffer, U256::from(cap)).unwrap();
        let fee = U256::from(fee);
        match policy.max_payment(fee) {
            Ok(max_payment) => {
                prop_assert!(max_payment >= fee);
                prop_assert!(max_payment <= U256::from(cap));
            }
            Err(BuildError::InsufficientMaxPayment { max_payment, fee: quoted }) => {
                prop_assert!(max_payment < quoted);
                prop_assert_eq!(max_payment, U256::from(cap));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// Gas limit is never below the floor nor below the raw estimate.
    #[test]
    fn gas_limit_bounds(
        estimate in 0u64..50_000_000,
        floor in 21_000u64..1_000_000,
        mult in multiplier(),
    ) {
        let policy = GasLimitPolicy::new(floor, mult).unwrap();
        let limit = policy.gas_limit(estimate);
        prop_assert!(limit >= floor);
        prop_assert!(limit >= estimate);
    }

    /// Scaling rounds up: a non-zero wei cost never prices as zero and
    /// the result is within one unit of the exact quotient.
    #[test]
    fn native_units_round_up(gas in 1u64..10_000_000, price in 1u128..1_000_000_000_000_000) {
        let units = native_cost_units(gas, price, 12);
        let wei = u128::from(gas) * price;
        prop_assert!(units >= 1);
        prop_assert!(units * 1_000_000_000_000 >= wei);
        prop_assert!((units - 1) * 1_000_000_000_000 < wei);
    }
}

// ── Balance Delta Properties ────────────────────────────────

proptest! {
    /// Deltas are antisymmetric and zero for identical snapshots.
    #[test]
    fn delta_antisymmetric(a in any::<u128>(), b in any::<u128>(), c in any::<u128>(), d in any::<u128>()) {
        let now = Utc::now();
        let first = BalanceSnapshot { native: U256::from(a), fee_token: U256::from(b), taken_at: now };
        let second = BalanceSnapshot { native: U256::from(c), fee_token: U256::from(d), taken_at: now };

        let forward = delta(&first, &second);
        let backward = delta(&second, &first);
        prop_assert_eq!(forward.native, -backward.native);
        prop_assert_eq!(forward.fee_token, -backward.fee_token);

        let same = delta(&first, &first);
        prop_assert_eq!(same.native, I256::ZERO);
        prop_assert_eq!(same.fee_token, I256::ZERO);
    }
}
