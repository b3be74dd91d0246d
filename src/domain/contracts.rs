//! Solidity interfaces the workflow talks to.

use alloy::sol;

sol! {
    /// Fee proxy precompile: collects gas in `asset` (up to `maxPayment`)
    /// and forwards `input` to `target`.
    #[derive(Debug)]
    interface IFeeProxy {
        function callWithFeePreferences(address asset, uint128 maxPayment, address target, bytes input) external;
    }
}

sol! {
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
