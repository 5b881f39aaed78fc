//! ERC20 contract bindings

use alloy::sol;

sol! {
    /// ERC20 subset needed to describe and move a token balance
    #[sol(rpc)]
    interface IERC20 {
        /// Returns the symbol of the token
        function symbol() external view returns (string memory);

        /// Returns the decimals of the token
        function decimals() external view returns (uint8);

        /// Returns the balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Transfers tokens to a recipient
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
