//! Solidity bindings for the contracts this service reads from and writes to.

use alloy::sol;

sol! {
    /// Staking position NFT.
    interface STokens {
        event Minted(uint256 tokenId, address owner, address property, uint256 amount, uint256 price);
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function tokenURI(uint256 tokenId) external view returns (string memory);
        function ownerOf(uint256 tokenId) external view returns (address);
    }
}

sol! {
    /// Swap-and-stake agent.
    #[derive(Debug)]
    interface SwapAndStake {
        struct Amounts {
            address token;
            uint256 input;
            uint256 fee;
        }

        function mintFor(
            address to,
            address property,
            bytes32 payload,
            address gatewayAddress,
            Amounts amounts
        ) external payable;
    }
}
