//! Relayer wallet.
//!
//! # Security
//! - Keys come from the configuration secrets, which are loaded from the
//!   environment only
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use crate::chain::types::{ChainError, ChainResult};
use crate::config::Secrets;

/// Signing wallet used to relay transactions.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    pub fn from_private_key(private_key_hex: &str) -> ChainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        Ok(Self::from_signer(signer))
    }

    /// Derive the first account (`m/44'/60'/0'/0/0`) of a BIP-39 phrase.
    pub fn from_mnemonic(phrase: &str) -> ChainResult<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(0)
            .and_then(|b| b.build())
            .map_err(|e| ChainError::Wallet(format!("Invalid mnemonic: {}", e)))?;

        Ok(Self::from_signer(signer))
    }

    /// Wallet from the configured secrets. The private key wins when both are
    /// set; neither set gives `None`.
    pub fn from_secrets(secrets: &Secrets) -> ChainResult<Option<Self>> {
        if let Some(key) = &secrets.private_key {
            return Self::from_private_key(key).map(Some);
        }
        if let Some(phrase) = &secrets.mnemonic {
            return Self::from_mnemonic(phrase).map(Some);
        }
        Ok(None)
    }

    fn from_signer(signer: PrivateKeySigner) -> Self {
        tracing::info!(address = %signer.address(), "Wallet initialized");
        Self { signer }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Network wallet for provider signing.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}
