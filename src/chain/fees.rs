//! Fee estimation.

use alloy::network::TransactionBuilder;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;

/// Fee fields for a transaction. EIP-1559 fields win over `gas_price` when
/// both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl FeeData {
    /// Set the fee fields on `tx`.
    pub fn apply(&self, tx: TransactionRequest) -> TransactionRequest {
        match (self.max_fee_per_gas, self.max_priority_fee_per_gas) {
            (Some(max_fee), Some(priority)) => tx
                .with_max_fee_per_gas(max_fee)
                .with_max_priority_fee_per_gas(priority),
            _ => match self.gas_price {
                Some(price) => tx.with_gas_price(price),
                None => tx,
            },
        }
    }
}

/// EIP-1559 estimate, falling back to the legacy gas price on chains that do
/// not support it.
pub async fn fee_data(provider: &(dyn Provider + Send + Sync)) -> Result<FeeData, TransportError> {
    match provider.estimate_eip1559_fees().await {
        Ok(estimate) => Ok(FeeData {
            gas_price: None,
            max_fee_per_gas: Some(estimate.max_fee_per_gas),
            max_priority_fee_per_gas: Some(estimate.max_priority_fee_per_gas),
        }),
        Err(e) => {
            tracing::debug!(error = %e, "EIP-1559 estimate unavailable, using gas price");
            let price = provider.get_gas_price().await?;
            Ok(FeeData {
                gas_price: Some(price),
                ..FeeData::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_eip1559() {
        let fees = FeeData {
            gas_price: Some(1),
            max_fee_per_gas: Some(100),
            max_priority_fee_per_gas: Some(2),
        };
        let tx = fees.apply(TransactionRequest::default());
        assert_eq!(tx.max_fee_per_gas, Some(100));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2));
        assert_eq!(tx.gas_price, None);
    }

    #[test]
    fn test_apply_legacy() {
        let fees = FeeData {
            gas_price: Some(30),
            ..FeeData::default()
        };
        let tx = fees.apply(TransactionRequest::default());
        assert_eq!(tx.gas_price, Some(30));
        assert_eq!(tx.max_fee_per_gas, None);
    }

    #[test]
    fn test_apply_nothing() {
        let tx = FeeData::default().apply(TransactionRequest::default());
        assert_eq!(tx, TransactionRequest::default());
    }
}
