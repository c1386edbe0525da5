use alloy_consensus::Transaction as _;
use alloy_network::AnyRpcBlock;
use alloy_rpc_types_eth::BlockTransactions;

use crate::models::datasets::blocks::{RawBlock, RawTransaction};
use crate::models::errors::TransportError;

pub trait BlockParser {
    fn parse_block(&self) -> Result<RawBlock, TransportError>;
}

impl BlockParser for AnyRpcBlock {
    fn parse_block(&self) -> Result<RawBlock, TransportError> {
        let inner = &self.header.inner;

        let transactions = match &self.transactions {
            BlockTransactions::Full(transactions) => transactions
                .iter()
                .map(|transaction| RawTransaction {
                    max_priority_fee_per_gas: transaction.max_priority_fee_per_gas(),
                })
                .collect(),
            // An empty block can come back as an empty hash list even when full objects were requested
            BlockTransactions::Hashes(hashes) if hashes.is_empty() => Vec::new(),
            _ => return Err(TransportError::TransactionHashesOnly),
        };

        Ok(RawBlock {
            number: inner.number,
            timestamp: inner.timestamp,
            base_fee_per_gas: inner.base_fee_per_gas,
            gas_used: inner.gas_used,
            gas_limit: inner.gas_limit,
            miner: inner.beneficiary.to_checksum(None),
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn hash(byte: u8) -> String {
        format!("0x{}", format!("{byte:02x}").repeat(32))
    }

    fn eip1559_transaction() -> Value {
        json!({
            "type": "0x2",
            "chainId": "0x1",
            "hash": hash(0x21),
            "blockHash": hash(0x01),
            "blockNumber": "0x64",
            "transactionIndex": "0x0",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "nonce": "0x0",
            "gas": "0x5208",
            "maxFeePerGas": "0x64",
            "maxPriorityFeePerGas": "0x4",
            "value": "0x0",
            "input": "0x",
            "accessList": [],
            "v": "0x0",
            "yParity": "0x0",
            "r": hash(0x0a),
            "s": hash(0x0b)
        })
    }

    fn legacy_transaction() -> Value {
        json!({
            "type": "0x0",
            "chainId": "0x1",
            "hash": hash(0x22),
            "blockHash": hash(0x01),
            "blockNumber": "0x64",
            "transactionIndex": "0x1",
            "from": "0x3333333333333333333333333333333333333333",
            "to": "0x4444444444444444444444444444444444444444",
            "nonce": "0x1",
            "gas": "0x5208",
            "gasPrice": "0x3c",
            "value": "0x0",
            "input": "0x",
            "v": "0x25",
            "r": hash(0x0c),
            "s": hash(0x0d)
        })
    }

    fn block(transactions: Value) -> AnyRpcBlock {
        serde_json::from_value(json!({
            "hash": hash(0x01),
            "parentHash": hash(0x02),
            "sha3Uncles": hash(0x03),
            "miner": "0x95222290dd7278aa3ddd389cc1e1d165cc4bafe5",
            "stateRoot": hash(0x04),
            "transactionsRoot": hash(0x05),
            "receiptsRoot": hash(0x06),
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "difficulty": "0x0",
            "number": "0x64",
            "gasLimit": "0x1312d00",
            "gasUsed": "0x989680",
            "timestamp": "0x6553f100",
            "extraData": "0x",
            "mixHash": hash(0x07),
            "nonce": "0x0000000000000000",
            "baseFeePerGas": "0x32",
            "uncles": [],
            "transactions": transactions
        }))
        .expect("valid block fixture")
    }

    #[test]
    fn test_parse_full_block() {
        let raw = block(json!([eip1559_transaction(), legacy_transaction()]))
            .parse_block()
            .unwrap();

        assert_eq!(raw.number, 100);
        assert_eq!(raw.timestamp, 0x6553f100);
        assert_eq!(raw.base_fee_per_gas, Some(50));
        assert_eq!(raw.gas_used, 10_000_000);
        assert_eq!(raw.gas_limit, 20_000_000);
        assert_eq!(raw.miner, "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5");

        let tips: Vec<Option<u128>> = raw
            .transactions
            .iter()
            .map(|tx| tx.max_priority_fee_per_gas)
            .collect();
        assert_eq!(tips, vec![Some(4), None]);
    }

    #[test]
    fn test_hashes_only_block_is_rejected() {
        let result = block(json!([hash(0x21), hash(0x22)])).parse_block();
        assert_eq!(result, Err(TransportError::TransactionHashesOnly));
    }

    #[test]
    fn test_empty_block_has_no_transactions() {
        let raw = block(json!([])).parse_block().unwrap();
        assert!(raw.transactions.is_empty());
        assert_eq!(raw.number, 100);
    }
}
