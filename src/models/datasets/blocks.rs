use serde::{Deserialize, Serialize};

////////////////////////////////////// RPC Data ////////////////////////////////////////

// Per-transaction fields the normalizer needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTransaction {
    pub max_priority_fee_per_gas: Option<u128>, // None for legacy and EIP-2930 transactions
}

// Block as returned by `eth_getBlockByNumber` with full transaction objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    pub number: u64,
    pub timestamp: u64,
    pub base_fee_per_gas: Option<u64>, // None before the London fork
    pub gas_used: u64,
    pub gas_limit: u64,
    pub miner: String,
    pub transactions: Vec<RawTransaction>,
}

/////////////////////////////////// Transformed Data ///////////////////////////////////

/// One normalized block. Field names and order are the on-disk dataset format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub number: u64,
    pub timestamp: u64,
    pub base_fee_per_gas: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub transaction_count: u64,
    pub miner: String,
    pub gas_target: u64,
    pub block_fullness: f64,
    pub avg_priority_fee: u128,
    pub max_priority_fee: u128,
    pub min_priority_fee: u128,
    pub eth_burned: f64,
}
