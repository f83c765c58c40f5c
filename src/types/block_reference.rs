//! Block references and execution wait levels for RPC queries.

use serde::{Deserialize, Serialize};

use super::CryptoHash;

/// Reference to the block a query runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockReference {
    /// Latest block at the given finality.
    Finality(Finality),
    /// A specific block height.
    Height(u64),
    /// A specific block hash.
    Hash(CryptoHash),
}

impl Default for BlockReference {
    fn default() -> Self {
        Self::Finality(Finality::Final)
    }
}

impl BlockReference {
    pub fn final_() -> Self {
        Self::Finality(Finality::Final)
    }

    pub fn optimistic() -> Self {
        Self::Finality(Finality::Optimistic)
    }

    pub fn at_height(height: u64) -> Self {
        Self::Height(height)
    }

    pub fn at_hash(hash: CryptoHash) -> Self {
        Self::Hash(hash)
    }

    /// JSON fragment merged into query request params.
    pub fn to_rpc_params(&self) -> serde_json::Value {
        match self {
            BlockReference::Finality(f) => serde_json::json!({ "finality": f.as_str() }),
            BlockReference::Height(h) => serde_json::json!({ "block_id": *h }),
            BlockReference::Hash(h) => serde_json::json!({ "block_id": h.to_string() }),
        }
    }
}

impl From<Finality> for BlockReference {
    fn from(f: Finality) -> Self {
        Self::Finality(f)
    }
}

impl From<u64> for BlockReference {
    fn from(height: u64) -> Self {
        Self::Height(height)
    }
}

impl From<CryptoHash> for BlockReference {
    fn from(hash: CryptoHash) -> Self {
        Self::Hash(hash)
    }
}

/// Finality level for read queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    /// Latest block; may still be reorged.
    Optimistic,
    /// Doomslug finality.
    #[serde(rename = "near-final")]
    NearFinal,
    /// Fully finalized.
    #[default]
    Final,
}

impl Finality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finality::Optimistic => "optimistic",
            Finality::NearFinal => "near-final",
            Finality::Final => "final",
        }
    }
}

/// The level `send_tx` waits for before returning (its `wait_until`
/// parameter). Ordering: `None < Included < IncludedFinal <
/// ExecutedOptimistic < Executed < Final`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxExecutionStatus {
    /// Return as soon as the node accepts the transaction.
    None,
    /// Wait for inclusion in a block.
    Included,
    /// Wait for inclusion in a finalized block.
    IncludedFinal,
    /// Wait for execution on the optimistic chain.
    #[default]
    ExecutedOptimistic,
    /// Wait for execution plus block finality.
    Executed,
    /// Wait until the last non-refund receipt's block is final.
    Final,
}

impl TxExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Included => "INCLUDED",
            Self::IncludedFinal => "INCLUDED_FINAL",
            Self::ExecutedOptimistic => "EXECUTED_OPTIMISTIC",
            Self::Executed => "EXECUTED",
            Self::Final => "FINAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_params() {
        assert_eq!(BlockReference::final_().to_rpc_params()["finality"], "final");
        assert_eq!(BlockReference::Height(42).to_rpc_params()["block_id"], 42);
        let hash = CryptoHash::hash(b"block");
        assert_eq!(
            BlockReference::Hash(hash).to_rpc_params()["block_id"],
            hash.to_string()
        );
    }

    #[test]
    fn wait_until_strings() {
        assert_eq!(TxExecutionStatus::None.as_str(), "NONE");
        assert_eq!(
            TxExecutionStatus::ExecutedOptimistic.as_str(),
            "EXECUTED_OPTIMISTIC"
        );
        assert_eq!(TxExecutionStatus::IncludedFinal.as_str(), "INCLUDED_FINAL");
        assert_eq!(TxExecutionStatus::Final.as_str(), "FINAL");
    }

    #[test]
    fn wait_until_ordering() {
        assert!(TxExecutionStatus::None < TxExecutionStatus::Included);
        assert!(TxExecutionStatus::IncludedFinal < TxExecutionStatus::ExecutedOptimistic);
        assert!(TxExecutionStatus::Executed < TxExecutionStatus::Final);
    }

    #[test]
    fn finality_serde() {
        assert_eq!(
            serde_json::to_value(Finality::NearFinal).unwrap(),
            "near-final"
        );
        assert_eq!(serde_json::to_value(Finality::Final).unwrap(), "final");
    }
}
