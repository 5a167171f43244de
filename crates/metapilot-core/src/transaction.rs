use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    #[serde(rename = "success", alias = "succeeded")]
    Succeeded,
    Pending,
    Failed,
}

impl TxStatus {
    pub fn as_key(&self) -> &'static str {
        match self {
            TxStatus::Succeeded => "success",
            TxStatus::Pending => "pending",
            TxStatus::Failed => "failed",
        }
    }
}

impl FromStr for TxStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "ok" => Ok(TxStatus::Succeeded),
            "pending" => Ok(TxStatus::Pending),
            "failed" | "failure" => Ok(TxStatus::Failed),
            other => Err(anyhow!("unknown transaction status: {other}")),
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// How a transaction ended up. The pending reason and the failure message
/// only exist on their own variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    #[serde(rename = "success", alias = "succeeded")]
    Succeeded,
    Pending {
        #[serde(rename = "pendingReason")]
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,

    pub date: DateTime<Utc>,

    #[serde(rename = "type")]
    pub category: Category,

    pub description: String,

    #[serde(default)]
    pub amount: Option<String>,

    #[serde(flatten)]
    pub outcome: Outcome,

    pub network: String,

    pub tx_hash: String,

    pub gas: f64,

    #[serde(default)]
    pub saved_gas: f64,

    pub task: String,
}

impl TransactionRecord {
    pub fn status(&self) -> TxStatus {
        match self.outcome {
            Outcome::Succeeded => TxStatus::Succeeded,
            Outcome::Pending { .. } => TxStatus::Pending,
            Outcome::Failed { .. } => TxStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn pending_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Pending { reason } => Some(reason),
            _ => None,
        }
    }

    /// Share of the unoptimised gas cost that was saved, in percent.
    pub fn savings_percent(&self) -> Option<f64> {
        let baseline = self.gas + self.saved_gas;
        if baseline <= 0.0 {
            return None;
        }
        Some(self.saved_gas / baseline * 100.0)
    }

    pub fn short_hash(&self) -> String {
        let hash = self.tx_hash.as_str();
        if hash.chars().count() <= 14 {
            return hash.to_string();
        }
        let head: String = hash.chars().take(8).collect();
        let tail: String = hash.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
        format!("{head}...{tail}")
    }
}
