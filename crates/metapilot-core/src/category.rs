use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Kind of automation a transaction or scheduled task belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "dao-vote", alias = "governance-vote")]
    GovernanceVote,
    #[serde(rename = "swap", alias = "token-swap")]
    TokenSwap,
    #[serde(rename = "yield", alias = "yield-move")]
    YieldMove,
    #[serde(rename = "claim", alias = "reward-claim")]
    RewardClaim,
    #[serde(rename = "nft", alias = "nft-action")]
    NftAction,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::GovernanceVote,
        Category::TokenSwap,
        Category::YieldMove,
        Category::RewardClaim,
        Category::NftAction,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            Category::GovernanceVote => "dao-vote",
            Category::TokenSwap => "swap",
            Category::YieldMove => "yield",
            Category::RewardClaim => "claim",
            Category::NftAction => "nft",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::GovernanceVote => "DAO Voting",
            Category::TokenSwap => "Token Swap",
            Category::YieldMove => "Yield Optimizer",
            Category::RewardClaim => "Rewards Claim",
            Category::NftAction => "NFT Purchase",
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dao-vote" | "governance-vote" | "vote" => Ok(Category::GovernanceVote),
            "swap" | "token-swap" => Ok(Category::TokenSwap),
            "yield" | "yield-move" => Ok(Category::YieldMove),
            "claim" | "reward-claim" => Ok(Category::RewardClaim),
            "nft" | "nft-action" => Ok(Category::NftAction),
            other => Err(anyhow!("unknown category: {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}
