//! Built-in sample data used when no data directory has been initialised.

use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};

use crate::category::Category;
use crate::provider::DataProvider;
use crate::task::{Recurrence, Schedule, ScheduledTask, TaskState};
use crate::transaction::{Outcome, TransactionRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedData;

impl SeedData {
    pub fn transactions() -> anyhow::Result<Vec<TransactionRecord>> {
        Ok(vec![
            tx(
                "tx-1",
                at(2025, 5, 10, 14, 32)?,
                Category::GovernanceVote,
                "Voted YES on Nouns Proposal #427",
                None,
                Outcome::Succeeded,
                "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef",
                (0.0034, 0.0012),
                "Nouns DAO Auto-Voting",
            ),
            tx(
                "tx-2",
                at(2025, 5, 9, 8, 15)?,
                Category::TokenSwap,
                "Swapped 1.5 ETH for 2,850 USDC",
                Some("1.5 ETH"),
                Outcome::Succeeded,
                "0xabcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890",
                (0.0046, 0.0022),
                "ETH/USDC Swap",
            ),
            tx(
                "tx-3",
                at(2025, 5, 8, 22, 45)?,
                Category::YieldMove,
                "Moved 5,000 USDC to Compound",
                Some("5,000 USDC"),
                Outcome::Succeeded,
                "0x7890abcdef1234567890abcdef1234567890abcdef1234567890abcdef123456",
                (0.0031, 0.0008),
                "Yield Optimizer",
            ),
            tx(
                "tx-4",
                at(2025, 5, 7, 17, 30)?,
                Category::RewardClaim,
                "Claimed 42 COMP rewards",
                Some("42 COMP"),
                Outcome::Succeeded,
                "0xdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890abc",
                (0.0028, 0.0005),
                "Reward Claimer",
            ),
            tx(
                "tx-5",
                at(2025, 5, 6, 9, 12)?,
                Category::GovernanceVote,
                "Voted NO on Compound Proposal #62",
                None,
                Outcome::Succeeded,
                "0x567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef1234",
                (0.0022, 0.0007),
                "Compound Governance",
            ),
            tx(
                "tx-6",
                at(2025, 5, 5, 14, 25)?,
                Category::TokenSwap,
                "Swapped 500 USDC for 0.25 ETH",
                Some("500 USDC"),
                Outcome::Failed {
                    error: "Slippage exceeded".to_string(),
                },
                "0x90abcdef1234567890abcdef1234567890abcdef1234567890abcdef12345678",
                (0.0014, 0.0),
                "USDC/ETH Swap",
            ),
            tx(
                "tx-7",
                at(2025, 5, 11, 10, 15)?,
                Category::GovernanceVote,
                "Voting on MakerDAO Proposal #325",
                None,
                Outcome::Pending {
                    reason: "Waiting for confirmation".to_string(),
                },
                "0xf5a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2",
                (0.0023, 0.0),
                "MakerDAO Governance",
            ),
            tx(
                "tx-8",
                at(2025, 5, 4, 16, 45)?,
                Category::NftAction,
                "Purchased BAYC #3578",
                Some("85 ETH"),
                Outcome::Failed {
                    error: "Transaction reverted: price increased during execution".to_string(),
                },
                "0x1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b",
                (0.0062, 0.0),
                "NFT Floor Hunter",
            ),
        ])
    }

    pub fn scheduled_tasks() -> anyhow::Result<Vec<ScheduledTask>> {
        Ok(vec![
            task(
                "task-s1",
                "Weekly COMP Claim",
                Category::RewardClaim,
                "Claim COMP rewards every Monday at 10am UTC",
                active(2025, 5, 20, 10, 0)?,
                schedule(Recurrence::Weekly, Some("Monday"), "10:00 AM"),
            ),
            task(
                "task-s2",
                "Monthly Yield Rebalance",
                Category::YieldMove,
                "Rebalance stablecoin positions on first day of each month",
                active(2025, 6, 1, 12, 0)?,
                schedule(Recurrence::Monthly, Some("1"), "12:00 PM"),
            ),
            task(
                "task-s3",
                "Uniswap LP Weekly Claim",
                Category::RewardClaim,
                "Claim UNI LP rewards every Friday at 8pm UTC",
                active(2025, 5, 16, 20, 0)?,
                schedule(Recurrence::Weekly, Some("Friday"), "8:00 PM"),
            ),
            task(
                "task-s4",
                "Bi-weekly ETH DCA",
                Category::TokenSwap,
                "Buy 0.5 ETH with USDC every two weeks",
                active(2025, 5, 21, 15, 0)?,
                schedule(Recurrence::Biweekly, Some("Wednesday"), "3:00 PM"),
            ),
            task(
                "task-s5",
                "Daily Gas Price Check",
                Category::YieldMove,
                "Check gas prices and execute bridging if below threshold",
                TaskState::Paused,
                schedule(Recurrence::Daily, None, "4:00 AM"),
            ),
            task(
                "task-s6",
                "ENS Governance Vote",
                Category::GovernanceVote,
                "Vote on ENS governance proposals",
                active(2025, 5, 14, 18, 0)?,
                schedule(Recurrence::Weekly, Some("Wednesday"), "6:00 PM"),
            ),
            task(
                "task-s7",
                "AAVE Interest Rate Check",
                Category::YieldMove,
                "Monitor AAVE interest rates and move assets if beneficial",
                active(2025, 5, 14, 13, 0)?,
                schedule(Recurrence::Daily, None, "1:00 PM"),
            ),
            task(
                "task-s8",
                "Doodles Floor Monitoring",
                Category::NftAction,
                "Monitor Doodles floor price changes",
                active(2025, 5, 14, 9, 0)?,
                schedule(Recurrence::Daily, None, "9:00 AM"),
            ),
        ])
    }
}

impl DataProvider for SeedData {
    fn list_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>> {
        Self::transactions()
    }

    fn list_scheduled_tasks(&self) -> anyhow::Result<Vec<ScheduledTask>> {
        Self::scheduled_tasks()
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| anyhow!("invalid seed timestamp {year}-{month}-{day} {hour}:{minute}"))
}

fn active(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> anyhow::Result<TaskState> {
    Ok(TaskState::Active {
        next_execution: at(year, month, day, hour, minute)?,
    })
}

fn schedule(recurrence: Recurrence, day: Option<&str>, time: &str) -> Schedule {
    Schedule {
        recurrence,
        day: day.map(str::to_string),
        time: time.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn tx(
    id: &str,
    date: DateTime<Utc>,
    category: Category,
    description: &str,
    amount: Option<&str>,
    outcome: Outcome,
    tx_hash: &str,
    (gas, saved_gas): (f64, f64),
    task: &str,
) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        date,
        category,
        description: description.to_string(),
        amount: amount.map(str::to_string),
        outcome,
        network: "Ethereum".to_string(),
        tx_hash: tx_hash.to_string(),
        gas,
        saved_gas,
        task: task.to_string(),
    }
}

fn task(
    id: &str,
    name: &str,
    category: Category,
    description: &str,
    state: TaskState,
    schedule: Schedule,
) -> ScheduledTask {
    ScheduledTask {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        state,
        schedule,
    }
}
