use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    Release,
    Withdraw,
    Lock,
    Add,
}

impl LedgerEntryType {
    pub fn is_credit(&self) -> bool {
        matches!(self, LedgerEntryType::Release | LedgerEntryType::Add)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ledger_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Success,
    Pending,
    Failed,
}

/// One row of the append-only `transactions` table.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub status: LedgerStatus,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerFilter {
    #[default]
    All,
    Income,
    Outcome,
    Escrow,
}

impl LedgerFilter {
    pub fn from_label(label: &str) -> Option<LedgerFilter> {
        match label.trim().to_ascii_lowercase().as_str() {
            "all" => Some(LedgerFilter::All),
            "income" => Some(LedgerFilter::Income),
            "outcome" => Some(LedgerFilter::Outcome),
            "escrow" => Some(LedgerFilter::Escrow),
            _ => None,
        }
    }

    pub fn matches(&self, entry_type: LedgerEntryType) -> bool {
        match self {
            LedgerFilter::All => true,
            LedgerFilter::Income => entry_type.is_credit(),
            LedgerFilter::Outcome => entry_type == LedgerEntryType::Withdraw,
            LedgerFilter::Escrow => entry_type == LedgerEntryType::Lock,
        }
    }

    pub fn apply(&self, entries: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry.entry_type))
            .collect()
    }
}

/// Sum of successful `lock` entries.
pub fn locked_balance(entries: &[LedgerEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.entry_type == LedgerEntryType::Lock && e.status == LedgerStatus::Success)
        .map(|e| e.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entry_type: LedgerEntryType, amount: i64, status: LedgerStatus) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: None,
            entry_type,
            amount,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_filters() {
        let entries = vec![
            entry(LedgerEntryType::Release, 500, LedgerStatus::Success),
            entry(LedgerEntryType::Add, 100, LedgerStatus::Success),
            entry(LedgerEntryType::Withdraw, 500, LedgerStatus::Success),
            entry(LedgerEntryType::Lock, 200, LedgerStatus::Success),
        ];

        assert_eq!(LedgerFilter::All.apply(entries.clone()).len(), 4);
        assert_eq!(LedgerFilter::Income.apply(entries.clone()).len(), 2);

        let outcome = LedgerFilter::Outcome.apply(entries.clone());
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome[0].entry_type, LedgerEntryType::Withdraw);

        let escrow = LedgerFilter::Escrow.apply(entries);
        assert_eq!(escrow.len(), 1);
        assert_eq!(escrow[0].entry_type, LedgerEntryType::Lock);
    }

    #[test]
    fn test_locked_balance_counts_successful_locks_only() {
        let entries = vec![
            entry(LedgerEntryType::Lock, 200, LedgerStatus::Success),
            entry(LedgerEntryType::Lock, 300, LedgerStatus::Pending),
            entry(LedgerEntryType::Lock, 50, LedgerStatus::Success),
            entry(LedgerEntryType::Release, 999, LedgerStatus::Success),
        ];
        assert_eq!(locked_balance(&entries), 250);
    }

    #[test]
    fn test_wire_shape() {
        let withdraw = entry(LedgerEntryType::Withdraw, 500, LedgerStatus::Success);

        let value = serde_json::to_value(&withdraw).unwrap();
        assert_eq!(value["type"], "withdraw");
        assert_eq!(value["status"], "success");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_filter_labels() {
        assert_eq!(LedgerFilter::from_label("Income"), Some(LedgerFilter::Income));
        assert_eq!(LedgerFilter::from_label("escrow"), Some(LedgerFilter::Escrow));
        assert_eq!(LedgerFilter::from_label("refunds"), None);
    }
}
