use serde::{Deserialize, Serialize};

use crate::{
    models::ledgermodel::{locked_balance, LedgerEntry, LedgerFilter},
    utils::currency::format_inr,
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummaryDto {
    pub available_balance: i64,
    pub locked_balance: i64,
    pub formatted_balance: String,
}

impl WalletSummaryDto {
    pub fn new(wallet_balance: i64, entries: &[LedgerEntry]) -> Self {
        WalletSummaryDto {
            available_balance: wallet_balance,
            locked_balance: locked_balance(entries),
            formatted_balance: format_inr(wallet_balance),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQueryDto {
    pub filter: Option<String>,
}

impl TransactionQueryDto {
    pub fn filter(&self) -> Result<LedgerFilter, String> {
        match self.filter.as_deref() {
            None => Ok(LedgerFilter::All),
            Some(label) => LedgerFilter::from_label(label)
                .ok_or_else(|| format!("Unknown filter: {}", label)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponseDto {
    pub status: String,
    pub transactions: Vec<LedgerEntry>,
    pub results: usize,
}
