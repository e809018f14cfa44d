//! Cash-holding instruments and the counterparty registry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bank account (conto) whose balance feeds the opening liquidity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankAccount {
    pub id: Uuid,
    pub bank_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    /// Can be negative for overdrawn accounts.
    pub current_balance: Decimal,
    #[serde(default = "BankAccount::default_active")]
    pub is_active: bool,
}

impl BankAccount {
    pub fn new(bank_name: impl Into<String>, current_balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            bank_name: bank_name.into(),
            iban: None,
            current_balance,
            is_active: true,
        }
    }

    pub fn default_active() -> bool {
        true
    }
}

/// Opening liquidity: sum of balances over active accounts only.
pub fn opening_balance(accounts: &[BankAccount]) -> Decimal {
    accounts
        .iter()
        .filter(|account| account.is_active)
        .map(|account| account.current_balance)
        .sum()
}

/// Client or supplier referenced by obligations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counterparty {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
}

impl Counterparty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            vat_number: None,
        }
    }
}
