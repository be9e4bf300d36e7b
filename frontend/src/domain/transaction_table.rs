//! Transaction table formatting.
//!
//! Turns server transactions into display rows: a human date, a signed
//! amount string and an amount type for styling.

use shared::{AmountType, FormattedTransaction, Transaction};

use crate::services::date_utils::format_display_date;

/// Amount formatting options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountFormat {
    PlusMinusSign,  // "+10.00" / "-5.00"
    ParenthesesNeg, // "10.00" / "(5.00)"
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionTableConfig {
    pub show_currency_symbol: bool,
    pub amount_format: AmountFormat,
}

impl Default for TransactionTableConfig {
    fn default() -> Self {
        Self {
            show_currency_symbol: false,
            amount_format: AmountFormat::PlusMinusSign,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    config: TransactionTableConfig,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TransactionTableConfig) -> Self {
        Self { config }
    }

    pub fn format_transactions(&self, transactions: &[Transaction]) -> Vec<FormattedTransaction> {
        transactions.iter().map(|tx| self.format_transaction(tx)).collect()
    }

    pub fn format_transaction(&self, transaction: &Transaction) -> FormattedTransaction {
        FormattedTransaction {
            id: transaction.id.clone(),
            formatted_date: format_display_date(&transaction.created_at),
            description: transaction.description.clone(),
            formatted_amount: self.format_amount(transaction.amount),
            amount_type: AmountType::of(transaction.amount),
            raw_amount: transaction.amount,
        }
    }

    pub fn format_amount(&self, amount: f64) -> String {
        let value = self.format_money(amount.abs());
        match self.config.amount_format {
            AmountFormat::PlusMinusSign if amount > 0.0 => format!("+{}", value),
            AmountFormat::PlusMinusSign if amount < 0.0 => format!("-{}", value),
            AmountFormat::PlusMinusSign => value,
            AmountFormat::ParenthesesNeg if amount < 0.0 => format!("({})", value),
            AmountFormat::ParenthesesNeg => value,
        }
    }

    /// Plain two-decimal amount, no sign handling
    pub fn format_money(&self, amount: f64) -> String {
        let currency = if self.config.show_currency_symbol { "$" } else { "" };
        format!("{}{:.2}", currency, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_transaction;

    #[test]
    fn test_format_income_row() {
        let table = TransactionTable::new();
        let row = table.format_transaction(&sample_transaction("t1", "Salaire", 1000.0, "2025-03-02T10:05:00"));

        assert_eq!(row.formatted_amount, "+1000.00");
        assert_eq!(row.amount_type, AmountType::Positive);
        assert_eq!(row.formatted_date, "Mar 2, 2025 10:05");
        assert_eq!(row.raw_amount, 1000.0);
    }

    #[test]
    fn test_format_amount_variants() {
        let table = TransactionTable::new();
        assert_eq!(table.format_amount(-5.5), "-5.50");
        assert_eq!(table.format_amount(0.0), "0.00");

        let table = TransactionTable::with_config(TransactionTableConfig {
            show_currency_symbol: true,
            amount_format: AmountFormat::ParenthesesNeg,
        });
        assert_eq!(table.format_amount(-5.5), "($5.50)");
        assert_eq!(table.format_amount(12.0), "$12.00");
    }

    #[test]
    fn test_unreadable_date_is_kept() {
        let rows = TransactionTable::new()
            .format_transactions(&[sample_transaction("t1", "Courses", -3.0, "someday")]);
        assert_eq!(rows[0].formatted_date, "someday");
        assert_eq!(rows[0].amount_type, AmountType::Negative);
    }
}
