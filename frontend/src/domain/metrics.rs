//! Derived budget metrics.
//!
//! Everything here is a pure function of the current store snapshots and the
//! caller's clock. Nothing is cached, so a summary is always consistent with
//! the snapshots it was computed from.

use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use shared::{BudgetStatus, Transaction};

use super::category_matching::{CategoryMatcher, SubstringMatcher};
use crate::services::date_utils::parse_timestamp;
use crate::stores::PlanItem;
use crate::sync::PlanItemId;

/// Balance, income and expense over every transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub balance: f64,
    pub income: f64,
    /// Sum of negative amounts, kept negative
    pub expense: f64,
    /// `|expense| / income` as a percentage, capped at 100; 0 without income
    pub expense_ratio: f64,
}

/// Planned vs real spend for one plan row
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpend {
    pub id: PlanItemId,
    pub category: String,
    pub planned: f64,
    pub real: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub totals: Totals,
    pub total_planned: f64,
    pub monthly_real_spend: f64,
    /// `total_planned - monthly_real_spend`
    pub remaining_or_over: f64,
    pub status: BudgetStatus,
    pub categories: Vec<CategorySpend>,
    /// Spend per month of year, January first
    pub monthly_series: [f64; 12],
}

pub struct MetricsEngine<M: CategoryMatcher = SubstringMatcher> {
    matcher: M,
}

impl MetricsEngine<SubstringMatcher> {
    pub fn new() -> Self {
        Self {
            matcher: SubstringMatcher,
        }
    }
}

impl Default for MetricsEngine<SubstringMatcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: CategoryMatcher> MetricsEngine<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn summarize(&self, transactions: &[Transaction], plan: &[PlanItem], now: &DateTime<Local>) -> BudgetSummary {
        let totals = self.totals(transactions);
        let total_planned = self.total_planned(plan);
        let monthly_real_spend = self.monthly_real_spend(transactions, now);
        let remaining_or_over = total_planned - monthly_real_spend;

        BudgetSummary {
            totals,
            total_planned,
            monthly_real_spend,
            remaining_or_over,
            status: BudgetStatus::from_remaining(remaining_or_over),
            categories: self.category_breakdown(transactions, plan),
            monthly_series: self.monthly_series(transactions),
        }
    }

    pub fn totals(&self, transactions: &[Transaction]) -> Totals {
        let income: f64 = transactions
            .iter()
            .filter(|t| t.is_income())
            .map(|t| t.amount)
            .sum();
        let expense: f64 = transactions
            .iter()
            .filter(|t| t.is_expense())
            .map(|t| t.amount)
            .sum();

        let expense_ratio = if income > 0.0 {
            (expense.abs() / income * 100.0).min(100.0)
        } else {
            0.0
        };

        Totals {
            // Zero amounts add nothing, so this is the sum over every transaction
            balance: income + expense,
            income,
            expense,
            expense_ratio,
        }
    }

    pub fn total_planned(&self, plan: &[PlanItem]) -> f64 {
        plan.iter().map(|item| item.amount).sum()
    }

    /// Spend in the calendar month (and year) containing `now`.
    /// Transactions whose timestamp cannot be read are left out.
    pub fn monthly_real_spend(&self, transactions: &[Transaction], now: &DateTime<Local>) -> f64 {
        spend(transactions)
            .filter(|(t, _)| {
                parse_timestamp(&t.created_at)
                    .map(|ts| ts.year() == now.year() && ts.month() == now.month())
                    .unwrap_or(false)
            })
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn category_breakdown(&self, transactions: &[Transaction], plan: &[PlanItem]) -> Vec<CategorySpend> {
        plan.iter()
            .map(|item| {
                let real: f64 = spend(transactions)
                    .filter(|(t, _)| self.matcher.matches(&item.category, &t.description))
                    .map(|(_, amount)| amount)
                    .sum();
                CategorySpend {
                    id: item.id.clone(),
                    category: item.category.clone(),
                    planned: item.amount,
                    real,
                    remaining: item.amount - real,
                }
            })
            .collect()
    }

    /// Twelve buckets by month of year; spend from different years lands in
    /// the same bucket.
    pub fn monthly_series(&self, transactions: &[Transaction]) -> [f64; 12] {
        let mut series = [0.0; 12];
        for (t, amount) in spend(transactions) {
            if let Some(ts) = parse_timestamp(&t.created_at) {
                series[ts.month0() as usize] += amount;
            }
        }
        series
    }
}

/// Expense transactions paired with their absolute amount
fn spend(transactions: &[Transaction]) -> impl Iterator<Item = (&Transaction, f64)> {
    transactions
        .iter()
        .filter(|t| t.is_expense())
        .map(|t| (t, t.amount.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category_matching::ExactMatcher;
    use crate::test_utils::sample_transaction;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).single().unwrap()
    }

    fn plan_item(id: &str, category: &str, amount: f64) -> PlanItem {
        PlanItem {
            id: PlanItemId::Permanent(id.to_string()),
            category: category.to_string(),
            amount,
        }
    }

    #[test]
    fn test_within_plan_scenario() {
        let transactions = vec![
            sample_transaction("t1", "Salaire", 1000.0, "2025-03-01T09:00:00"),
            sample_transaction("t2", "Courses", -200.0, "2025-03-02T10:00:00"),
        ];
        let plan = vec![plan_item("p1", "Courses", 300.0)];

        let summary = MetricsEngine::new().summarize(&transactions, &plan, &now());

        assert_eq!(summary.totals.income, 1000.0);
        assert_eq!(summary.totals.expense, -200.0);
        assert_eq!(summary.totals.balance, 800.0);
        assert_eq!(summary.total_planned, 300.0);
        assert_eq!(summary.monthly_real_spend, 200.0);
        assert_eq!(summary.remaining_or_over, 100.0);
        assert!(summary.status.is_within_plan());
        assert_eq!(summary.status.message(), "You are within your plan: $100.00 left");
        assert_eq!(summary.categories[0].real, 200.0);
        assert_eq!(summary.categories[0].remaining, 100.0);
    }

    #[test]
    fn test_over_plan_reports_absolute_overage() {
        let transactions = vec![sample_transaction("t1", "Loyer", -750.0, "2025-03-05T08:00:00")];
        let plan = vec![plan_item("p1", "Loyer", 700.0)];

        let summary = MetricsEngine::new().summarize(&transactions, &plan, &now());

        assert_eq!(summary.remaining_or_over, -50.0);
        assert_eq!(summary.status, BudgetStatus::OverPlan { over: 50.0 });
    }

    #[test]
    fn test_balance_is_income_plus_expense() {
        let amounts = [0.1, -0.2, 0.3, 1e9, -1e-9, 0.0, -33.33, 12.07, -0.7];
        let transactions: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| sample_transaction(&i.to_string(), "x", *a, "2025-03-01T00:00:00"))
            .collect();

        let totals = MetricsEngine::new().totals(&transactions);
        assert_eq!(totals.balance, totals.income + totals.expense);
    }

    #[test]
    fn test_zero_amount_is_neither_income_nor_spend() {
        let transactions = vec![sample_transaction("t1", "Rien", 0.0, "2025-03-01T00:00:00")];
        let engine = MetricsEngine::new();

        let totals = engine.totals(&transactions);
        assert_eq!(totals.income, 0.0);
        assert_eq!(totals.expense, 0.0);
        assert_eq!(engine.monthly_real_spend(&transactions, &now()), 0.0);
    }

    #[test]
    fn test_expense_ratio_is_capped() {
        let engine = MetricsEngine::new();
        let half = vec![
            sample_transaction("t1", "Salaire", 1000.0, "2025-03-01T00:00:00"),
            sample_transaction("t2", "Loyer", -500.0, "2025-03-01T00:00:00"),
        ];
        assert_eq!(engine.totals(&half).expense_ratio, 50.0);

        let over = vec![
            sample_transaction("t1", "Salaire", 100.0, "2025-03-01T00:00:00"),
            sample_transaction("t2", "Loyer", -500.0, "2025-03-01T00:00:00"),
        ];
        assert_eq!(engine.totals(&over).expense_ratio, 100.0);

        let no_income = vec![sample_transaction("t1", "Loyer", -500.0, "2025-03-01T00:00:00")];
        assert_eq!(engine.totals(&no_income).expense_ratio, 0.0);
    }

    #[test]
    fn test_monthly_spend_only_counts_current_month_of_current_year() {
        let transactions = vec![
            sample_transaction("t1", "Courses", -20.0, "2025-03-01T00:30:00"),
            sample_transaction("t2", "Courses", -30.0, "2025-03-31T23:00:00"),
            sample_transaction("t3", "Courses", -40.0, "2025-02-28T23:59:00"),
            sample_transaction("t4", "Courses", -50.0, "2024-03-10T12:00:00"),
            sample_transaction("t5", "Courses", -60.0, "not a date"),
            sample_transaction("t6", "Salaire", 900.0, "2025-03-10T12:00:00"),
        ];

        let spend = MetricsEngine::new().monthly_real_spend(&transactions, &now());
        assert_eq!(spend, 50.0);
    }

    #[test]
    fn test_monthly_series_ignores_year() {
        let transactions = vec![
            sample_transaction("t1", "Courses", -20.0, "2025-03-01T12:00:00"),
            sample_transaction("t2", "Courses", -50.0, "2024-03-10T12:00:00"),
            sample_transaction("t3", "Loyer", -700.0, "2025-01-05T12:00:00"),
            sample_transaction("t4", "Cadeau", 80.0, "2025-12-24T12:00:00"),
        ];

        let series = MetricsEngine::new().monthly_series(&transactions);
        assert_eq!(series[0], 700.0);
        assert_eq!(series[2], 70.0);
        assert_eq!(series[11], 0.0);
        assert_eq!(series.iter().sum::<f64>(), 770.0);
    }

    #[test]
    fn test_breakdown_double_counts_overlapping_labels() {
        let transactions = vec![sample_transaction("t1", "Courses bio", -40.0, "2025-03-01T12:00:00")];
        let plan = vec![plan_item("p1", "Course", 100.0), plan_item("p2", "Courses", 100.0)];

        let breakdown = MetricsEngine::new().category_breakdown(&transactions, &plan);
        assert_eq!(breakdown[0].real, 40.0);
        assert_eq!(breakdown[1].real, 40.0);
    }

    #[test]
    fn test_matcher_can_be_swapped() {
        let transactions = vec![sample_transaction("t1", "Courses bio", -40.0, "2025-03-01T12:00:00")];
        let plan = vec![plan_item("p1", "Courses", 100.0)];

        let breakdown = MetricsEngine::with_matcher(ExactMatcher).category_breakdown(&transactions, &plan);
        assert_eq!(breakdown[0].real, 0.0);
        assert_eq!(breakdown[0].remaining, 100.0);
    }
}
