use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;

use budget_planner::config::SyncConfig;
use budget_planner::services::date_utils::month_name;
use budget_planner::services::{logging, NotificationLevel};
use budget_planner::stores::{parse_amount_input, PlanEdit};
use budget_planner::sync::PlanItemId;
use budget_planner::{ApiClient, SyncEngine, TransactionKind};

#[derive(Parser)]
#[command(name = "budget-planner")]
#[command(about = "Track transactions and a monthly spending plan against the budget API")]
struct Cli {
    /// Base URL of the budget API (overrides BUDGET_API_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Quiet period before a plan edit is saved (overrides BUDGET_DEBOUNCE_MS)
    #[arg(long)]
    debounce_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Income,
    Expense,
}

impl From<Direction> for TransactionKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Income => TransactionKind::Income,
            Direction::Expense => TransactionKind::Expense,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Balance, plan status and spend per category
    Summary,

    /// List transactions
    List,

    /// Add a transaction
    Add {
        description: String,
        /// Amount; the sign comes from --kind
        amount: String,
        #[arg(long, short, value_enum, default_value = "expense")]
        kind: Direction,
    },

    /// Replace a transaction's description and amount
    Edit {
        id: String,
        description: String,
        amount: String,
        #[arg(long, short, value_enum, default_value = "expense")]
        kind: Direction,
    },

    /// Delete a transaction
    Delete { id: String },

    /// Work with the monthly plan
    #[command(subcommand)]
    Plan(PlanCommands),
}

#[derive(Subcommand)]
enum PlanCommands {
    /// List plan rows
    List,

    /// Add a plan row
    Add {
        #[arg(default_value = "New expense")]
        category: String,
        #[arg(long, short)]
        amount: Option<String>,
    },

    /// Change a plan row's category and/or amount
    Set {
        id: String,
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short)]
        amount: Option<String>,
    },

    /// Remove a plan row
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(logging::DEFAULT_FILTER);
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(millis) = cli.debounce_ms {
        config = config.with_debounce(Duration::from_millis(millis));
    }

    let engine = SyncEngine::connect(config)?;
    engine.start().await;

    let outcome = run(&engine, cli.command).await;

    // Anything still waiting on its debounce timer is saved before exit
    engine.flush_plan().await;
    print_notifications(&engine);
    outcome
}

async fn run(engine: &SyncEngine<ApiClient>, command: Commands) -> Result<()> {
    match command {
        Commands::Summary => print_summary(engine),
        Commands::List => print_transactions(engine),
        Commands::Add {
            description,
            amount,
            kind,
        } => {
            let amount = parse_amount_input(&amount)?;
            engine.add_transaction(&description, amount, kind.into()).await?;
            print_transactions(engine);
        }
        Commands::Edit {
            id,
            description,
            amount,
            kind,
        } => {
            let amount = parse_amount_input(&amount)?;
            engine
                .update_transaction(&id, &description, amount, kind.into())
                .await?;
            print_transactions(engine);
        }
        Commands::Delete { id } => {
            engine.delete_transaction(&id).await?;
            print_transactions(engine);
        }
        Commands::Plan(PlanCommands::List) => print_plan(engine),
        Commands::Plan(PlanCommands::Add { category, amount }) => {
            let id = engine.add_plan_row_with_category(category.clone());
            // A row is only persisted once it has been edited
            let edit = match amount {
                Some(amount) => PlanEdit::Amount(parse_amount_input(&amount)?),
                None => PlanEdit::Category(category),
            };
            engine.edit_plan_field(&id, edit)?;
            engine.flush_plan().await;
            print_plan(engine);
        }
        Commands::Plan(PlanCommands::Set { id, category, amount }) => {
            if category.is_none() && amount.is_none() {
                bail!("Nothing to change: pass --category and/or --amount");
            }
            let id: PlanItemId = id.parse()?;
            if let Some(category) = category {
                engine.edit_plan_field(&id, PlanEdit::Category(category))?;
            }
            if let Some(amount) = amount {
                engine.edit_plan_field(&id, PlanEdit::Amount(parse_amount_input(&amount)?))?;
            }
            engine.flush_plan().await;
            print_plan(engine);
        }
        Commands::Plan(PlanCommands::Remove { id }) => {
            let id: PlanItemId = id.parse()?;
            engine.remove_plan_row(&id).await?;
            print_plan(engine);
        }
    }
    Ok(())
}

fn print_transactions(engine: &SyncEngine<ApiClient>) {
    let rows = engine.formatted_transactions();
    if rows.is_empty() {
        println!("No transactions yet.");
        return;
    }
    for row in rows {
        println!(
            "{:<38} {:<20} {:<30} {:>12}",
            row.id, row.formatted_date, row.description, row.formatted_amount
        );
    }
}

fn print_plan(engine: &SyncEngine<ApiClient>) {
    let items = engine.plan_items();
    if items.is_empty() {
        println!("The monthly plan is empty.");
        return;
    }
    for item in items {
        let state = engine
            .plan_row_state(&item.id)
            .map(|s| format!("{:?}", s))
            .unwrap_or_default();
        println!("{:<38} {:<24} {:>10.2}  {}", item.id, item.category, item.amount, state);
    }
}

fn print_summary(engine: &SyncEngine<ApiClient>) {
    let summary = engine.summary();
    let totals = summary.totals;

    println!("Balance:   {:>10.2}", totals.balance);
    println!("Income:    {:>10.2}", totals.income);
    println!("Expenses:  {:>10.2}  ({:.0}% of income)", totals.expense, totals.expense_ratio);
    println!();
    println!("Planned this month: {:>10.2}", summary.total_planned);
    println!("Spent this month:   {:>10.2}", summary.monthly_real_spend);
    println!("{}", summary.status.message());

    if !summary.categories.is_empty() {
        println!();
        println!("{:<24} {:>10} {:>10} {:>10}", "Category", "Planned", "Real", "Remaining");
        for category in &summary.categories {
            println!(
                "{:<24} {:>10.2} {:>10.2} {:>10.2}",
                category.category, category.planned, category.real, category.remaining
            );
        }
    }

    println!();
    for (month, spent) in summary.monthly_series.iter().enumerate() {
        if *spent > 0.0 {
            println!("{:<10} {:>10.2}", month_name(month as u32 + 1), spent);
        }
    }
}

fn print_notifications(engine: &SyncEngine<ApiClient>) {
    for notification in engine.take_notifications() {
        match notification.level {
            NotificationLevel::Success => println!("✅ {}", notification.message),
            NotificationLevel::Error => eprintln!("❌ {}", notification.message),
        }
    }
}
