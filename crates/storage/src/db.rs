use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{
    AllocationRecord, CategorizationFeedback, CategoryKey, CategorySelection, Expense, ExpenseFilter,
    ExpenseId, FeedbackSignal, PropertyId, StoreError,
};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// A private in-memory database. The pool holds a single connection so
/// every query sees the same database.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            property_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            description TEXT NOT NULL,
            merchant_name TEXT,
            category_id TEXT NOT NULL,
            subcategory_id TEXT,
            category_confidence REAL,
            is_auto_suggested INTEGER NOT NULL DEFAULT 0,
            receipt_photos TEXT NOT NULL DEFAULT '[]',
            expense_date TEXT NOT NULL,
            is_tax_deductible INTEGER NOT NULL DEFAULT 0,
            property_allocation TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_expenses_property_date ON expenses (property_id, expense_date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categorization_feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id TEXT NOT NULL,
            text TEXT NOT NULL,
            top_category_id TEXT,
            top_subcategory_id TEXT,
            top_confidence REAL,
            chosen_category_id TEXT NOT NULL,
            chosen_subcategory_id TEXT,
            signal TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn malformed(id: &str, reason: impl ToString) -> StoreError {
    StoreError::Malformed { id: id.to_string(), reason: reason.to_string() }
}

/// Insert or replace an expense by id.
pub async fn insert_expense(pool: &DbPool, expense: &Expense) -> Result<(), StoreError> {
    let photos = serde_json::to_string(&expense.receipt_photos).map_err(|e| malformed(&expense.id.0, e))?;
    let allocation = expense
        .property_allocation
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| malformed(&expense.id.0, e))?;

    sqlx::query(
        "INSERT OR REPLACE INTO expenses (id, property_id, amount_cents, description, merchant_name, category_id, subcategory_id, category_confidence, is_auto_suggested, receipt_photos, expense_date, is_tax_deductible, property_allocation) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&expense.id.0)
    .bind(&expense.property_id.0)
    .bind(expense.amount_cents)
    .bind(&expense.description)
    .bind(&expense.merchant_name)
    .bind(&expense.category.category_id)
    .bind(&expense.category.subcategory_id)
    .bind(expense.category.confidence.map(f64::from))
    .bind(expense.category.is_auto_suggested)
    .bind(photos)
    .bind(expense.expense_date)
    .bind(expense.is_tax_deductible)
    .bind(allocation)
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}

type ExpenseRow = (
    String,
    String,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<f64>,
    bool,
    String,
    NaiveDate,
    bool,
    Option<String>,
);

const EXPENSE_COLUMNS: &str = "id, property_id, amount_cents, description, merchant_name, category_id, subcategory_id, category_confidence, is_auto_suggested, receipt_photos, expense_date, is_tax_deductible, property_allocation";

fn row_to_expense(r: ExpenseRow) -> Result<Expense, StoreError> {
    let receipt_photos: Vec<String> = serde_json::from_str(&r.9).map_err(|e| malformed(&r.0, e))?;
    let property_allocation: Option<AllocationRecord> = r
        .12
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| malformed(&r.0, e))?;

    Ok(Expense {
        id: ExpenseId(r.0),
        property_id: PropertyId(r.1),
        amount_cents: r.2,
        description: r.3,
        merchant_name: r.4,
        category: CategorySelection {
            category_id: r.5,
            subcategory_id: r.6,
            confidence: r.7.map(|c| c as f32),
            is_auto_suggested: r.8,
        },
        receipt_photos,
        expense_date: r.10,
        is_tax_deductible: r.11,
        property_allocation,
    })
}

pub async fn get_expenses(pool: &DbPool, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
    let sql = format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses \
         WHERE (?1 IS NULL OR property_id = ?1) \
           AND (?2 IS NULL OR expense_date >= ?2) \
           AND (?3 IS NULL OR expense_date <= ?3) \
           AND (?4 IS NULL OR category_id = ?4) \
           AND (?5 = 0 OR is_auto_suggested = 0) \
         ORDER BY expense_date, id"
    );
    let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
        .bind(filter.property_id.as_ref().map(|p| p.0.as_str()))
        .bind(filter.date_range.map(|r| r.start))
        .bind(filter.date_range.map(|r| r.end))
        .bind(filter.category_id.as_deref())
        .bind(filter.manual_only)
        .fetch_all(pool)
        .await
        .map_err(backend)?;

    rows.into_iter().map(row_to_expense).collect()
}

pub async fn get_expense(pool: &DbPool, id: &ExpenseId) -> Result<Option<Expense>, StoreError> {
    let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?");
    let row = sqlx::query_as::<_, ExpenseRow>(&sql)
        .bind(&id.0)
        .fetch_optional(pool)
        .await
        .map_err(backend)?;

    row.map(row_to_expense).transpose()
}

pub async fn insert_feedback(pool: &DbPool, feedback: &CategorizationFeedback) -> Result<(), StoreError> {
    let top = feedback.top_suggestion.as_ref();
    sqlx::query(
        "INSERT INTO categorization_feedback (property_id, text, top_category_id, top_subcategory_id, top_confidence, chosen_category_id, chosen_subcategory_id, signal, recorded_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&feedback.property_id.0)
    .bind(&feedback.text)
    .bind(top.map(|k| k.category_id.as_str()))
    .bind(top.and_then(|k| k.subcategory_id.as_deref()))
    .bind(feedback.top_confidence.map(f64::from))
    .bind(&feedback.chosen.category_id)
    .bind(&feedback.chosen.subcategory_id)
    .bind(feedback.signal.to_string())
    .bind(feedback.recorded_at)
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}

type FeedbackRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<f64>,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
);

/// Feedback recorded for a property, oldest first.
pub async fn get_feedback(pool: &DbPool, property_id: &PropertyId) -> Result<Vec<CategorizationFeedback>, StoreError> {
    let rows = sqlx::query_as::<_, FeedbackRow>(
        "SELECT property_id, text, top_category_id, top_subcategory_id, top_confidence, chosen_category_id, chosen_subcategory_id, signal, recorded_at FROM categorization_feedback WHERE property_id = ? ORDER BY id"
    )
    .bind(&property_id.0)
    .fetch_all(pool)
    .await
    .map_err(backend)?;

    rows.into_iter()
        .map(|r| {
            let signal = match r.7.as_str() {
                "accepted" => FeedbackSignal::Accepted,
                "rejected" => FeedbackSignal::Rejected,
                "no_suggestion" => FeedbackSignal::NoSuggestion,
                other => return Err(malformed(&r.0, format!("unknown signal '{other}'"))),
            };
            Ok(CategorizationFeedback {
                property_id: PropertyId(r.0),
                text: r.1,
                top_suggestion: r.2.map(|category_id| CategoryKey { category_id, subcategory_id: r.3 }),
                top_confidence: r.4.map(|c| c as f32),
                chosen: CategoryKey { category_id: r.5, subcategory_id: r.6 },
                signal,
                recorded_at: r.8,
            })
        })
        .collect()
}
