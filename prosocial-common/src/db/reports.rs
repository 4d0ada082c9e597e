//! Reporting aggregations
//!
//! Thin grouping/summing over the expense and lead tables, shaped for
//! dashboard display.

use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Paid/pending totals for one month of a year
#[derive(Debug, Clone, Serialize)]
pub struct MonthTotal {
    pub month: u32,
    pub paid_cents: i64,
    pub pending_cents: i64,
}

/// Paid/pending totals for one expense category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub paid_cents: i64,
    pub pending_cents: i64,
}

/// Expense totals for a calendar year
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseReport {
    pub year: i32,
    pub months: Vec<MonthTotal>,
    pub categories: Vec<CategoryTotal>,
    pub total_paid_cents: i64,
    pub total_pending_cents: i64,
}

/// Lead count for one stage of the funnel
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FunnelStage {
    pub stage_id: String,
    pub name: String,
    pub color: String,
    pub position: i64,
    pub lead_count: i64,
}

/// An agent's lead intake this month against their goal
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AgentProgress {
    pub agent_id: String,
    pub name: String,
    pub monthly_lead_goal: i64,
    pub leads_this_month: i64,
}

/// Funnel report: per-stage counts plus agent goal progress
#[derive(Debug, Clone, Serialize)]
pub struct FunnelReport {
    pub pipeline_type: String,
    pub stages: Vec<FunnelStage>,
    pub agents: Vec<AgentProgress>,
}

/// Sum expenses of a year by month and by category
///
/// Expenses without a due date fall into the month they were created.
pub async fn expense_summary(
    pool: &SqlitePool,
    studio_id: &str,
    year: i32,
) -> Result<ExpenseReport> {
    let year_str = format!("{:04}", year);

    let month_rows: Vec<(i64, String, i64)> = sqlx::query_as(
        r#"
        SELECT CAST(strftime('%m', COALESCE(due_date, date(created_at))) AS INTEGER) AS month,
               status,
               SUM(amount_cents) AS total
        FROM expenses
        WHERE studio_id = ?
          AND strftime('%Y', COALESCE(due_date, date(created_at))) = ?
        GROUP BY month, status
        ORDER BY month ASC
        "#,
    )
    .bind(studio_id)
    .bind(&year_str)
    .fetch_all(pool)
    .await?;

    let mut months: Vec<MonthTotal> = (1..=12)
        .map(|month| MonthTotal {
            month,
            paid_cents: 0,
            pending_cents: 0,
        })
        .collect();

    for (month, status, total) in &month_rows {
        let index = (*month as usize).saturating_sub(1);
        if let Some(entry) = months.get_mut(index) {
            match status.as_str() {
                "paid" => entry.paid_cents += total,
                _ => entry.pending_cents += total,
            }
        }
    }

    let category_rows: Vec<(Option<String>, String, i64)> = sqlx::query_as(
        r#"
        SELECT category, status, SUM(amount_cents) AS total
        FROM expenses
        WHERE studio_id = ?
          AND strftime('%Y', COALESCE(due_date, date(created_at))) = ?
        GROUP BY category, status
        "#,
    )
    .bind(studio_id)
    .bind(&year_str)
    .fetch_all(pool)
    .await?;

    let mut by_category: std::collections::BTreeMap<String, CategoryTotal> =
        std::collections::BTreeMap::new();
    for (category, status, total) in category_rows {
        let name = category.unwrap_or_else(|| "uncategorized".to_string());
        let entry = by_category
            .entry(name.clone())
            .or_insert_with(|| CategoryTotal {
                category: name,
                paid_cents: 0,
                pending_cents: 0,
            });
        match status.as_str() {
            "paid" => entry.paid_cents += total,
            _ => entry.pending_cents += total,
        }
    }
    let categories: Vec<CategoryTotal> = by_category.into_values().collect();

    let total_paid_cents = months.iter().map(|m| m.paid_cents).sum();
    let total_pending_cents = months.iter().map(|m| m.pending_cents).sum();

    Ok(ExpenseReport {
        year,
        months,
        categories,
        total_paid_cents,
        total_pending_cents,
    })
}

/// Lead counts per stage in display order, plus agent goal progress
pub async fn funnel(
    pool: &SqlitePool,
    studio_id: &str,
    pipeline_type: &str,
) -> Result<FunnelReport> {
    let stages = sqlx::query_as::<_, FunnelStage>(
        r#"
        SELECT ps.guid AS stage_id, ps.name, ps.color, ps.position,
               COUNT(l.guid) AS lead_count
        FROM pipeline_stages ps
        LEFT JOIN leads l ON l.stage_id = ps.guid
        WHERE ps.studio_id = ? AND ps.pipeline_type = ? AND ps.active = 1
        GROUP BY ps.guid
        ORDER BY ps.position ASC
        "#,
    )
    .bind(studio_id)
    .bind(pipeline_type)
    .fetch_all(pool)
    .await?;

    let agents = sqlx::query_as::<_, AgentProgress>(
        r#"
        SELECT a.guid AS agent_id, a.name, a.monthly_lead_goal,
               (SELECT COUNT(*) FROM leads l
                WHERE l.agent_id = a.guid
                  AND strftime('%Y-%m', l.created_at) = strftime('%Y-%m', 'now')
               ) AS leads_this_month
        FROM agents a
        WHERE a.studio_id = ? AND a.active = 1
        ORDER BY a.name ASC
        "#,
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    Ok(FunnelReport {
        pipeline_type: pipeline_type.to_string(),
        stages,
        agents,
    })
}
