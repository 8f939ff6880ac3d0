//! Employee roster models.

use std::collections::BTreeMap;

use helpdesk_core::metrics;
use helpdesk_core::roles::Permission;
use helpdesk_core::routing::Assignable;
use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `employees` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Employee {
    pub id: DbId,
    pub full_name: String,
    pub department: String,
    #[sqlx(try_from = "String")]
    pub permissions: Permission,
    pub created_at: Timestamp,
}

/// An employee together with their number of open assigned tickets.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EmployeeWithLoad {
    pub id: DbId,
    pub full_name: String,
    pub department: String,
    #[sqlx(try_from = "String")]
    pub permissions: Permission,
    pub unresolved_tickets: i64,
}

impl Assignable for EmployeeWithLoad {
    fn department(&self) -> &str {
        &self.department
    }

    fn unresolved_tickets(&self) -> i64 {
        self.unresolved_tickets
    }
}

/// Counts over the tickets assigned to one employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct TicketTotals {
    pub assigned: i64,
    pub resolved: i64,
    pub open: i64,
}

/// Counts over the articles one employee wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct ArticleTotals {
    pub created: i64,
    pub published: i64,
    pub views: i64,
}

/// One bucket of a grouped count.
#[derive(Debug, Clone, FromRow)]
pub struct KeyCount {
    pub key: String,
    pub count: i64,
}

/// Workload and output figures for one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeMetrics {
    pub employee_id: DbId,
    pub full_name: String,
    pub department: String,
    pub total_tickets_assigned: i64,
    pub total_tickets_resolved: i64,
    pub current_open_tickets: i64,
    pub tickets_by_priority: BTreeMap<String, i64>,
    pub tickets_by_category: BTreeMap<String, i64>,
    /// Non-system messages the employee posted.
    pub total_messages_sent: i64,
    pub avg_messages_per_ticket: f64,
    pub total_articles_created: i64,
    /// Articles currently approved.
    pub total_articles_published: i64,
    /// Percentage of created articles that are published.
    pub article_approval_rate: f64,
    pub total_article_views: i64,
    pub articles_by_category: BTreeMap<String, i64>,
}

/// Raw counts a store gathers; [`EmployeeMetrics::from_counts`] derives the rates.
#[derive(Debug, Clone, Default)]
pub struct MetricCounts {
    pub tickets: TicketTotals,
    pub tickets_by_priority: BTreeMap<String, i64>,
    pub tickets_by_category: BTreeMap<String, i64>,
    pub messages_sent: i64,
    pub articles: ArticleTotals,
    pub articles_by_category: BTreeMap<String, i64>,
}

impl EmployeeMetrics {
    pub fn from_counts(employee: &Employee, counts: MetricCounts) -> Self {
        Self {
            employee_id: employee.id,
            full_name: employee.full_name.clone(),
            department: employee.department.clone(),
            total_tickets_assigned: counts.tickets.assigned,
            total_tickets_resolved: counts.tickets.resolved,
            current_open_tickets: counts.tickets.open,
            tickets_by_priority: counts.tickets_by_priority,
            tickets_by_category: counts.tickets_by_category,
            total_messages_sent: counts.messages_sent,
            avg_messages_per_ticket: metrics::per_ticket(counts.messages_sent, counts.tickets.assigned),
            total_articles_created: counts.articles.created,
            total_articles_published: counts.articles.published,
            article_approval_rate: metrics::approval_rate(
                counts.articles.published,
                counts.articles.created,
            ),
            total_article_views: counts.articles.views,
            articles_by_category: counts.articles_by_category,
        }
    }
}

/// Collect grouped counts into a map keyed by the group value.
pub fn into_buckets(rows: Vec<KeyCount>) -> BTreeMap<String, i64> {
    rows.into_iter().map(|row| (row.key, row.count)).collect()
}
