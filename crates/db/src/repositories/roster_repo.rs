//! Repositories for the `employees` and `customers` tables.

use helpdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::customer::Customer;
use crate::models::employee::{
    into_buckets, ArticleTotals, Employee, EmployeeWithLoad, KeyCount, MetricCounts, TicketTotals,
};

const EMPLOYEE_COLUMNS: &str = "id, full_name, department, permissions, created_at";

const CUSTOMER_COLUMNS: &str = "id, full_name, email, created_at";

pub struct EmployeeRepo;

impl EmployeeRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Employees with their count of assigned, unresolved tickets, least
    /// loaded first. `department` is matched case-insensitively.
    pub async fn list_with_load(
        pool: &PgPool,
        department: Option<&str>,
    ) -> Result<Vec<EmployeeWithLoad>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeWithLoad>(
            "SELECT e.id, e.full_name, e.department, e.permissions,
                    COUNT(t.id) FILTER (WHERE t.status <> 'closed') AS unresolved_tickets
             FROM employees e
             LEFT JOIN tickets t ON t.assigned_to = e.id
             WHERE ($1::TEXT IS NULL OR LOWER(e.department) = LOWER($1))
             GROUP BY e.id
             ORDER BY unresolved_tickets ASC, e.id ASC",
        )
        .bind(department)
        .fetch_all(pool)
        .await
    }

    /// Raw performance counts for one employee over tickets, messages and
    /// articles.
    pub async fn metric_counts(pool: &PgPool, id: DbId) -> Result<MetricCounts, sqlx::Error> {
        let tickets = sqlx::query_as::<_, TicketTotals>(
            "SELECT COUNT(*) AS assigned,
                    COUNT(*) FILTER (WHERE status = 'closed') AS resolved,
                    COUNT(*) FILTER (WHERE status <> 'closed') AS open
             FROM tickets
             WHERE assigned_to = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        let tickets_by_priority = sqlx::query_as::<_, KeyCount>(
            "SELECT priority AS key, COUNT(*) AS count
             FROM tickets WHERE assigned_to = $1 GROUP BY priority",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let tickets_by_category = sqlx::query_as::<_, KeyCount>(
            "SELECT category AS key, COUNT(*) AS count
             FROM tickets WHERE assigned_to = $1 GROUP BY category",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let messages_sent: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages
             WHERE created_by = $1 AND sender_type = 'employee' AND NOT is_system_message",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        let articles = sqlx::query_as::<_, ArticleTotals>(
            "SELECT COUNT(*) AS created,
                    COUNT(*) FILTER (WHERE status = 'approved') AS published,
                    COALESCE(SUM(view_count), 0)::BIGINT AS views
             FROM articles
             WHERE created_by = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        let articles_by_category = sqlx::query_as::<_, KeyCount>(
            "SELECT category AS key, COUNT(*) AS count
             FROM articles WHERE created_by = $1 GROUP BY category",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(MetricCounts {
            tickets,
            tickets_by_priority: into_buckets(tickets_by_priority),
            tickets_by_category: into_buckets(tickets_by_category),
            messages_sent,
            articles,
            articles_by_category: into_buckets(articles_by_category),
        })
    }
}

pub struct CustomerRepo;

impl CustomerRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
