//! Per-employee performance figures derived from tickets, messages and
//! articles.

/// Messages sent per assigned ticket, rounded to two decimals. Zero when no
/// tickets are assigned.
pub fn per_ticket(messages_sent: i64, tickets_assigned: i64) -> f64 {
    if tickets_assigned <= 0 {
        return 0.0;
    }
    round2(messages_sent as f64 / tickets_assigned as f64)
}

/// Share of created articles that are published, as a percentage with two
/// decimals. Zero when nothing was created.
pub fn approval_rate(published: i64, created: i64) -> f64 {
    if created <= 0 {
        return 0.0;
    }
    round2(published as f64 * 100.0 / created as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
