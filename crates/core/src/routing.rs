//! Assignment recommendation.
//!
//! Advisory only: the manager confirms (or overrides) the suggestion before
//! the assignment is written.

use crate::ticket::TicketCategory;

/// Anything that can be ranked as an assignee.
pub trait Assignable {
    fn department(&self) -> &str;

    /// Number of assigned tickets that are not yet resolved.
    fn unresolved_tickets(&self) -> i64;
}

/// Pick the recommended assignee for a ticket of `category`.
///
/// Employees whose department equals the category (case-insensitive) are
/// preferred; among them the lowest load wins and ties go to the first
/// encountered. With no department match the globally least-loaded employee
/// is returned, again preferring the first on ties.
pub fn recommend<E: Assignable>(category: TicketCategory, employees: &[E]) -> Option<&E> {
    least_loaded(
        employees
            .iter()
            .filter(|e| category.matches_department(e.department())),
    )
    .or_else(|| least_loaded(employees.iter()))
}

fn least_loaded<'a, E: Assignable + 'a>(candidates: impl Iterator<Item = &'a E>) -> Option<&'a E> {
    candidates.fold(None, |best: Option<&E>, current| match best {
        Some(prev) if prev.unresolved_tickets() <= current.unresolved_tickets() => Some(prev),
        _ => Some(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Candidate {
        name: &'static str,
        department: &'static str,
        load: i64,
    }

    impl Assignable for Candidate {
        fn department(&self) -> &str {
            self.department
        }

        fn unresolved_tickets(&self) -> i64 {
            self.load
        }
    }

    fn c(name: &'static str, department: &'static str, load: i64) -> Candidate {
        Candidate {
            name,
            department,
            load,
        }
    }

    #[test]
    fn test_department_match_beats_lower_global_load() {
        let roster = [
            c("a", "technical", 3),
            c("b", "technical", 1),
            c("c", "billing", 0),
        ];
        let pick = recommend(TicketCategory::Technical, &roster).unwrap();
        assert_eq!(pick.name, "b");
    }

    #[test]
    fn test_department_match_is_case_insensitive() {
        let roster = [c("a", "Billing", 4), c("b", "support", 0)];
        let pick = recommend(TicketCategory::Billing, &roster).unwrap();
        assert_eq!(pick.name, "a");
    }

    #[test]
    fn test_ties_go_to_first_encountered() {
        let roster = [
            c("a", "technical", 2),
            c("b", "technical", 2),
            c("c", "technical", 5),
        ];
        let pick = recommend(TicketCategory::Technical, &roster).unwrap();
        assert_eq!(pick.name, "a");
    }

    #[test]
    fn test_no_department_match_falls_back_to_least_loaded() {
        let roster = [c("a", "sales", 3), c("b", "support", 1), c("c", "other", 1)];
        let pick = recommend(TicketCategory::FeatureRequest, &roster).unwrap();
        assert_eq!(pick.name, "b");
    }

    #[test]
    fn test_empty_roster_yields_none() {
        let roster: [Candidate; 0] = [];
        assert!(recommend(TicketCategory::General, &roster).is_none());
    }
}
