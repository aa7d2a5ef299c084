//! Prefixed monotonic id allocation.

/// Kinds of entity that receive generated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Workspace,
    Board,
    List,
    Card,
}

impl IdKind {
    /// Prefix placed before the counter value.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Workspace => "ws-",
            Self::Board => "board-",
            Self::List => "list-",
            Self::Card => "card-",
        }
    }
}

/// One counter shared by every kind, so no two ids ever share a number.
///
/// After a reload, restore the saved counter with [`IdGenerator::resume_at`]
/// and feed every persisted id through [`IdGenerator::observe`] so
/// allocation resumes above both.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    /// Allocate the next id of the given kind.
    pub fn next(&mut self, kind: IdKind) -> String {
        let n = self.next;
        self.next += 1;
        format!("{}{n}", kind.prefix())
    }

    /// Bump the counter past an existing id. Ids without a numeric suffix are ignored.
    pub fn observe(&mut self, id: &str) {
        let suffix = id.rsplit('-').next().unwrap_or_default();
        if let Ok(n) = suffix.parse::<u64>() {
            self.next = self.next.max(n.saturating_add(1));
        }
    }

    /// Never allocate below `next`. Lower values are ignored.
    pub fn resume_at(&mut self, next: u64) {
        self.next = self.next.max(next);
    }

    /// Value the next allocation will use.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let mut ids = IdGenerator::default();
        let mut seen = HashSet::new();

        for kind in [IdKind::Workspace, IdKind::Board, IdKind::List, IdKind::Card] {
            for _ in 0..50 {
                assert!(seen.insert(ids.next(kind)));
            }
        }
    }

    #[test]
    fn test_observe_resumes_above_existing() {
        let mut ids = IdGenerator::default();
        ids.observe("ws-1");
        ids.observe("board-41");
        ids.observe("legacy");
        ids.observe("card-7");

        assert_eq!(ids.next(IdKind::List), "list-42");
    }

    #[test]
    fn test_resume_at_only_moves_forward() {
        let mut ids = IdGenerator::default();
        ids.resume_at(9);
        ids.observe("ws-3");
        ids.resume_at(4);

        assert_eq!(ids.next(IdKind::Workspace), "ws-9");
        assert_eq!(ids.peek(), 10);
    }
}
