//! Incremental address issuance with usage tracking
//!
//! The book only deals in indexes; the owning sub wallet turns them into
//! addresses. Each branch keeps a window of `gap_limit` unused indexes ahead
//! of the last one seen in use.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
struct Branch {
    issued: u32,
    used: BTreeSet<u32>,
}

impl Branch {
    fn first_unused(&self) -> u32 {
        (0..).find(|i| !self.used.contains(i)).unwrap_or(0)
    }

    fn last_used(&self) -> Option<u32> {
        self.used.iter().next_back().copied()
    }
}

#[derive(Debug, Clone)]
pub struct AddressBook {
    single_address: bool,
    gap_limit: u32,
    external: Branch,
    internal: Branch,
}

impl AddressBook {
    pub fn new(single_address: bool, gap_limit: u32) -> Self {
        let gap_limit = if single_address { 1 } else { gap_limit.max(1) };
        let branch = Branch { issued: gap_limit, used: BTreeSet::new() };
        Self {
            single_address,
            gap_limit,
            external: branch.clone(),
            internal: branch,
        }
    }

    fn branch(&self, internal: bool) -> &Branch {
        if internal && !self.single_address {
            &self.internal
        } else {
            &self.external
        }
    }

    fn branch_mut(&mut self, internal: bool) -> &mut Branch {
        if internal && !self.single_address {
            &mut self.internal
        } else {
            &mut self.external
        }
    }

    /// Index of the first external address not yet seen in use.
    pub fn create_address(&mut self) -> u32 {
        if self.single_address {
            return 0;
        }
        let index = self.external.first_unused();
        if index >= self.external.issued {
            self.external.issued = index + 1;
        }
        index
    }

    pub fn issued(&self, internal: bool) -> u32 {
        self.branch(internal).issued
    }

    /// Issued indexes in `[start, start + count)`.
    pub fn range(&self, start: u32, count: u32, internal: bool) -> Vec<u32> {
        let issued = self.issued(internal);
        let end = start.saturating_add(count).min(issued);
        (start.min(end)..end).collect()
    }

    /// The trailing gap-limit window of a branch.
    pub fn last_window(&self, internal: bool) -> Vec<u32> {
        let issued = self.issued(internal);
        (issued.saturating_sub(self.gap_limit)..issued).collect()
    }

    /// Marks an index used and keeps a full window ahead of it.
    pub fn mark_used(&mut self, index: u32, internal: bool) {
        if self.single_address {
            return;
        }
        let gap = self.gap_limit;
        let branch = self.branch_mut(internal);
        branch.used.insert(index);
        if let Some(last) = branch.last_used() {
            branch.issued = branch.issued.max(last.saturating_add(1).saturating_add(gap));
        }
    }

    pub fn is_used(&self, index: u32, internal: bool) -> bool {
        self.branch(internal).used.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_address_advances_past_used() {
        let mut book = AddressBook::new(false, 5);
        assert_eq!(book.create_address(), 0);
        assert_eq!(book.create_address(), 0);
        book.mark_used(0, false);
        assert_eq!(book.create_address(), 1);
        book.mark_used(1, false);
        book.mark_used(2, false);
        assert_eq!(book.create_address(), 3);
    }

    #[test]
    fn test_window_extends_with_usage() {
        let mut book = AddressBook::new(false, 5);
        assert_eq!(book.issued(false), 5);
        book.mark_used(4, false);
        assert_eq!(book.issued(false), 10);
        assert_eq!(book.last_window(false), vec![5, 6, 7, 8, 9]);
        assert_eq!(book.issued(true), 5);
        assert!(book.is_used(4, false));
        assert!(!book.is_used(4, true));
    }

    #[test]
    fn test_range_is_clamped() {
        let book = AddressBook::new(false, 3);
        assert_eq!(book.range(1, 10, false), vec![1, 2]);
        assert!(book.range(7, 2, false).is_empty());
    }

    #[test]
    fn test_single_address_collapses() {
        let mut book = AddressBook::new(true, 10);
        book.mark_used(0, false);
        assert_eq!(book.create_address(), 0);
        assert_eq!(book.range(0, 10, true), vec![0]);
        assert_eq!(book.last_window(false), vec![0]);
        assert_eq!(book.issued(false), 1);
    }
}
