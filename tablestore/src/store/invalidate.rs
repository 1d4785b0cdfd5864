//! Dirty flags for derived views.

/// Which derived views need recomputing.
///
/// Views depend on each other in a fixed order: filtered rows feed sorted
/// rows, sorted rows feed the tree map. Marking an input dirty implies
/// everything downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Invalidation {
    filter: bool,
    sort: bool,
    tree: bool,
}

impl Invalidation {
    /// Raw rows or filters changed.
    pub fn filter(&mut self) {
        self.filter = true;
    }

    /// Only sort state changed; the last filtered rows are reused.
    pub fn sort(&mut self) {
        self.sort = true;
    }

    /// Tree inputs (lazy children, explicit keys) changed.
    pub fn tree(&mut self) {
        self.tree = true;
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn needs_filter(&self) -> bool {
        self.filter
    }

    pub fn needs_sort(&self) -> bool {
        self.filter || self.sort
    }

    pub fn needs_tree(&self) -> bool {
        self.needs_sort() || self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_implies_downstream() {
        let mut dirty = Invalidation::default();
        dirty.filter();
        assert!(dirty.needs_sort());
        assert!(dirty.needs_tree());
    }

    #[test]
    fn test_take_resets() {
        let mut dirty = Invalidation::default();
        dirty.tree();
        let taken = dirty.take();
        assert!(taken.needs_tree());
        assert!(!taken.needs_sort());
        assert_eq!(dirty, Invalidation::default());
    }
}
