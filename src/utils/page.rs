/// A window over a list of items, used for the catalog pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub current_page: usize,
    pub total_items: usize,
    pub per_page: usize,
}

impl Page {
    /// Out-of-range page numbers are clamped to the last page
    pub fn new(current_page: usize, total_items: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let last = total_items.saturating_sub(1) / per_page;
        Page {
            current_page: current_page.min(last),
            total_items,
            per_page,
        }
    }

    /// Index of the first item on this page
    pub fn offset(&self) -> usize {
        self.current_page * self.per_page
    }

    /// Number of items actually shown on this page
    pub fn len(&self) -> usize {
        self.total_items
            .saturating_sub(self.offset())
            .min(self.per_page)
    }

    /// Get total number of pages (at least one, even when empty)
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.per_page).max(1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.offset() + self.per_page < self.total_items).then_some(self.current_page + 1)
    }

    pub fn previous(&self) -> Option<usize> {
        self.current_page.checked_sub(1)
    }

    /// "📄 2/4"
    pub fn indicator(&self) -> String {
        format!("📄 {}/{}", self.current_page + 1, self.total_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_pages() {
        let first = Page::new(0, 25, 8);
        assert_eq!(first.len(), 8);
        assert_eq!(first.next(), Some(1));
        assert_eq!(first.previous(), None);
        assert_eq!(first.total_pages(), 4);

        let last = Page::new(3, 25, 8);
        assert_eq!(last.offset(), 24);
        assert_eq!(last.len(), 1);
        assert_eq!(last.next(), None);
        assert_eq!(last.previous(), Some(2));
        assert_eq!(last.indicator(), "📄 4/4");
    }

    #[test]
    fn test_clamps_and_empty() {
        assert_eq!(Page::new(9, 25, 8).current_page, 3);
        let empty = Page::new(0, 0, 8);
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.total_pages(), 1);
        assert_eq!(empty.next(), None);
    }
}
