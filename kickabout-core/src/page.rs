/// How many messages are fetched per page of chat history.
pub const MESSAGES_PER_PAGE: usize = 20;
/// How many activities are fetched per page of the catalog.
pub const ACTIVITIES_PER_PAGE: usize = 30;

/// A window into a record collection.
///
/// Pages are zero-indexed. Fetching a full page means more rows may exist,
/// while a short page always means the end of the collection was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    pub fn messages(page: usize) -> Self {
        Self::new(page, MESSAGES_PER_PAGE)
    }

    pub fn activities(page: usize) -> Self {
        Self::new(page, ACTIVITIES_PER_PAGE)
    }

    /// The offset of the first row in this page.
    pub fn offset(&self) -> usize {
        self.page * self.per_page
    }

    /// The inclusive row range of this page, as used by range headers.
    pub fn range(&self) -> (usize, usize) {
        let start = self.offset();
        (start, start + self.per_page - 1)
    }

    /// Whether a fetch of `amount` rows filled this page completely.
    pub fn is_full(&self, amount: usize) -> bool {
        amount == self.per_page
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(PageRequest::messages(0).range(), (0, 19));
        assert_eq!(PageRequest::messages(1).range(), (20, 39));
        assert_eq!(PageRequest::new(3, 5).range(), (15, 19));
    }

    #[test]
    fn test_fullness() {
        let page = PageRequest::messages(0);

        assert!(page.is_full(MESSAGES_PER_PAGE));
        assert!(!page.is_full(MESSAGES_PER_PAGE - 1));
        assert!(!page.is_full(0));
    }
}
