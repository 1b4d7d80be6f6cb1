//! This module defines the common functionality for paging expense data.

/// The config that controls how many expenses the listing operations return
/// per page.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page size for the recent-expenses view.
    pub recent_page_size: u64,
    /// The page size for the scrolling history view.
    pub history_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            recent_page_size: 10,
            history_page_size: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PaginationConfig;

    #[test]
    fn history_pages_are_larger_than_recent_pages() {
        let config = PaginationConfig::default();

        assert_eq!(config.recent_page_size, 10);
        assert_eq!(config.history_page_size, 15);
    }
}
