//! Page arithmetic for the audio listing

/// Records per page
pub const PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    /// 1-indexed, clamped to `[1, total_pages]`
    pub page: i64,
    pub total_pages: i64,
    pub offset: i64,
}

/// Clamp `requested_page` into range and compute the SQL offset.
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}
