//! Derived pagination metadata.

/// Pagination metadata derived from a collection's stored state.
///
/// Recomputed on demand from `total`, `page` and `limit`; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Total number of items, as reported by the server.
    pub total: u64,
    /// Current page number, 1-based.
    pub page: u64,
    /// Items per page.
    pub limit: u64,
    /// Number of pages.
    pub pages: u64,
    /// Previous page number, when there is one.
    pub prev: Option<u64>,
    /// Next page number, when there is one.
    pub next: Option<u64>,
    /// 1-based index range of the items visible on the current page.
    pub range: (u64, u64),
    /// Enumerable page numbers; never empty, so a pager always has at
    /// least one page to render even with zero results.
    pub paging: Vec<u64>,
}

impl PageInfo {
    /// Computes pagination metadata.
    ///
    /// A `limit` of zero is treated as the default of 10; callers that
    /// store the limit normalize it themselves before delegating here.
    pub fn compute(total: u64, page: u64, limit: u64) -> Self {
        let limit = if limit == 0 { 10 } else { limit };
        let pages = total.div_ceil(limit);

        let mut max = total.min(page * limit);
        if total == pages * limit {
            max = total;
        }

        let range = (page.saturating_sub(1) * limit + 1, max);
        let prev = (page > 1).then(|| page - 1);
        let next = (page < pages).then(|| page + 1);

        let paging = if pages == 0 {
            vec![1]
        } else {
            (1..=pages).collect()
        };

        Self {
            total,
            page,
            limit,
            pages,
            prev,
            next,
            range,
            paging,
        }
    }

    /// True when the current page is the last one.
    pub fn is_last_page(&self) -> bool {
        self.next.is_none()
    }
}
