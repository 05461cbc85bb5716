//! Page range partitioning for full crawls

/// A contiguous, inclusive range of listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBatch {
    /// Zero-based position of this batch in the session
    pub index: usize,
    pub first: u32,
    pub last: u32,
}

impl PageBatch {
    /// Splits `[start, end]` into consecutive batches of at most `size` pages
    ///
    /// Returns no batches when `start > end`.
    pub fn partition(start: u32, end: u32, size: u32) -> Vec<PageBatch> {
        let size = size.max(1);
        let mut batches = Vec::new();
        let mut first = start;

        while first <= end {
            let last = first.saturating_add(size - 1).min(end);
            batches.push(PageBatch {
                index: batches.len(),
                first,
                last,
            });
            if last == u32::MAX {
                break;
            }
            first = last + 1;
        }

        batches
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }
}
