use std::num::NonZeroUsize;
use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(size) => size,
    None => panic!("page size must be non-zero"),
};

/// Splits a collection into fixed-size, 1-based pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: NonZeroUsize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// One page plus what the footer needs to describe it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    offset: usize,
}

impl<T> Page<T> {
    /// 1-based inclusive positions of the first and last item shown.
    pub fn showing(&self) -> Option<(usize, usize)> {
        if self.items.is_empty() {
            return None;
        }
        Some((self.offset + 1, self.offset + self.items.len()))
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

impl Pager {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// `ceil(len / page_size)`; zero for an empty collection.
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size.get())
    }

    /// Index range of `page` within a collection of `len` items, or `None`
    /// when the page lies outside it.
    pub fn bounds(&self, len: usize, page: usize) -> Option<Range<usize>> {
        if page == 0 {
            return None;
        }
        let start = (page - 1).checked_mul(self.page_size.get())?;
        if start >= len {
            return None;
        }
        let end = start.saturating_add(self.page_size.get()).min(len);
        Some(start..end)
    }

    /// Items of `page`. Out-of-range pages give an empty slice.
    pub fn slice<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        match self.bounds(items.len(), page) {
            Some(range) => &items[range],
            None => &[],
        }
    }

    pub fn page<T: Clone>(&self, items: &[T], page: usize) -> Page<T> {
        let range = self.bounds(items.len(), page);
        Page {
            offset: range.as_ref().map_or(0, |r| r.start),
            items: range.map_or_else(Vec::new, |r| items[r].to_vec()),
            number: page,
            total_pages: self.total_pages(items.len()),
            total_items: items.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::Pager;

    fn pager(size: usize) -> Pager {
        Pager::new(NonZeroUsize::new(size).unwrap())
    }

    #[test]
    fn eight_records_in_pages_of_five() {
        let items: Vec<u32> = (1..=8).collect();
        let pager = pager(5);

        assert_eq!(pager.total_pages(items.len()), 2);
        assert_eq!(pager.slice(&items, 1), &[1, 2, 3, 4, 5]);
        assert_eq!(pager.slice(&items, 2), &[6, 7, 8]);
    }

    #[test]
    fn pages_concatenate_back_to_the_collection() {
        for len in [0usize, 1, 4, 5, 6, 10, 23] {
            for size in [1usize, 3, 5, 7] {
                let items: Vec<usize> = (0..len).collect();
                let pager = pager(size);
                let joined: Vec<usize> = (1..=pager.total_pages(len))
                    .flat_map(|page| pager.slice(&items, page).iter().copied())
                    .collect();
                assert_eq!(joined, items, "len={len} size={size}");
            }
        }
    }

    #[test]
    fn out_of_range_pages_are_empty() {
        let items = [1, 2, 3];
        let pager = pager(5);

        assert!(pager.slice(&items, 99).is_empty());
        assert!(pager.slice(&items, 0).is_empty());
        assert!(pager.slice(&items, usize::MAX).is_empty());
        assert_eq!(pager.total_pages(0), 0);
        assert!(pager.slice::<u8>(&[], 1).is_empty());
    }

    #[test]
    fn page_reports_footer_range() {
        let items: Vec<u32> = (1..=8).collect();
        let pager = pager(5);

        let first = pager.page(&items, 1);
        assert_eq!(first.showing(), Some((1, 5)));
        assert!(!first.has_previous());
        assert!(first.has_next());

        let last = pager.page(&items, 2);
        assert_eq!(last.items, vec![6, 7, 8]);
        assert_eq!(last.showing(), Some((6, 8)));
        assert!(last.has_previous());
        assert!(!last.has_next());

        let beyond = pager.page(&items, 3);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.showing(), None);
        assert_eq!(beyond.total_pages, 2);
    }
}
