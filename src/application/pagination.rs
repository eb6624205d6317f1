//! Page-number pagination shared by every post listing.
//!
//! Pages are 1-based. The requested page arrives as raw query text and is
//! resolved leniently: missing or malformed values fall back to the first
//! page, and numbers past the end clamp to the last page. An empty collection
//! still has exactly one (empty) page.

use std::num::NonZeroU32;

use serde::Serialize;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN))
    }
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    /// Number of pages needed for `total` records; never less than one.
    pub fn num_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page.get())).max(1)
    }

    /// Resolve the requested page against `total` records.
    pub fn window(&self, total: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = parse_page_number(requested).clamp(1, num_pages);
        let per_page = u64::from(self.per_page.get());

        PageWindow {
            number,
            num_pages,
            total,
            offset: (number - 1) * per_page,
            limit: per_page,
        }
    }

    /// Slice an already-ordered, in-memory collection.
    pub fn paginate<T>(&self, items: Vec<T>, requested: Option<&str>) -> Page<T> {
        let window = self.window(items.len() as u64, requested);
        let start = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let slice = items.into_iter().skip(start).take(take).collect();
        Page::from_window(slice, window)
    }
}

fn parse_page_number(requested: Option<&str>) -> u64 {
    let Some(raw) = requested.map(str::trim) else {
        return 1;
    };
    match raw.parse::<i64>() {
        Ok(value) if value < 1 => 1,
        Ok(value) => value.unsigned_abs(),
        // Too large for any integer type: still a page past the end.
        Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => u64::MAX,
        Err(_) => 1,
    }
}

/// Position of one page within a collection, ready for an OFFSET/LIMIT query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}
