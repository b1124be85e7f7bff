//! Pagination

use serde::Serialize;
use std::num::IntErrorKind;

/// Splits `total` items into pages of `per_page`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(total: i64, per_page: i64) -> Self {
        Self {
            total: total.max(0),
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty result still has one (empty) page
    pub fn num_pages(&self) -> i64 {
        if self.total == 0 {
            1
        } else {
            (self.total + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve a raw `page` parameter to a valid page number.
    ///
    /// Missing or non-numeric values and numbers below one give the first
    /// page; numbers past the end give the last page, including numbers
    /// too large for `i64`.
    pub fn resolve(&self, raw: Option<&str>) -> i64 {
        let Some(raw) = raw else {
            return 1;
        };
        match raw.trim().parse::<i64>() {
            Ok(n) if n >= 1 => n.min(self.num_pages()),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => self.num_pages(),
            _ => 1,
        }
    }

    pub fn offset(&self, number: i64) -> i64 {
        (number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// One page of results, shaped for templates
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: i64, paginator: &Paginator) -> Self {
        let num_pages = paginator.num_pages();
        let has_next = number < num_pages;
        let has_previous = number > 1;
        Self {
            items,
            number,
            num_pages,
            total: paginator.total,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then_some(number - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_num_pages() {
        assert_eq!(Paginator::new(0, 4).num_pages(), 1);
        assert_eq!(Paginator::new(4, 4).num_pages(), 1);
        assert_eq!(Paginator::new(5, 4).num_pages(), 2);
        assert_eq!(Paginator::new(8, 4).num_pages(), 2);
    }

    #[test]
    fn test_resolve_defaults_and_clamps() {
        let paginator = Paginator::new(6, 4);
        assert_eq!(paginator.resolve(None), 1);
        assert_eq!(paginator.resolve(Some("abc")), 1);
        assert_eq!(paginator.resolve(Some("")), 1);
        assert_eq!(paginator.resolve(Some("0")), 1);
        assert_eq!(paginator.resolve(Some("-3")), 1);
        assert_eq!(paginator.resolve(Some("2")), 2);
        assert_eq!(paginator.resolve(Some("999")), 2);
        assert_eq!(paginator.resolve(Some("99999999999999999999")), 2);
        assert_eq!(paginator.resolve(Some("-99999999999999999999")), 1);
    }

    #[test]
    fn test_page_navigation() {
        let paginator = Paginator::new(9, 4);
        let first = Page::new(vec![1, 2, 3, 4], 1, &paginator);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.next_page_number, Some(2));
        assert_eq!(first.previous_page_number, None);

        let last = Page::new(vec![9], 3, &paginator);
        assert!(!last.has_next);
        assert!(last.has_previous);
        assert_eq!(last.previous_page_number, Some(2));
        assert_eq!(last.total, 9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Whatever the client sends, the resolved page exists
        #[test]
        fn resolved_page_is_in_range(total in 0i64..200, raw in ".*") {
            let paginator = Paginator::new(total, 4);
            let page = paginator.resolve(Some(&raw));
            prop_assert!(page >= 1);
            prop_assert!(page <= paginator.num_pages());
        }

        /// Page offsets never skip or repeat items
        #[test]
        fn offsets_tile_the_result(total in 1i64..200, number in 1i64..60) {
            let paginator = Paginator::new(total, 4);
            let number = number.min(paginator.num_pages());
            prop_assert_eq!(paginator.offset(number), (number - 1) * 4);
            prop_assert!(paginator.offset(number) < total);
        }
    }
}
