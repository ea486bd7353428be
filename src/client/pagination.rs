/// Page-number controls shown when there are too many pages to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Page(u32),
    Ellipsis,
}

const SHOW_ALL_UP_TO: u32 = 5;

/// Pagination state of the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u32,
    pub total_pages: u32,
}

impl PageWindow {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_count: 0,
            total_pages: 0,
        }
    }

    pub fn set_total_count(&mut self, total_count: u32) {
        self.total_count = total_count;
        self.total_pages = total_pages(total_count, self.page_size);
    }

    /// Highest page the current page may take: `max(total_pages, 1)`.
    pub fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }

    pub fn contains(&self, page: u32) -> bool {
        (1..=self.total_pages).contains(&page)
    }

    pub fn controls(&self) -> Vec<PageControl> {
        page_controls(self.current_page, self.total_pages)
    }
}

pub fn total_pages(total_count: u32, page_size: u32) -> u32 {
    total_count.div_ceil(page_size.max(1))
}

/// Page 1, a three-page window around `current`, the last page, and an
/// ellipsis wherever the window leaves a gap.
///
/// No ellipsis is emitted when the window ends at `total - 1`, since no page
/// is hidden there: page 9 of 10 gives `1 … 7 8 9 10`.
pub fn page_controls(current: u32, total: u32) -> Vec<PageControl> {
    if total <= SHOW_ALL_UP_TO {
        return (1..=total).map(PageControl::Page).collect();
    }

    let current = current.clamp(1, total);
    let (start, end) = if current <= 3 {
        (2, 4)
    } else if current >= total - 2 {
        (total - 3, total - 1)
    } else {
        (current - 1, current + 1)
    };

    let mut controls = Vec::with_capacity(7);
    controls.push(PageControl::Page(1));
    if start > 2 {
        controls.push(PageControl::Ellipsis);
    }
    controls.extend((start..=end).map(PageControl::Page));
    if end < total - 1 {
        controls.push(PageControl::Ellipsis);
    }
    controls.push(PageControl::Page(total));
    controls
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use super::PageControl::{Ellipsis as E, Page as P};

    #[rstest]
    #[case(1, 10, vec![P(1), P(2), P(3), P(4), E, P(10)])]
    #[case(3, 10, vec![P(1), P(2), P(3), P(4), E, P(10)])]
    #[case(4, 10, vec![P(1), E, P(3), P(4), P(5), E, P(10)])]
    #[case(6, 10, vec![P(1), E, P(5), P(6), P(7), E, P(10)])]
    #[case(8, 10, vec![P(1), E, P(7), P(8), P(9), P(10)])]
    #[case(9, 10, vec![P(1), E, P(7), P(8), P(9), P(10)])]
    #[case(10, 10, vec![P(1), E, P(7), P(8), P(9), P(10)])]
    #[case(1, 6, vec![P(1), P(2), P(3), P(4), E, P(6)])]
    #[case(4, 6, vec![P(1), E, P(3), P(4), P(5), P(6)])]
    #[case(4, 7, vec![P(1), E, P(3), P(4), P(5), E, P(7)])]
    fn windowed_controls(#[case] current: u32, #[case] total: u32, #[case] expected: Vec<PageControl>) {
        assert_eq!(page_controls(current, total), expected);
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![P(1)])]
    #[case(4, vec![P(1), P(2), P(3), P(4)])]
    #[case(5, vec![P(1), P(2), P(3), P(4), P(5)])]
    fn small_totals_list_every_page(#[case] total: u32, #[case] expected: Vec<PageControl>) {
        assert_eq!(page_controls(1, total), expected);
    }

    #[test]
    fn window_never_repeats_first_or_last_page() {
        for total in 6..40 {
            for current in 1..=total {
                let pages: Vec<u32> = page_controls(current, total)
                    .into_iter()
                    .filter_map(|c| match c {
                        P(n) => Some(n),
                        E => None,
                    })
                    .collect();
                assert!(
                    pages.windows(2).all(|pair| pair[0] < pair[1]),
                    "pages out of order or repeated for {current}/{total}"
                );
                assert!(pages.contains(&current), "current missing for {current}/{total}");
                assert_eq!(pages.first(), Some(&1));
                assert_eq!(pages.last(), Some(&total));
            }
        }
    }

    #[rstest]
    #[case(0, 6, 0)]
    #[case(1, 6, 1)]
    #[case(6, 6, 1)]
    #[case(7, 6, 2)]
    #[case(13, 6, 3)]
    fn total_pages_rounds_up(#[case] count: u32, #[case] size: u32, #[case] expected: u32) {
        assert_eq!(total_pages(count, size), expected);
    }
}
