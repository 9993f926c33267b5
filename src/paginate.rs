//! Pagination for listing pages. [`paginate`] splits a list of posts into
//! [`PageDescriptor`]s, and [`generate_pages`] / [`page_links`] decide which
//! page numbers a listing page links to.

/// Describes one listing page: which slice of the listing it shows and where
/// it sits among its sibling pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageDescriptor {
    /// The 1-based page number.
    pub page_number: usize,

    /// The index of the first item on the page.
    pub offset: usize,

    /// The number of items on the page. Equal to the page size for every
    /// page but the last.
    pub limit: usize,

    /// The number of pages in the listing.
    pub total_pages: usize,
}

impl PageDescriptor {
    /// Returns `true` if this is the first page of its listing.
    pub fn is_first(&self) -> bool {
        self.page_number == 1
    }

    /// Returns `true` if this is the last page of its listing.
    pub fn is_last(&self) -> bool {
        self.page_number == self.total_pages
    }

    /// Returns the range of item indices covered by the page.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.limit
    }
}

/// Splits `total_items` items into pages of `page_size` items. Every item
/// lands on exactly one page and only the last page may be partially filled.
/// Zero items (or a zero page size) yields no pages.
pub fn paginate(total_items: usize, page_size: usize) -> Vec<PageDescriptor> {
    if page_size == 0 {
        return Vec::new();
    }

    let total_pages = match total_items % page_size {
        0 => total_items / page_size,
        _ => total_items / page_size + 1,
    };

    (0..total_pages)
        .map(|i| {
            let offset = i * page_size;
            PageDescriptor {
                page_number: i + 1,
                offset,
                limit: page_size.min(total_items - offset),
                total_pages,
            }
        })
        .collect()
}

/// Chooses which page numbers to display as links. The first and last pages
/// are always present; the remaining `max_displayed - 2` slots form a window
/// centered on `current_page` which never slides past either end.
///
/// If every page fits (`max_displayed >= total_pages`), all pages are
/// returned.
pub fn generate_pages(
    current_page: usize,
    total_pages: usize,
    max_displayed: usize,
) -> Vec<usize> {
    if max_displayed >= total_pages {
        return (1..=total_pages).collect();
    }

    let window_size = max_displayed.saturating_sub(2);
    let start = current_page
        .saturating_sub(window_size / 2)
        .min(total_pages - window_size)
        .max(2);

    let mut pages = Vec::with_capacity(window_size + 2);
    pages.push(1);
    pages.extend(start..start + window_size);
    pages.push(total_pages);
    pages
}

/// One entry in a rendered pagination bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageLink {
    /// A link to a page. `current` marks the page being rendered.
    Page { number: usize, current: bool },

    /// A gap between two non-adjacent page numbers.
    Ellipsis,
}

/// Builds the pagination bar for `current_page`: the numbers from
/// [`generate_pages`] with an [`PageLink::Ellipsis`] wherever two neighbors
/// are not adjacent.
pub fn page_links(
    current_page: usize,
    total_pages: usize,
    max_displayed: usize,
) -> Vec<PageLink> {
    let mut links = Vec::new();
    let mut previous: Option<usize> = None;
    for number in generate_pages(current_page, total_pages, max_displayed) {
        if let Some(previous) = previous {
            if number > previous + 1 {
                links.push(PageLink::Ellipsis);
            }
        }
        links.push(PageLink::Page {
            number,
            current: number == current_page,
        });
        previous = Some(number);
    }
    links
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_pages_all_fit() {
        assert_eq!(vec![1, 2], generate_pages(2, 2, 5));
        assert_eq!(vec![1, 2, 3, 4, 5], generate_pages(3, 5, 5));
        assert_eq!(vec![1], generate_pages(1, 1, 5));
        assert_eq!(Vec::<usize>::new(), generate_pages(1, 0, 5));
    }

    #[test]
    fn test_generate_pages_clamped_to_end() {
        assert_eq!(vec![1, 7, 8, 9, 10], generate_pages(9, 10, 5));
        assert_eq!(vec![1, 7, 8, 9, 10], generate_pages(10, 10, 5));
    }

    #[test]
    fn test_generate_pages_clamped_to_start() {
        assert_eq!(vec![1, 2, 3, 4, 10], generate_pages(1, 10, 5));
        assert_eq!(vec![1, 2, 3, 4, 10], generate_pages(2, 10, 5));
    }

    #[test]
    fn test_generate_pages_centered() {
        assert_eq!(vec![1, 4, 5, 6, 10], generate_pages(5, 10, 5));
        assert_eq!(vec![1, 3, 4, 5, 6, 10], generate_pages(5, 10, 6));
    }

    #[test]
    fn test_generate_pages_tiny_window() {
        assert_eq!(vec![1, 10], generate_pages(5, 10, 2));
        assert_eq!(vec![1, 10], generate_pages(5, 10, 0));
    }

    #[test]
    fn test_generate_pages_shape() {
        for total_pages in 1..30 {
            for max_displayed in 2..total_pages {
                for current in 1..=total_pages {
                    let pages =
                        generate_pages(current, total_pages, max_displayed);
                    assert_eq!(max_displayed, pages.len());
                    assert_eq!(Some(&1), pages.first());
                    assert_eq!(Some(&total_pages), pages.last());
                    assert!(pages.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    fn test_paginate_covers_every_item_once() {
        for total in 0..40 {
            for page_size in 1..12 {
                let pages = paginate(total, page_size);
                let mut next = 0;
                for (i, page) in pages.iter().enumerate() {
                    assert_eq!(i + 1, page.page_number);
                    assert_eq!(pages.len(), page.total_pages);
                    assert_eq!(next, page.offset);
                    if !page.is_last() {
                        assert_eq!(page_size, page.limit);
                    }
                    assert!(page.limit > 0 && page.limit <= page_size);
                    next += page.limit;
                }
                assert_eq!(total, next);
            }
        }
    }

    #[test]
    fn test_paginate_partial_last_page() {
        assert_eq!(
            vec![
                PageDescriptor {
                    page_number: 1,
                    offset: 0,
                    limit: 10,
                    total_pages: 2,
                },
                PageDescriptor {
                    page_number: 2,
                    offset: 10,
                    limit: 3,
                    total_pages: 2,
                },
            ],
            paginate(13, 10),
        );
    }

    #[test]
    fn test_paginate_empty() {
        assert!(paginate(0, 10).is_empty());
        assert!(paginate(10, 0).is_empty());
    }

    #[test]
    fn test_page_links_marks_gaps() {
        use PageLink::*;
        assert_eq!(
            vec![
                Page { number: 1, current: false },
                Ellipsis,
                Page { number: 4, current: false },
                Page { number: 5, current: true },
                Page { number: 6, current: false },
                Ellipsis,
                Page { number: 10, current: false },
            ],
            page_links(5, 10, 5),
        );
        assert_eq!(
            vec![
                Page { number: 1, current: true },
                Page { number: 2, current: false },
            ],
            page_links(1, 2, 5),
        );
    }
}
