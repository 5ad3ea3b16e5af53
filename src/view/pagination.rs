use crate::models::{PageNav, PageSize, Pagination};

/// Never zero, so an empty result still has a first page.
pub fn total_pages(count: usize, page_size: PageSize) -> usize {
    match page_size {
        PageSize::Unbounded => 1,
        PageSize::Limited(size) => count.div_ceil(size.get()).max(1),
    }
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Target page for a navigation control; boundary moves are no-ops.
pub fn navigate(page: usize, nav: PageNav, total_pages: usize) -> usize {
    let current = clamp_page(page, total_pages);
    let target = match nav {
        PageNav::First => 1,
        PageNav::Previous => current.saturating_sub(1),
        PageNav::Next => current.saturating_add(1),
        PageNav::Last => total_pages,
        PageNav::Goto(page) => page,
    };
    clamp_page(target, total_pages)
}

pub fn paginate<T>(items: Vec<T>, page_size: PageSize, page: usize) -> (Vec<T>, Pagination) {
    let total_items = items.len();
    let total_pages = total_pages(total_items, page_size);
    let page = clamp_page(page, total_pages);

    let slice = match page_size {
        PageSize::Unbounded => items,
        PageSize::Limited(size) => {
            let size = size.get();
            items.into_iter().skip((page - 1) * size).take(size).collect()
        }
    };

    let pagination = Pagination {
        page,
        page_size,
        total_pages,
        total_items,
        has_previous: page > 1,
        has_next: page < total_pages,
    };
    (slice, pagination)
}
