//! Reverse-chronological windows over a conversation

use crate::error::{AppError, Result};

/// Messages returned per page
pub const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Newest first
    pub items: Vec<T>,
    pub start: usize,
    /// Start of the next page, or `None` once the oldest item is included
    pub end: Option<usize>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            start: self.start,
            end: self.end,
        }
    }

    /// Wire form of `end`: -1 when there is nothing older
    pub fn end_marker(&self) -> i64 {
        self.end.map_or(-1, |end| end as i64)
    }
}

/// Window `[start, start + page_size)` of `oldest_first` read newest first
///
/// `start` may equal the number of items (an empty final page) but not
/// exceed it.
pub fn paginate<T>(oldest_first: Vec<T>, start: usize, page_size: usize) -> Result<Page<T>> {
    let total = oldest_first.len();
    if start > total {
        return Err(AppError::validation(format!(
            "start {start} is greater than the total number of messages ({total})"
        )));
    }

    let stop = start.saturating_add(page_size);
    let end = (stop < total).then_some(stop);
    let items = oldest_first
        .into_iter()
        .rev()
        .skip(start)
        .take(page_size)
        .collect();

    Ok(Page { items, start, end })
}
