use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub page_number: u32,
    #[validate(range(min = 1, message = "Page size must be at least 1"))]
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        PageRequest { page_number, page_size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_number) * i64::from(self.page_size)
    }

    /// One row more than the page holds, to learn whether another page exists.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.page_size) + 1
    }
}

/// A page of results plus whether a further page exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub has_more_items: bool,
}

impl<T> Slice<T> {
    /// Builds the slice from rows fetched with [`PageRequest::fetch_limit`].
    pub fn from_overfetch(mut rows: Vec<T>, page: PageRequest) -> Self {
        let has_more_items = rows.len() > page.page_size as usize;
        rows.truncate(page.page_size as usize);
        Slice {
            items: rows,
            page_number: page.page_number,
            page_size: page.page_size,
            has_more_items,
        }
    }

    pub fn with_items<U>(self, items: Vec<U>) -> Slice<U> {
        Slice {
            items,
            page_number: self.page_number,
            page_size: self.page_size,
            has_more_items: self.has_more_items,
        }
    }
}
