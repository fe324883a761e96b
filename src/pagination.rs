use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `?page=` as it arrives in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self, size: u64) -> Result<PageRequest> {
        let number = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw.parse::<u64>().map_err(|_| Error::NotFound)?,
        };
        if number == 0 {
            return Err(Error::NotFound);
        }
        Ok(PageRequest { number, size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn first(size: u64) -> Self {
        PageRequest { number: 1, size }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Slice `count` rows into the requested page. An empty result still has one
/// page; any page past the last one is not found and `fetch` is not called.
pub fn paginate<T>(
    count: u64,
    request: PageRequest,
    fetch: impl FnOnce(u64, u64) -> Result<Vec<T>>,
) -> Result<Page<T>> {
    let num_pages = count.div_ceil(request.size).max(1);
    if request.number == 0 || request.number > num_pages {
        return Err(Error::NotFound);
    }
    let offset = (request.number - 1) * request.size;
    let items = fetch(offset, request.size)?;
    Ok(Page {
        items,
        page: request.number,
        num_pages,
        count,
        has_next: request.number < num_pages,
        has_previous: request.number > 1,
    })
}
