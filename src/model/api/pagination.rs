use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Page selection, read from the `page_num` (1-based, default 1) and
/// `page_size` (default 50) query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_num: usize,
    page_size: usize,
}

impl Pagination {
    /// Both values must be at least 1.
    pub fn new(page_num: usize, page_size: usize) -> Option<Self> {
        (page_num >= 1 && page_size >= 1).then_some(Self {
            page_num,
            page_size,
        })
    }

    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items before this page. Saturates, so pages far beyond the
    /// end are simply empty.
    pub fn skip(&self) -> usize {
        (self.page_num - 1).saturating_mul(self.page_size)
    }

    /// Take the selected page out of the full list of items.
    pub fn page<T>(self, items: Vec<T>) -> Paginated<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.skip())
            .take(self.page_size)
            .collect();
        Paginated {
            items,
            pagination: self.result(total),
        }
    }

    pub fn result(self, total: usize) -> PaginationResult {
        PaginationResult {
            page_num: self.page_num,
            page_size: self.page_size,
            total,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page_num = match req.query_value::<usize>("page_num").unwrap_or(Ok(1)) {
            Ok(page_num) => page_num,
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let page_size = match req
            .query_value::<usize>("page_size")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
        {
            Ok(page_size) => page_size,
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        match Self::new(page_num, page_size) {
            Some(pagination) => request::Outcome::Success(pagination),
            None => request::Outcome::Failure((Status::BadRequest, ())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationResult {
    pub page_num: usize,
    pub page_size: usize,
    pub total: usize,
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}
