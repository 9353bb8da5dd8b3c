//! Typed listing queries.
//!
//! Listing endpoints compose the same stages: equality filters, a literal
//! case-insensitive title match, an optional sort on duration and a page
//! window. Paging parameters are validated when the [`PageRequest`] is built,
//! so a query that exists is one that can run.

use crate::db::models::Video;
use crate::db::schema::videos;
use crate::error::AppError;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw `?page=&limit=` query parameters.
#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn into_request(self) -> Result<PageRequest, AppError> {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(AppError::bad_request(
                "page number should be at least 1 or higher",
            ));
        }
        if limit < 1 {
            return Err(AppError::bad_request("limit should be at least 1 or higher"));
        }

        Ok(Self { page, limit })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`; zero when nothing matches.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        total / self.limit + i64::from(total % self.limit != 0)
    }
}

/// One page of results plus the page count for the whole match set.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Accepts `asc`, `des` or `desc`; absent means insertion order.
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, AppError> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") => Ok(None),
            Some("asc") => Ok(Some(SortOrder::Asc)),
            Some("des") | Some("desc") => Ok(Some(SortOrder::Desc)),
            Some(_) => Err(AppError::bad_request("sortBy value should be asc or des")),
        }
    }
}

/// `ILIKE` pattern matching `text` literally anywhere in the column.
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Listing query over `videos`.
#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
    owner: Option<Uuid>,
    published_only: bool,
    title_pattern: Option<String>,
    sort: Option<SortOrder>,
}

impl VideoQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owned_by(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn published_only(mut self) -> Self {
        self.published_only = true;
        self
    }

    /// Blank text matches everything.
    pub fn title_contains(mut self, text: Option<&str>) -> Self {
        self.title_pattern = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(contains_pattern);
        self
    }

    pub fn sorted_by_duration(mut self, order: Option<SortOrder>) -> Self {
        self.sort = order;
        self
    }

    fn filtered(&self) -> videos::BoxedQuery<'static, Pg> {
        let mut query = videos::table.into_boxed();
        if let Some(owner) = self.owner {
            query = query.filter(videos::owner_id.eq(owner));
        }
        if self.published_only {
            query = query.filter(videos::is_published.eq(true));
        }
        if let Some(pattern) = &self.title_pattern {
            query = query.filter(videos::title.ilike(pattern.clone()));
        }
        query
    }

    fn window(&self, page: PageRequest) -> videos::BoxedQuery<'static, Pg> {
        let query = self.filtered();
        let query = match self.sort {
            Some(SortOrder::Asc) => query.order((videos::duration.asc(), videos::created_at.asc())),
            Some(SortOrder::Desc) => {
                query.order((videos::duration.desc(), videos::created_at.asc()))
            }
            None => query.order((videos::created_at.asc(), videos::id.asc())),
        };
        query.offset(page.offset()).limit(page.limit())
    }

    pub async fn load(
        &self,
        conn: &mut AsyncPgConnection,
        page: PageRequest,
    ) -> Result<Paged<Video>, AppError> {
        let total: i64 = self.filtered().count().get_result(conn).await?;
        let items = self
            .window(page)
            .select(Video::as_select())
            .load::<Video>(conn)
            .await?;

        Ok(Paged {
            items,
            total_pages: page.total_pages(total),
        })
    }
}
