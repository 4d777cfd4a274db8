//! Query string assembly for list endpoints.
//!
//! Only parameters that are set (and, for numbers, positive) are emitted.
//! Repeated filters (`suffix`, `run`) are emitted once per value.

use url::Url;

/// Pagination and filtering shared by dataset and document listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
    /// Sort field, e.g. `create_time`.
    pub orderby: Option<String>,
    /// Descending sort.
    pub desc: Option<bool>,
    /// Exact id filter.
    pub id: Option<String>,
    /// Exact name filter.
    pub name: Option<String>,
    /// Free-text keyword filter.
    pub keywords: Option<String>,
}

impl PageQuery {
    /// Starts an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn orderby(mut self, field: impl Into<String>) -> Self {
        self.orderby = Some(field.into());
        self
    }

    #[must_use]
    pub fn desc(mut self, desc: bool) -> Self {
        self.desc = Some(desc);
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Appends the set parameters to `url`.
    pub fn apply_to(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.append_pair("page", &page.to_string());
        }
        if let Some(page_size) = self.page_size.filter(|p| *p > 0) {
            pairs.append_pair("page_size", &page_size.to_string());
        }
        if let Some(orderby) = &self.orderby {
            pairs.append_pair("orderby", orderby);
        }
        if let Some(desc) = self.desc {
            pairs.append_pair("desc", if desc { "true" } else { "false" });
        }
        if let Some(id) = &self.id {
            pairs.append_pair("id", id);
        }
        if let Some(name) = &self.name {
            pairs.append_pair("name", name);
        }
        if let Some(keywords) = &self.keywords {
            pairs.append_pair("keywords", keywords);
        }
        drop(pairs);
        strip_empty_query(url);
    }
}

/// Document listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Shared pagination filters.
    pub page: PageQuery,
    /// Lower bound on creation time (Unix millis).
    pub create_time_from: Option<i64>,
    /// Upper bound on creation time (Unix millis).
    pub create_time_to: Option<i64>,
    /// File suffixes to include, e.g. `pdf`.
    pub suffix: Vec<String>,
    /// Parsing states to include, e.g. `DONE`.
    pub run: Vec<String>,
}

impl DocumentQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the pagination part.
    #[must_use]
    pub fn with_page(mut self, page: PageQuery) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn create_time_from(mut self, millis: i64) -> Self {
        self.create_time_from = Some(millis);
        self
    }

    #[must_use]
    pub fn create_time_to(mut self, millis: i64) -> Self {
        self.create_time_to = Some(millis);
        self
    }

    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix.push(suffix.into());
        self
    }

    #[must_use]
    pub fn run(mut self, run: impl Into<String>) -> Self {
        self.run.push(run.into());
        self
    }

    /// Query that selects a single document by id.
    #[must_use]
    pub fn by_id(document_id: impl Into<String>) -> Self {
        Self::new().with_page(PageQuery::new().id(document_id))
    }

    /// Appends the set parameters to `url`.
    pub fn apply_to(&self, url: &mut Url) {
        self.page.apply_to(url);
        let mut pairs = url.query_pairs_mut();
        if let Some(from) = self.create_time_from.filter(|t| *t > 0) {
            pairs.append_pair("create_time_from", &from.to_string());
        }
        if let Some(to) = self.create_time_to.filter(|t| *t > 0) {
            pairs.append_pair("create_time_to", &to.to_string());
        }
        for suffix in &self.suffix {
            pairs.append_pair("suffix", suffix);
        }
        for run in &self.run {
            pairs.append_pair("run", run);
        }
        drop(pairs);
        strip_empty_query(url);
    }
}

// `query_pairs_mut` leaves a dangling `?` when nothing was appended.
fn strip_empty_query(url: &mut Url) {
    if url.query() == Some("") {
        url.set_query(None);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost/api/v1/datasets").unwrap()
    }

    #[test]
    fn test_empty_query_leaves_url_untouched() {
        let mut url = base();
        PageQuery::new().apply_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/api/v1/datasets");
    }

    #[test]
    fn test_page_query_emits_set_params_in_order() {
        let mut url = base();
        PageQuery::new()
            .page(2)
            .page_size(30)
            .orderby("create_time")
            .desc(true)
            .name("hand book")
            .apply_to(&mut url);
        assert_eq!(
            url.query(),
            Some("page=2&page_size=30&orderby=create_time&desc=true&name=hand+book")
        );
    }

    #[test]
    fn test_non_positive_numbers_are_skipped() {
        let mut url = base();
        PageQuery::new().page(0).page_size(0).apply_to(&mut url);
        assert_eq!(url.query(), None);

        let mut url = base();
        DocumentQuery::new()
            .create_time_from(0)
            .create_time_to(-1)
            .apply_to(&mut url);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_document_query_repeats_suffix_and_run() {
        let mut url = base();
        DocumentQuery::new()
            .with_page(PageQuery::new().keywords("q3"))
            .create_time_from(1_700_000_000_000)
            .suffix("pdf")
            .suffix("docx")
            .run("DONE")
            .run("FAIL")
            .apply_to(&mut url);
        assert_eq!(
            url.query(),
            Some(
                "keywords=q3&create_time_from=1700000000000&suffix=pdf&suffix=docx&run=DONE&run=FAIL"
            )
        );
    }

    #[test]
    fn test_by_id_selects_single_document() {
        let mut url = base();
        DocumentQuery::by_id("doc1").apply_to(&mut url);
        assert_eq!(url.query(), Some("id=doc1"));
    }
}
