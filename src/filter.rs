use std::collections::BTreeMap;

/// FilterState
///
/// What the user asked a table to show: page, page size, free-text search
/// and named field filters. Any change to the search text or a field filter
/// sends the table back to page 1, so a narrowed result set can never leave
/// the user stranded on a page that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    page: u32,
    page_size: u32,
    search: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// with_page
    ///
    /// Moves to page `n` (never below 1). Filters are untouched.
    pub fn with_page(&self, n: u32) -> Self {
        Self {
            page: n.max(1),
            ..self.clone()
        }
    }

    /// with_search
    ///
    /// Replaces the search text and resets to page 1. Blank text clears it.
    pub fn with_search(&self, text: &str) -> Self {
        let trimmed = text.trim();
        Self {
            page: 1,
            search: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..self.clone()
        }
    }

    /// with_search_reset
    ///
    /// Clears the search text and resets to page 1.
    pub fn with_search_reset(&self) -> Self {
        Self {
            page: 1,
            search: None,
            ..self.clone()
        }
    }

    /// with_field
    ///
    /// Sets (or, with an empty value, removes) a field filter and resets to page 1.
    pub fn with_field(&self, name: &str, value: &str) -> Self {
        let mut fields = self.fields.clone();
        if value.is_empty() {
            fields.remove(name);
        } else {
            fields.insert(name.to_string(), value.to_string());
        }
        Self {
            page: 1,
            fields,
            ..self.clone()
        }
    }

    /// Drops every filter and the search text.
    pub fn cleared(&self) -> Self {
        Self::new(self.page_size)
    }

    /// clamped
    ///
    /// Pulls the current page into `[1, total_pages]` once the server has told
    /// us how many pages exist.
    pub fn clamped(&self, total_pages: u32) -> Self {
        Self {
            page: self.page.min(total_pages).max(1),
            ..self.clone()
        }
    }

    /// to_query_params
    ///
    /// `page`, `limit`, `search` (only when non-empty after trimming) and
    /// every active field filter verbatim, in that order.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
        ];

        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                params.push(("search".to_string(), search.to_string()));
            }
        }

        params.extend(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        params
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(20)
    }
}
