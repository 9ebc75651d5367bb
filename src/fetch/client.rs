//! Fetcher configuration

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Value of the `Accept` header
    pub accept: String,

    /// Optional `User-Agent` header
    ///
    /// If not provided, the HTTP client's default is used.
    pub user_agent: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            accept: "application/json".to_string(),
            user_agent: None,
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    pub fn with_accept(mut self, accept: String) -> Self {
        self.accept = accept;
        self
    }
}
