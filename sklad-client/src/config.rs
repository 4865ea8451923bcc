//! Client configuration

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.moysklad.ru/api/remap/1.2";

/// Page size for plain listings (upstream maximum)
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Upstream caps pages at 100 rows whenever `expand` is present
pub const EXPANDED_PAGE_LIMIT: u32 = 100;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the lightweight credential check
pub const VALIDATE_TIMEOUT_SECS: u64 = 10;

/// Client configuration for connecting to the upstream API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root (e.g., "https://api.moysklad.ru/api/remap/1.2")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Page size for listings without expansion
    pub page_limit: u32,

    /// User agent sent with every request
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
            page_limit: DEFAULT_PAGE_LIMIT,
            user_agent: concat!("sklad-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the request timeout (seconds)
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the listing page size
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit.clamp(1, DEFAULT_PAGE_LIMIT);
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// How much nested data a listing should inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expand {
    /// Bare documents, largest pages
    #[default]
    None,
    /// Inline state and point-of-sale references
    Refs,
    /// Refs plus positions with their assortment (avoids N+1 follow-ups)
    Positions,
}

impl Expand {
    /// Value of the `expand` query parameter
    pub fn param(&self) -> Option<&'static str> {
        match self {
            Expand::None => None,
            Expand::Refs => Some("state,retailStore"),
            Expand::Positions => Some("positions,positions.assortment,state,retailStore"),
        }
    }

    /// Effective page size for this expansion level
    pub fn page_limit(&self, config: &ClientConfig) -> u32 {
        match self {
            Expand::None => config.page_limit,
            _ => config.page_limit.min(EXPANDED_PAGE_LIMIT),
        }
    }
}
