//! Compiler configuration.

/// Default alias prefix; the root table is aliased `t0`.
pub const DEFAULT_ALIAS_PREFIX: &str = "t";

/// Default page size for list queries.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound for list page sizes.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Default ceiling on resolution steps for a single field path.
pub const DEFAULT_MAX_PATH_STEPS: usize = 32;

/// Settings shared by every compilation of a [`QueryBuilder`](super::QueryBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Prefix of generated table aliases.
    pub alias_prefix: String,
    /// Page size used when a request asks for 0.
    pub default_page_size: u32,
    /// Larger page sizes are clamped to this value.
    pub max_page_size: u32,
    /// Maximum segments processed while resolving one path, including
    /// segments spliced in for relation-proxy fields.
    pub max_path_steps: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_path_steps: DEFAULT_MAX_PATH_STEPS,
        }
    }
}

impl CompilerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the alias prefix.
    pub fn alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alias_prefix = prefix.into();
        self
    }

    /// Set the default page size.
    pub fn default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size.
    pub fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the path step ceiling.
    pub fn max_path_steps(mut self, steps: usize) -> Self {
        self.max_path_steps = steps;
        self
    }

    /// Effective page size for a request.
    pub fn page_size(&self, requested: u32) -> u32 {
        let size = if requested == 0 {
            self.default_page_size
        } else {
            requested
        };
        size.clamp(1, self.max_page_size.max(1))
    }

    /// Row offset of a zero-based page.
    pub fn offset(&self, page: u32, page_size: u32) -> u64 {
        u64::from(page) * u64::from(page_size)
    }
}
