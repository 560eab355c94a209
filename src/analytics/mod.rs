//! The analytics reporting API as seen by the batch drivers.

mod ga4;

pub use ga4::{Ga4Client, Ga4Settings};

use async_trait::async_trait;

use crate::error::Result;
use crate::window::DateWindow;

/// Number of URL characters kept when deriving a page-path pattern.
pub const PATTERN_PREFIX_CHARS: usize = 40;

/// Abstraction over anything that can count users for a URL in a window.
///
/// Implementations own authentication, credential loading, and transport;
/// every failure is reported as [`AnalyticsError::UpstreamFailure`](crate::error::AnalyticsError::UpstreamFailure).
#[async_trait]
pub trait UserCountSource: Send + Sync {
    /// Total users who visited `url` within `window`.
    ///
    /// `custom_regex` replaces the pattern that would otherwise be derived
    /// from the URL.
    async fn get_user_count(
        &self,
        property_id: &str,
        url: &str,
        window: &DateWindow,
        custom_regex: Option<&str>,
    ) -> Result<u64>;
}

/// Builds the partial-match regex used to find a URL in the `pagePath` dimension.
///
/// Strips `site_prefix` when the URL starts with it, keeps the first
/// [`PATTERN_PREFIX_CHARS`] characters, and escapes regex metacharacters.
pub fn page_path_pattern(url: &str, site_prefix: Option<&str>) -> String {
    let path = site_prefix
        .filter(|prefix| !prefix.is_empty())
        .and_then(|prefix| url.strip_prefix(prefix))
        .unwrap_or(url);
    let truncated: String = path.chars().take(PATTERN_PREFIX_CHARS).collect();
    regex::escape(&truncated)
}
