//! Run configuration: connection settings and milestone ladders.
//!
//! Command-line values win over the environment; `.env` is loaded by the
//! binary before this runs. Ladders can be retuned without a rebuild through a
//! JSON file:
//!
//! ```json
//! {
//!   "coarse":   [{"lower": 0, "label": "low"}, {"lower": 5000, "label": "high"}],
//!   "detailed": [{"lower": 0, "label": "0-1k"}, {"lower": 1000, "label": "1k+"}]
//! }
//! ```
//!
//! Either key may be omitted to keep that ladder's defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::Ga4Settings;
use crate::error::{AnalyticsError, Result};
use crate::milestone::{Ladder, MilestoneClassifier, Rung};

pub const DEFAULT_SLEEP_SECS: u64 = 10;

/// Ladder overrides as stored on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LadderFile {
    pub coarse: Option<Vec<Rung>>,
    pub detailed: Option<Vec<Rung>>,
}

impl LadderFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::Config(format!("cannot read ladder file {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Validates the overrides and fills gaps with the default ladders.
    pub fn into_classifier(self) -> Result<MilestoneClassifier> {
        let coarse = match self.coarse {
            Some(rungs) => Ladder::new("coarse", rungs)?,
            None => Ladder::coarse(),
        };
        let detailed = match self.detailed {
            Some(rungs) => Ladder::new("detailed", rungs)?,
            None => Ladder::detailed(),
        };
        Ok(MilestoneClassifier::new(coarse, detailed))
    }
}

/// Builds the classifier from an optional ladder file.
pub fn load_classifier(path: Option<&Path>) -> Result<MilestoneClassifier> {
    match path {
        Some(path) => LadderFile::load(path)?.into_classifier(),
        None => Ok(MilestoneClassifier::default()),
    }
}

/// Options shared by every command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsArgs {
    pub property_id: Option<String>,
    pub credentials: Option<PathBuf>,
    pub site_prefix: Option<String>,
    pub sleep_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub property_id: String,
    pub sleep: Duration,
    pub ga4: Ga4Settings,
}

impl Settings {
    /// Resolves settings from arguments, falling back to process environment variables.
    pub fn resolve(args: SettingsArgs) -> Result<Self> {
        Self::resolve_with(args, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::resolve`] with an explicit variable lookup.
    pub fn resolve_with(args: SettingsArgs, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let property_id = args
            .property_id
            .or_else(|| var("GA4_PROPERTY_ID"))
            .ok_or_else(|| {
                AnalyticsError::Config("missing property id: pass --property-id or set GA4_PROPERTY_ID".into())
            })?;

        let sleep_secs = match args.sleep_secs {
            Some(secs) => secs,
            None => match var("GA4_SLEEP_SECS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    AnalyticsError::Config(format!("GA4_SLEEP_SECS '{raw}' is not a whole number of seconds"))
                })?,
                None => DEFAULT_SLEEP_SECS,
            },
        };

        let defaults = Ga4Settings::default();
        let ga4 = Ga4Settings {
            api_base_url: var("GA4_API_BASE_URL").unwrap_or(defaults.api_base_url),
            token_url: var("GA4_TOKEN_URL").unwrap_or(defaults.token_url),
            access_token: var("GA4_ACCESS_TOKEN"),
            credentials_path: args
                .credentials
                .or_else(|| var("GA4_CREDENTIALS").map(PathBuf::from)),
            site_prefix: args.site_prefix.or_else(|| var("GA4_SITE_PREFIX")),
        };

        Ok(Self {
            property_id,
            sleep: Duration::from_secs(sleep_secs),
            ga4,
        })
    }
}
