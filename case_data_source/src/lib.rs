//! Client for the public case-data feature service: current metrics of a
//! region, and region-name lookup.

use async_trait::async_trait;
use shared_kernel::region_name::RegionName;
use thiserror::Error;

pub mod config;
pub mod matching;
pub mod rki;

pub use config::DataSourceConfig;
pub use rki::RkiCaseDataSource;

/// Latest metrics the service reports for a region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMetrics {
    pub name: RegionName,
    pub cases: u64,
    pub deaths: u64,
    /// Seven-day incidence per 100k inhabitants, rounded to one decimal.
    pub cases7_per_100k: Option<f64>,
    /// Opaque timestamp text, only ever displayed.
    pub last_update: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Case-insensitive substring match, used to offer candidates to the user.
    Substring,
    /// Exact name match, used once the user picked a candidate.
    Exact,
}

impl From<bool> for LookupMode {
    fn from(exact: bool) -> Self {
        if exact {
            LookupMode::Exact
        } else {
            LookupMode::Substring
        }
    }
}

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Request to the case data service failed")]
    Request(#[from] anyhow::Error),
    #[error("Case data service answered with error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("No region matches {0:?}")]
    NoMatch(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

#[async_trait]
pub trait CaseDataSource: Send + Sync {
    async fn fetch_region(&self, region: &RegionName) -> Result<RegionMetrics, DataSourceError>;

    /// An empty result is not an error; callers tell the user nothing matched.
    async fn lookup(&self, query: &str, mode: LookupMode)
        -> Result<Vec<RegionName>, DataSourceError>;

    async fn lookup_exact(&self, query: &str) -> Result<RegionName, DataSourceError> {
        self.lookup(query, LookupMode::Exact)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataSourceError::NoMatch(query.to_string()))
    }
}
