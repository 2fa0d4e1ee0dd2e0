use crate::config::DataSourceConfig;
use crate::rki::query::WhereClause;
use crate::rki::response::{MetricsAttributes, NameAttributes, QueryResponse};
use crate::{matching, CaseDataSource, DataSourceError, LookupMode, RegionMetrics};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared_kernel::http_client::HttpClient;
use shared_kernel::non_empty_string;
use shared_kernel::region_name::RegionName;
use url::Url;

non_empty_string!(RegionQuery);

const NAME_FIELD: &str = "GEN";
const METRIC_FIELDS: &str = "GEN,cases,deaths,cases7_per_100k,last_update";

/// Region data of the RKI district feature service (ArcGIS REST `query` endpoint).
pub struct RkiCaseDataSource {
    config: DataSourceConfig,
}

impl RkiCaseDataSource {
    pub fn new(config: DataSourceConfig) -> Self {
        Self { config }
    }

    fn query_url(&self, where_clause: &WhereClause, out_fields: &str) -> anyhow::Result<Url> {
        let host_with_path = format!("{}{}", self.config.host, self.config.query_path);
        Url::parse_with_params(
            &host_with_path,
            &[
                ("where", where_clause.as_ref()),
                ("outFields", out_fields),
                ("returnGeometry", "false"),
                ("outSR", "4326"),
                ("f", "json"),
            ],
        )
        .with_context(|| format!("Failed to parse url {host_with_path}"))
    }

    async fn query<Attributes: DeserializeOwned>(
        &self,
        where_clause: &WhereClause,
        out_fields: &str,
    ) -> Result<Vec<Attributes>, DataSourceError> {
        let url = self.query_url(where_clause, out_fields)?;
        let response =
            HttpClient::get_json::<QueryResponse<Attributes>>(url, self.config.timeout()).await?;
        response.into_attributes()
    }
}

#[async_trait]
impl CaseDataSource for RkiCaseDataSource {
    #[tracing::instrument(err, skip(self), level = "info")]
    async fn fetch_region(&self, region: &RegionName) -> Result<RegionMetrics, DataSourceError> {
        let where_clause = WhereClause::equals(NAME_FIELD, region.as_ref());
        // Several districts can share a name; the first feature wins.
        self.query::<MetricsAttributes>(&where_clause, METRIC_FIELDS)
            .await?
            .into_iter()
            .next()
            .map(RegionMetrics::from)
            .ok_or_else(|| DataSourceError::NoMatch(region.inner()))
    }

    #[tracing::instrument(err, skip(self), level = "info")]
    async fn lookup(
        &self,
        query: &str,
        mode: LookupMode,
    ) -> Result<Vec<RegionName>, DataSourceError> {
        let query = RegionQuery::try_from(query).map_err(DataSourceError::InvalidQuery)?;
        let where_clause = match mode {
            LookupMode::Exact => WhereClause::equals(NAME_FIELD, query.as_ref()),
            LookupMode::Substring => WhereClause::contains(NAME_FIELD, query.as_ref()),
        };
        let names = self
            .query::<NameAttributes>(&where_clause, NAME_FIELD)
            .await?
            .into_iter()
            .map(|attributes| RegionName::from(attributes.name));
        Ok(matching::filter_matches(names, query.as_ref(), mode))
    }
}

pub(crate) mod query {
    /// A `where` expression whose string literals are always quoted and escaped,
    /// so user text can never end the literal early.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct WhereClause(String);

    impl WhereClause {
        pub(crate) fn equals(field: &str, value: &str) -> Self {
            Self(format!("{field} = {}", quote(value)))
        }

        pub(crate) fn contains(field: &str, value: &str) -> Self {
            Self(format!("{field} LIKE {}", quote(&format!("%{value}%"))))
        }
    }

    impl AsRef<str> for WhereClause {
        fn as_ref(&self) -> &str {
            &self.0
        }
    }

    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    #[cfg(test)]
    mod tests {
        use super::WhereClause;

        #[test]
        fn test_equality_quotes_the_value() {
            assert_eq!(WhereClause::equals("GEN", "Berlin").as_ref(), "GEN = 'Berlin'");
        }

        #[test]
        fn test_single_quotes_are_doubled() {
            assert_eq!(
                WhereClause::equals("GEN", "x' OR '1'='1").as_ref(),
                "GEN = 'x'' OR ''1''=''1'"
            );
        }

        #[test]
        fn test_contains_wraps_the_value_in_wildcards() {
            assert_eq!(
                WhereClause::contains("GEN", "Ber'lin").as_ref(),
                "GEN LIKE '%Ber''lin%'"
            );
        }
    }
}

pub(crate) mod response {
    use crate::{DataSourceError, RegionMetrics};
    use serde::Deserialize;
    use shared_kernel::region_name::RegionName;

    /// The service reports failures as a 200 response carrying an `error` object.
    #[derive(Deserialize, Debug)]
    pub(crate) struct QueryResponse<Attributes> {
        features: Option<Vec<Feature<Attributes>>>,
        error: Option<ApiError>,
    }

    #[derive(Deserialize, Debug)]
    struct Feature<Attributes> {
        attributes: Attributes,
    }

    #[derive(Deserialize, Debug)]
    struct ApiError {
        code: i64,
        message: String,
    }

    impl<Attributes> QueryResponse<Attributes> {
        pub(crate) fn into_attributes(self) -> Result<Vec<Attributes>, DataSourceError> {
            if let Some(error) = self.error {
                return Err(DataSourceError::Api {
                    code: error.code,
                    message: error.message,
                });
            }
            let features = self.features.ok_or_else(|| {
                DataSourceError::Request(anyhow::anyhow!("Response has neither features nor error"))
            })?;
            Ok(features
                .into_iter()
                .map(|feature| feature.attributes)
                .collect())
        }
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct NameAttributes {
        #[serde(rename = "GEN")]
        pub(crate) name: String,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct MetricsAttributes {
        #[serde(rename = "GEN")]
        name: String,
        cases: u64,
        deaths: u64,
        cases7_per_100k: Option<f64>,
        last_update: String,
    }

    impl From<MetricsAttributes> for RegionMetrics {
        fn from(attributes: MetricsAttributes) -> Self {
            RegionMetrics {
                name: RegionName::from(attributes.name),
                cases: attributes.cases,
                deaths: attributes.deaths,
                cases7_per_100k: attributes
                    .cases7_per_100k
                    .map(|incidence| (incidence * 10.0).round() / 10.0),
                last_update: attributes.last_update,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RkiCaseDataSource;
    use crate::config::DataSourceConfig;
    use crate::{CaseDataSource, DataSourceError, LookupMode};
    use httpmock::prelude::*;
    use serde_json::json;
    use shared_kernel::region_name::RegionName;

    const QUERY_PATH: &str = "/arcgis/rest/services/RKI_Landkreisdaten/FeatureServer/0/query";

    fn data_source(server: &MockServer) -> RkiCaseDataSource {
        RkiCaseDataSource::new(DataSourceConfig {
            host: server.base_url(),
            query_path: QUERY_PATH.to_string(),
            timeout_secs: 5,
        })
    }

    fn name_features(names: &[&str]) -> serde_json::Value {
        let features = names
            .iter()
            .map(|name| json!({ "attributes": { "GEN": name } }))
            .collect::<Vec<_>>();
        json!({ "features": features })
    }

    #[tokio::test]
    async fn test_fetch_region_decodes_the_first_feature() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(QUERY_PATH)
                    .query_param("where", "GEN = 'Berlin'")
                    .query_param("outFields", "GEN,cases,deaths,cases7_per_100k,last_update")
                    .query_param("returnGeometry", "false")
                    .query_param("outSR", "4326")
                    .query_param("f", "json");
                then.status(200).json_body(json!({
                    "features": [
                        { "attributes": {
                            "GEN": "Berlin",
                            "cases": 120,
                            "deaths": 5,
                            "cases7_per_100k": 35.2671,
                            "last_update": "01.11.2020, 00:00 Uhr"
                        } },
                        { "attributes": {
                            "GEN": "Berlin",
                            "cases": 1,
                            "deaths": 1,
                            "cases7_per_100k": 1.0,
                            "last_update": "01.11.2020, 00:00 Uhr"
                        } }
                    ]
                }));
            })
            .await;

        let metrics = data_source(&server)
            .fetch_region(&RegionName::from("Berlin"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(metrics.name, RegionName::from("Berlin"));
        assert_eq!(metrics.cases, 120);
        assert_eq!(metrics.deaths, 5);
        assert_eq!(metrics.cases7_per_100k, Some(35.3));
        assert_eq!(metrics.last_update, "01.11.2020, 00:00 Uhr");
    }

    #[tokio::test]
    async fn test_region_names_with_quotes_are_escaped() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(QUERY_PATH)
                    .query_param("where", "GEN = 'Land''kreis'");
                then.status(200).json_body(json!({ "features": [] }));
            })
            .await;

        let result = data_source(&server)
            .fetch_region(&RegionName::from("Land'kreis"))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(DataSourceError::NoMatch(name)) if name == "Land'kreis"));
    }

    #[tokio::test]
    async fn test_an_error_object_is_reported_as_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(QUERY_PATH);
                then.status(200).json_body(json!({
                    "error": { "code": 400, "message": "Invalid query parameters.", "details": [] }
                }));
            })
            .await;

        let result = data_source(&server)
            .fetch_region(&RegionName::from("Berlin"))
            .await;

        assert!(matches!(result, Err(DataSourceError::Api { code: 400, .. })));
    }

    #[tokio::test]
    async fn test_missing_attributes_fail_decoding() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(QUERY_PATH);
                then.status(200).json_body(json!({
                    "features": [ { "attributes": { "GEN": "Berlin", "cases": 120 } } ]
                }));
            })
            .await;

        let result = data_source(&server)
            .fetch_region(&RegionName::from("Berlin"))
            .await;

        assert!(matches!(result, Err(DataSourceError::Request(_))));
    }

    #[tokio::test]
    async fn test_substring_lookup_returns_all_candidates() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(QUERY_PATH)
                    .query_param("where", "GEN LIKE '%Berlin%'")
                    .query_param("outFields", "GEN");
                then.status(200)
                    .json_body(name_features(&["Berlin", "Berlin-Mitte", "Berlin"]));
            })
            .await;

        let result = data_source(&server)
            .lookup("Berlin", LookupMode::Substring)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            vec![RegionName::from("Berlin"), RegionName::from("Berlin-Mitte")]
        );
    }

    #[tokio::test]
    async fn test_exact_lookup_returns_the_single_match() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(QUERY_PATH)
                    .query_param("where", "GEN = 'Berlin'");
                then.status(200).json_body(name_features(&["Berlin"]));
            })
            .await;

        let result = data_source(&server).lookup_exact("Berlin").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, RegionName::from("Berlin"));
    }

    #[tokio::test]
    async fn test_lookup_without_matches_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(QUERY_PATH);
                then.status(200).json_body(json!({ "features": [] }));
            })
            .await;

        let source = data_source(&server);
        let result = source.lookup("Atlantis", false.into()).await.unwrap();
        assert!(result.is_empty());

        let exact = source.lookup_exact("Atlantis").await;
        assert!(matches!(exact, Err(DataSourceError::NoMatch(_))));
    }

    #[tokio::test]
    async fn test_blank_queries_are_rejected_before_any_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(QUERY_PATH);
                then.status(200).json_body(json!({ "features": [] }));
            })
            .await;

        let result = data_source(&server)
            .lookup("   ", LookupMode::Substring)
            .await;

        assert!(matches!(result, Err(DataSourceError::InvalidQuery(_))));
        mock.assert_hits_async(0).await;
    }
}
