use std::collections::BTreeMap;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info};

use crate::apigateway::{self, RestApiInventory};
use crate::config::{self, ResourceConfig};
use crate::filter_resources_by_tags::{self, ResourceTagging};
use crate::providers::{Discovery, Provider};

/// A live resource: the raw identifier returned by AWS and its short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    pub identifier: String,
    pub name: String,
}

/// Backend services used to list resources.
pub struct Inventory<'a> {
    pub tagging: &'a dyn ResourceTagging,
    pub rest_apis: &'a dyn RestApiInventory,
}

/// Accepts a short name when it matches the configured pattern, or always
/// when no pattern is configured.
struct NameFilter(Option<Regex>);

impl NameFilter {
    fn new(group: &str, pattern: Option<&str>) -> Result<Self> {
        let regex = pattern
            .map(|p| config::compile_name_pattern(&format!("resources.{group}"), p))
            .transpose()?;
        Ok(Self(regex))
    }

    fn accepts(&self, name: &str) -> bool {
        self.0.as_ref().map_or(true, |regex| regex.is_match(name))
    }
}

/// List the resources of one resource group, in the order AWS returned them.
pub async fn discover(
    group: &str,
    provider: &Provider,
    resource: &ResourceConfig,
    inventory: &Inventory<'_>,
) -> Result<Vec<DiscoveredResource>> {
    let name_filter = NameFilter::new(group, resource.target_resource_name_pattern.as_deref())?;

    let identifiers = match provider.discovery {
        Discovery::Tagging { .. } => {
            let no_tags = BTreeMap::new();
            let tags = resource.target_resource_tags.as_ref().unwrap_or(&no_tags);
            filter_resources_by_tags::get_resources(
                inventory.tagging,
                provider.resource_type,
                tags,
                |arn| !provider.is_excluded(arn) && name_filter.accepts(&provider.resource_name(arn)),
            )
            .await?
        }
        Discovery::RestApis => inventory
            .rest_apis
            .list_rest_apis()
            .await?
            .into_iter()
            .filter(|api| apigateway::contains_tags(&api.tags, resource.target_resource_tags.as_ref()))
            .map(|api| api.name)
            .filter(|name| name_filter.accepts(&provider.resource_name(name)))
            .collect(),
    };

    let resources: Vec<DiscoveredResource> = identifiers
        .into_iter()
        .map(|identifier| DiscoveredResource {
            name: provider.resource_name(&identifier),
            identifier,
        })
        .collect();

    info!(
        group = %group,
        resource_type = provider.resource_type,
        count = resources.len(),
        "Found monitoring target resources"
    );
    for r in &resources {
        debug!(group = %group, resource = %r.name, identifier = %r.identifier, "Target resource");
    }

    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apigateway::tests::FakeRestApis;
    use crate::apigateway::RestApi;
    use crate::config::ResourceAlarmConfig;
    use crate::filter_resources_by_tags::tests::FakeTagging;
    use crate::providers;
    use std::collections::HashMap;

    fn resource_config(
        resource_type: &str,
        pattern: Option<&str>,
        tags: Option<&[(&str, &str)]>,
    ) -> ResourceConfig {
        ResourceConfig {
            target_resource_type: resource_type.to_string(),
            target_resource_name_pattern: pattern.map(str::to_string),
            target_resource_tags: tags.map(|pairs| {
                pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
            }),
            alarm: ResourceAlarmConfig {
                metrics: vec!["Errors".to_string()],
                ..Default::default()
            },
        }
    }

    fn lambda_arn(name: &str) -> String {
        format!("arn:aws:lambda:ap-northeast-1:123456789012:function:{name}")
    }

    #[tokio::test]
    async fn test_name_pattern_matches_short_name() {
        let arns: Vec<String> = ["test-red-dog-1", "test-blue-cat-2", "test-green-bird-3"]
            .iter()
            .map(|n| lambda_arn(n))
            .collect();
        let tagging = FakeTagging::with_pages(vec![arns.iter().map(String::as_str).collect()]);
        let rest_apis = FakeRestApis(vec![]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };

        let provider = providers::lookup("fn", "lambda:function").unwrap();
        let resource = resource_config("lambda:function", Some("^test-(red|blue)-(bird|cat)"), None);

        let found = discover("fn", provider, &resource, &inventory).await.unwrap();

        assert_eq!(
            found,
            vec![DiscoveredResource {
                identifier: lambda_arn("test-blue-cat-2"),
                name: "test-blue-cat-2".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_tags_are_sent_as_filters() {
        let tagging = FakeTagging::with_pages(vec![vec!["arn:aws:sqs:us-east-1:123456789012:jobs"]]);
        let rest_apis = FakeRestApis(vec![]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };

        let provider = providers::lookup("q", "sqs:queue").unwrap();
        let resource = resource_config("sqs:queue", None, Some(&[("env", "prod"), ("team", "core")]));

        let found = discover("q", provider, &resource, &inventory).await.unwrap();
        assert_eq!(found[0].name, "jobs");

        let requests = tagging.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "sqs:queue");
        assert_eq!(requests[0].1.len(), 2);
        assert_eq!(requests[0].1["team"], "core");
    }

    #[tokio::test]
    async fn test_stage_exclusion_wins_over_pattern() {
        let tagging = FakeTagging::with_pages(vec![vec![
            "arn:aws:apigateway:ap-northeast-1::/apis/abc123",
            "arn:aws:apigateway:ap-northeast-1::/apis/abc123/stages/$default",
            "arn:aws:apigateway:ap-northeast-1::/apis/xyz789",
        ]]);
        let rest_apis = FakeRestApis(vec![]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };
        let provider = providers::lookup("http", "apigateway:apis").unwrap();

        let all = discover("http", provider, &resource_config("apigateway:apis", None, None), &inventory)
            .await
            .unwrap();
        let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["abc123", "xyz789"]);

        // `.*` would accept the stage ARN's short name; the exclusion still applies
        let tagging = FakeTagging::with_pages(vec![vec![
            "arn:aws:apigateway:ap-northeast-1::/apis/abc123/stages/$default",
        ]]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };
        let none = discover("http", provider, &resource_config("apigateway:apis", Some(".*"), None), &inventory)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_rest_apis_filtered_by_tag_containment() {
        let tagging = FakeTagging::default();
        let rest_apis = FakeRestApis(vec![
            RestApi {
                name: "orders".to_string(),
                tags: HashMap::from([
                    ("env".to_string(), "prod".to_string()),
                    ("team".to_string(), "shop".to_string()),
                ]),
            },
            RestApi {
                name: "legacy".to_string(),
                tags: HashMap::new(),
            },
            RestApi {
                name: "payments".to_string(),
                tags: HashMap::from([("env".to_string(), "prod".to_string())]),
            },
        ]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };
        let provider = providers::lookup("rest", "apigateway:restapi").unwrap();

        let found = discover(
            "rest",
            provider,
            &resource_config("apigateway:restapi", None, Some(&[("env", "prod")])),
            &inventory,
        )
        .await
        .unwrap();
        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["orders", "payments"]);

        let found = discover(
            "rest",
            provider,
            &resource_config("apigateway:restapi", Some("pay"), None),
            &inventory,
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identifier, "payments");

        // never touches the tagging API
        assert!(tagging.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let tagging = FakeTagging::with_pages(vec![vec![]]);
        let rest_apis = FakeRestApis(vec![]);
        let inventory = Inventory { tagging: &tagging, rest_apis: &rest_apis };
        let provider = providers::lookup("t", "sns:topic").unwrap();

        let found = discover("t", provider, &resource_config("sns:topic", Some("nothing"), None), &inventory)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
