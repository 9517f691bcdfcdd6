use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_resourcegroupstagging::types::TagFilter;
use aws_sdk_resourcegroupstagging::Client;

/// One page of `GetResources` results.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    pub arns: Vec<String>,
    pub pagination_token: Option<String>,
}

/// Access to the Resource Groups Tagging API.
#[async_trait]
pub trait ResourceTagging: Send + Sync {
    /// Fetch one page of resources of `resource_type` carrying every tag in `tags`.
    async fn get_resources_page(
        &self,
        resource_type: &str,
        tags: &BTreeMap<String, String>,
        pagination_token: Option<&str>,
    ) -> Result<ResourcePage>;
}

pub struct TaggingInventory {
    tagging: Client,
}

impl TaggingInventory {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            tagging: Client::new(config),
        }
    }
}

#[async_trait]
impl ResourceTagging for TaggingInventory {
    async fn get_resources_page(
        &self,
        resource_type: &str,
        tags: &BTreeMap<String, String>,
        pagination_token: Option<&str>,
    ) -> Result<ResourcePage> {
        let mut request = self
            .tagging
            .get_resources()
            .resource_type_filters(resource_type);

        for (key, value) in tags {
            request = request.tag_filters(TagFilter::builder().key(key).values(value).build());
        }

        if let Some(token) = pagination_token {
            request = request.pagination_token(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to get resources of type {resource_type}"))?;

        Ok(ResourcePage {
            arns: response
                .resource_tag_mapping_list()
                .iter()
                .filter_map(|mapping| mapping.resource_arn().map(str::to_string))
                .collect(),
            pagination_token: response.pagination_token().map(str::to_string),
        })
    }
}

/// Query the Resource Groups Tagging API for resources of the given type
/// carrying all of `tags`, keeping ARNs accepted by `predicate`.
///
/// Pages are followed until the API returns an empty token. ARNs keep the
/// order in which the API returned them.
pub async fn get_resources(
    client: &dyn ResourceTagging,
    resource_type: &str,
    tags: &BTreeMap<String, String>,
    predicate: impl Fn(&str) -> bool,
) -> Result<Vec<String>> {
    let mut arns = Vec::new();
    let mut pagination_token: Option<String> = None;

    loop {
        let page = client
            .get_resources_page(resource_type, tags, pagination_token.as_deref())
            .await?;

        arns.extend(page.arns.into_iter().filter(|arn| predicate(arn)));

        match page.pagination_token {
            Some(token) if !token.is_empty() => {
                pagination_token = Some(token);
            }
            _ => break,
        }
    }

    Ok(arns)
}
