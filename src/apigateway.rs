use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_apigateway::Client;

/// A REST API as returned by `GetRestApis`.
#[derive(Debug, Clone, Default)]
pub struct RestApi {
    pub name: String,
    pub tags: HashMap<String, String>,
}

/// Direct listing of API Gateway REST APIs, which the tagging API does not
/// expose by name.
#[async_trait]
pub trait RestApiInventory: Send + Sync {
    async fn list_rest_apis(&self) -> Result<Vec<RestApi>>;
}

pub struct ApiGatewayInventory {
    apigateway: Client,
}

impl ApiGatewayInventory {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            apigateway: Client::new(config),
        }
    }
}

#[async_trait]
impl RestApiInventory for ApiGatewayInventory {
    async fn list_rest_apis(&self) -> Result<Vec<RestApi>> {
        let mut apis = Vec::new();
        let mut position: Option<String> = None;

        loop {
            let response = self
                .apigateway
                .get_rest_apis()
                .limit(500)
                .set_position(position.clone())
                .send()
                .await
                .context("Failed to list REST APIs")?;

            for item in response.items() {
                if let Some(name) = item.name() {
                    apis.push(RestApi {
                        name: name.to_string(),
                        tags: item.tags().cloned().unwrap_or_default(),
                    });
                }
            }

            match response.position() {
                Some(next) if !next.is_empty() => position = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(apis)
    }
}

/// True when every expected tag is present on the resource with the same value.
pub fn contains_tags(actual: &HashMap<String, String>, expected: Option<&BTreeMap<String, String>>) -> bool {
    match expected {
        Some(expected) => expected
            .iter()
            .all(|(key, value)| actual.get(key) == Some(value)),
        None => true,
    }
}
