use std::sync::LazyLock;

use regex::Regex;

use crate::config::ConfigError;
use crate::models::Dimension;

// `arn:aws:<service>:<region>:<account>:<type>:<name>`
static ARN_TYPE_QUALIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^arn:aws:[^:]*:[^:]*:[0-9]*:[^:]*:").expect("valid regex"));
// `arn:aws:<service>:<region>:<account>:<name>`
static ARN_SERVICE_QUALIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^arn:aws:[^:]*:[^:]*:[0-9]*:").expect("valid regex"));
// `arn:aws:<service>:<region>:<account>:<type>/<name>`
static ARN_SLASH_DELIMITED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^arn:aws:[^:]*:[^:]*:[0-9]*:[^:]*/").expect("valid regex"));
// `arn:aws:apigateway:<region>::/apis/<id>/stages/<stage>`
static ARN_HTTP_API_STAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^arn:aws:apigateway:[^:]*::/apis/[^/]*/stages/.*").expect("valid regex")
});

/// How the short resource name is derived from the raw identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArnShape {
    /// Strip through the resource-type segment: `...:function:myFn` -> `myFn`.
    TypeQualified,
    /// No resource-type segment: `...:123456789012:my-topic` -> `my-topic`.
    ServiceQualified,
    /// Name follows a `<type>/` segment: `...:rule/my-rule` -> `my-rule`.
    SlashDelimited,
    /// The identifier already is the name.
    Verbatim,
}

impl ArnShape {
    pub fn short_name(&self, identifier: &str) -> String {
        let pattern = match self {
            ArnShape::TypeQualified => &ARN_TYPE_QUALIFIED,
            ArnShape::ServiceQualified => &ARN_SERVICE_QUALIFIED,
            ArnShape::SlashDelimited => &ARN_SLASH_DELIMITED,
            ArnShape::Verbatim => return identifier.to_string(),
        };
        pattern.replace(identifier, "").into_owned()
    }
}

/// Which value is reported to CloudWatch as the dimension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionValue {
    ShortName,
    Identifier,
}

/// How live resources of a type are listed.
#[derive(Debug, Clone, Copy)]
pub enum Discovery {
    /// Resource Groups Tagging API with server-side tag filters. `exclude`
    /// drops identifiers that share the type filter but are not monitored.
    Tagging { exclude: Option<fn(&str) -> bool> },
    /// API Gateway `GetRestApis`, tags checked client-side.
    RestApis,
}

/// Static description of one resource-type strategy.
#[derive(Debug)]
pub struct Provider {
    pub resource_type: &'static str,
    pub default_namespace: &'static str,
    pub discovery: Discovery,
    pub arn_shape: ArnShape,
    pub dimension_name: &'static str,
    pub dimension_value: DimensionValue,
}

impl Provider {
    pub fn resource_name(&self, identifier: &str) -> String {
        self.arn_shape.short_name(identifier)
    }

    pub fn dimensions(&self, identifier: &str, resource_name: &str) -> Vec<Dimension> {
        let value = match self.dimension_value {
            DimensionValue::ShortName => resource_name,
            DimensionValue::Identifier => identifier,
        };
        vec![Dimension::new(self.dimension_name, value)]
    }

    /// True when the identifier must never be monitored by this strategy.
    pub fn is_excluded(&self, identifier: &str) -> bool {
        match self.discovery {
            Discovery::Tagging { exclude: Some(exclude) } => exclude(identifier),
            _ => false,
        }
    }
}

fn is_http_api_stage(arn: &str) -> bool {
    ARN_HTTP_API_STAGE.is_match(arn)
}

pub static PROVIDERS: &[Provider] = &[
    Provider {
        resource_type: "lambda:function",
        default_namespace: "AWS/Lambda",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::TypeQualified,
        dimension_name: "FunctionName",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "states:stateMachine",
        default_namespace: "AWS/States",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::TypeQualified,
        dimension_name: "StateMachineArn",
        dimension_value: DimensionValue::Identifier,
    },
    Provider {
        resource_type: "sns:topic",
        default_namespace: "AWS/SNS",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::ServiceQualified,
        dimension_name: "TopicName",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "sqs:queue",
        default_namespace: "AWS/SQS",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::ServiceQualified,
        dimension_name: "QueueName",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "events:rule",
        default_namespace: "AWS/Events",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::SlashDelimited,
        dimension_name: "RuleName",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "apigateway:apis",
        default_namespace: "AWS/ApiGateway",
        discovery: Discovery::Tagging {
            exclude: Some(is_http_api_stage),
        },
        arn_shape: ArnShape::SlashDelimited,
        dimension_name: "ApiId",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "scheduler:schedule-group",
        default_namespace: "AWS/Scheduler",
        discovery: Discovery::Tagging { exclude: None },
        arn_shape: ArnShape::SlashDelimited,
        dimension_name: "ScheduleGroup",
        dimension_value: DimensionValue::ShortName,
    },
    Provider {
        resource_type: "apigateway:restapi",
        default_namespace: "AWS/ApiGateway",
        discovery: Discovery::RestApis,
        arn_shape: ArnShape::Verbatim,
        dimension_name: "ApiName",
        dimension_value: DimensionValue::ShortName,
    },
];

/// Resolve the strategy registered for `resource_type`.
pub fn lookup(group: &str, resource_type: &str) -> Result<&'static Provider, ConfigError> {
    PROVIDERS
        .iter()
        .find(|p| p.resource_type == resource_type)
        .ok_or_else(|| ConfigError::UnknownResourceType {
            group: group.to_string(),
            resource_type: resource_type.to_string(),
        })
}
