//! Resource catalog: supported resource kinds, their canonical Terraform
//! type names, per-kind property schemas, the categorizer that assigns a
//! kind to a raw type string, and the output-significance table used by the
//! code generator.
//!
//! Schemas are served by an explicitly constructed [`SchemaProvider`] that
//! callers pass where needed; there is no process-wide schema state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Enumerated catalog of supported resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    SecurityGroup,
    InternetGateway,
    RouteTable,
    Instance,
    LoadBalancer,
    S3Bucket,
    IamRole,
    LambdaFunction,
    DbInstance,
    ApiGateway,
    DynamoTable,
    SqsQueue,
    Module,
    Unknown,
}

/// Closed icon tag set; display assets resolve through this static mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconTag {
    Network,
    Compute,
    Storage,
    Database,
    Security,
    Identity,
    Integration,
    Generic,
}

impl IconTag {
    pub fn asset_name(self) -> &'static str {
        match self {
            IconTag::Network => "icons/network.svg",
            IconTag::Compute => "icons/compute.svg",
            IconTag::Storage => "icons/storage.svg",
            IconTag::Database => "icons/database.svg",
            IconTag::Security => "icons/security.svg",
            IconTag::Identity => "icons/identity.svg",
            IconTag::Integration => "icons/integration.svg",
            IconTag::Generic => "icons/generic.svg",
        }
    }
}

impl ResourceKind {
    /// Canonical Terraform type name for this kind.
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "aws_vpc",
            ResourceKind::Subnet => "aws_subnet",
            ResourceKind::SecurityGroup => "aws_security_group",
            ResourceKind::InternetGateway => "aws_internet_gateway",
            ResourceKind::RouteTable => "aws_route_table",
            ResourceKind::Instance => "aws_instance",
            ResourceKind::LoadBalancer => "aws_lb",
            ResourceKind::S3Bucket => "aws_s3_bucket",
            ResourceKind::IamRole => "aws_iam_role",
            ResourceKind::LambdaFunction => "aws_lambda_function",
            ResourceKind::DbInstance => "aws_db_instance",
            ResourceKind::ApiGateway => "aws_apigatewayv2_api",
            ResourceKind::DynamoTable => "aws_dynamodb_table",
            ResourceKind::SqsQueue => "aws_sqs_queue",
            ResourceKind::Module => "module",
            ResourceKind::Unknown => "",
        }
    }

    /// Human display name shown on the canvas.
    pub fn display_name(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "VPC",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::SecurityGroup => "Security Group",
            ResourceKind::InternetGateway => "Internet Gateway",
            ResourceKind::RouteTable => "Route Table",
            ResourceKind::Instance => "EC2 Instance",
            ResourceKind::LoadBalancer => "Load Balancer",
            ResourceKind::S3Bucket => "S3 Bucket",
            ResourceKind::IamRole => "IAM Role",
            ResourceKind::LambdaFunction => "Lambda Function",
            ResourceKind::DbInstance => "RDS Instance",
            ResourceKind::ApiGateway => "API Gateway",
            ResourceKind::DynamoTable => "DynamoDB Table",
            ResourceKind::SqsQueue => "SQS Queue",
            ResourceKind::Module => "Module",
            ResourceKind::Unknown => "Resource",
        }
    }

    /// Short description used as the node's display blurb.
    pub fn description(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "Isolated virtual network",
            ResourceKind::Subnet => "Network segment within a VPC",
            ResourceKind::SecurityGroup => "Stateful traffic rules",
            ResourceKind::InternetGateway => "VPC internet access",
            ResourceKind::RouteTable => "Network routing rules",
            ResourceKind::Instance => "Virtual machine",
            ResourceKind::LoadBalancer => "Distributes incoming traffic",
            ResourceKind::S3Bucket => "Object storage bucket",
            ResourceKind::IamRole => "Assumable permission set",
            ResourceKind::LambdaFunction => "Serverless function",
            ResourceKind::DbInstance => "Managed relational database",
            ResourceKind::ApiGateway => "HTTP API front door",
            ResourceKind::DynamoTable => "Managed key-value table",
            ResourceKind::SqsQueue => "Message queue",
            ResourceKind::Module => "Reusable configuration module",
            ResourceKind::Unknown => "Unrecognized resource",
        }
    }

    /// Token used for generic `<token>_id` / `<token>_arn` reference
    /// patterns and icon grouping.
    pub fn short_token(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::InternetGateway => "internet_gateway",
            ResourceKind::RouteTable => "route_table",
            ResourceKind::Instance => "instance",
            ResourceKind::LoadBalancer => "lb",
            ResourceKind::S3Bucket => "bucket",
            ResourceKind::IamRole => "role",
            ResourceKind::LambdaFunction => "function",
            ResourceKind::DbInstance => "db",
            ResourceKind::ApiGateway => "api",
            ResourceKind::DynamoTable => "table",
            ResourceKind::SqsQueue => "queue",
            ResourceKind::Module => "module",
            ResourceKind::Unknown => "resource",
        }
    }

    pub fn icon(self) -> IconTag {
        match self {
            ResourceKind::Vpc
            | ResourceKind::Subnet
            | ResourceKind::InternetGateway
            | ResourceKind::RouteTable
            | ResourceKind::LoadBalancer => IconTag::Network,
            ResourceKind::Instance | ResourceKind::LambdaFunction => IconTag::Compute,
            ResourceKind::S3Bucket => IconTag::Storage,
            ResourceKind::DbInstance | ResourceKind::DynamoTable => IconTag::Database,
            ResourceKind::SecurityGroup => IconTag::Security,
            ResourceKind::IamRole => IconTag::Identity,
            ResourceKind::ApiGateway | ResourceKind::SqsQueue => IconTag::Integration,
            ResourceKind::Module | ResourceKind::Unknown => IconTag::Generic,
        }
    }
}

/// Declared value type of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Str,
    Number,
    Bool,
    List,
    Map,
}

/// One property in a resource kind's schema.
#[derive(Debug, Clone, Copy)]
pub struct PropertySchema {
    pub name: &'static str,
    pub required: bool,
    pub value_type: PropertyType,
    pub default: Option<&'static str>,
}

const fn prop(
    name: &'static str,
    required: bool,
    value_type: PropertyType,
    default: Option<&'static str>,
) -> PropertySchema {
    PropertySchema {
        name,
        required,
        value_type,
        default,
    }
}

use PropertyType::{Bool, List, Map, Number, Str};

static VPC_SCHEMA: &[PropertySchema] = &[
    prop("cidr_block", true, Str, Some("10.0.0.0/16")),
    prop("enable_dns_support", false, Bool, Some("true")),
    prop("enable_dns_hostnames", false, Bool, None),
    prop("tags", false, Map, None),
];

static SUBNET_SCHEMA: &[PropertySchema] = &[
    prop("vpc_id", true, Str, None),
    prop("cidr_block", true, Str, Some("10.0.1.0/24")),
    prop("availability_zone", false, Str, None),
    prop("map_public_ip_on_launch", false, Bool, None),
    prop("tags", false, Map, None),
];

static SECURITY_GROUP_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("description", false, Str, None),
    prop("vpc_id", false, Str, None),
    prop("tags", false, Map, None),
];

static INTERNET_GATEWAY_SCHEMA: &[PropertySchema] = &[
    prop("vpc_id", true, Str, None),
    prop("tags", false, Map, None),
];

static ROUTE_TABLE_SCHEMA: &[PropertySchema] = &[
    prop("vpc_id", true, Str, None),
    prop("tags", false, Map, None),
];

static INSTANCE_SCHEMA: &[PropertySchema] = &[
    prop("ami", true, Str, Some("ami-0c55b159cbfafe1f0")),
    prop("instance_type", true, Str, Some("t2.micro")),
    prop("subnet_id", false, Str, None),
    prop("vpc_security_group_ids", false, List, None),
    prop("key_name", false, Str, None),
    prop("tags", false, Map, None),
];

static LOAD_BALANCER_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("internal", false, Bool, Some("false")),
    prop("load_balancer_type", false, Str, Some("application")),
    prop("subnets", false, List, None),
    prop("security_groups", false, List, None),
    prop("tags", false, Map, None),
];

static S3_BUCKET_SCHEMA: &[PropertySchema] = &[
    prop("bucket", true, Str, None),
    prop("force_destroy", false, Bool, Some("false")),
    prop("tags", false, Map, None),
];

static IAM_ROLE_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("assume_role_policy", true, Str, None),
    prop("description", false, Str, None),
    prop("tags", false, Map, None),
];

static LAMBDA_FUNCTION_SCHEMA: &[PropertySchema] = &[
    prop("function_name", true, Str, None),
    prop("runtime", false, Str, Some("nodejs18.x")),
    prop("handler", false, Str, Some("index.handler")),
    prop("role", false, Str, None),
    prop("filename", false, Str, None),
    prop("memory_size", false, Number, None),
    prop("tags", false, Map, None),
];

static DB_INSTANCE_SCHEMA: &[PropertySchema] = &[
    prop("identifier", true, Str, None),
    prop("engine", true, Str, Some("postgres")),
    prop("instance_class", true, Str, Some("db.t3.micro")),
    prop("allocated_storage", false, Number, Some("20")),
    prop("username", false, Str, None),
    prop("password", false, Str, None),
    prop("skip_final_snapshot", false, Bool, Some("true")),
    prop("vpc_security_group_ids", false, List, None),
    prop("db_subnet_group_name", false, Str, None),
    prop("tags", false, Map, None),
];

static API_GATEWAY_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("protocol_type", true, Str, Some("HTTP")),
    prop("description", false, Str, None),
    prop("tags", false, Map, None),
];

static DYNAMO_TABLE_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("billing_mode", false, Str, Some("PAY_PER_REQUEST")),
    prop("hash_key", true, Str, None),
    prop("tags", false, Map, None),
];

static SQS_QUEUE_SCHEMA: &[PropertySchema] = &[
    prop("name", true, Str, None),
    prop("delay_seconds", false, Number, None),
    prop("visibility_timeout_seconds", false, Number, None),
    prop("tags", false, Map, None),
];

static MODULE_SCHEMA: &[PropertySchema] = &[prop("source", true, Str, None)];

/// Serves resource schemas, kind categorization, reference heuristics and
/// output significance. Construct once and pass by reference.
#[derive(Debug, Clone)]
pub struct SchemaProvider {
    schemas: HashMap<ResourceKind, &'static [PropertySchema]>,
}

impl SchemaProvider {
    pub fn new() -> Self {
        let mut schemas: HashMap<ResourceKind, &'static [PropertySchema]> = HashMap::new();
        schemas.insert(ResourceKind::Vpc, VPC_SCHEMA);
        schemas.insert(ResourceKind::Subnet, SUBNET_SCHEMA);
        schemas.insert(ResourceKind::SecurityGroup, SECURITY_GROUP_SCHEMA);
        schemas.insert(ResourceKind::InternetGateway, INTERNET_GATEWAY_SCHEMA);
        schemas.insert(ResourceKind::RouteTable, ROUTE_TABLE_SCHEMA);
        schemas.insert(ResourceKind::Instance, INSTANCE_SCHEMA);
        schemas.insert(ResourceKind::LoadBalancer, LOAD_BALANCER_SCHEMA);
        schemas.insert(ResourceKind::S3Bucket, S3_BUCKET_SCHEMA);
        schemas.insert(ResourceKind::IamRole, IAM_ROLE_SCHEMA);
        schemas.insert(ResourceKind::LambdaFunction, LAMBDA_FUNCTION_SCHEMA);
        schemas.insert(ResourceKind::DbInstance, DB_INSTANCE_SCHEMA);
        schemas.insert(ResourceKind::ApiGateway, API_GATEWAY_SCHEMA);
        schemas.insert(ResourceKind::DynamoTable, DYNAMO_TABLE_SCHEMA);
        schemas.insert(ResourceKind::SqsQueue, SQS_QUEUE_SCHEMA);
        schemas.insert(ResourceKind::Module, MODULE_SCHEMA);
        Self { schemas }
    }

    /// Property schema for a kind. None is a schema lookup miss and means
    /// "no declared properties", never an error.
    pub fn properties(&self, kind: ResourceKind) -> Option<&'static [PropertySchema]> {
        self.schemas.get(&kind).copied()
    }

    /// Assign a catalog kind to a raw type string: exact canonical names
    /// first, then substring patterns, Unknown as the last resort.
    pub fn categorize(&self, type_name: &str) -> ResourceKind {
        match type_name {
            "aws_vpc" => return ResourceKind::Vpc,
            "aws_subnet" => return ResourceKind::Subnet,
            "aws_security_group" => return ResourceKind::SecurityGroup,
            "aws_internet_gateway" => return ResourceKind::InternetGateway,
            "aws_route_table" => return ResourceKind::RouteTable,
            "aws_instance" => return ResourceKind::Instance,
            "aws_lb" | "aws_alb" | "aws_elb" => return ResourceKind::LoadBalancer,
            "aws_s3_bucket" => return ResourceKind::S3Bucket,
            "aws_iam_role" => return ResourceKind::IamRole,
            "aws_lambda_function" => return ResourceKind::LambdaFunction,
            "aws_db_instance" | "aws_rds_cluster" => return ResourceKind::DbInstance,
            "aws_apigatewayv2_api" | "aws_api_gateway_rest_api" => return ResourceKind::ApiGateway,
            "aws_dynamodb_table" => return ResourceKind::DynamoTable,
            "aws_sqs_queue" => return ResourceKind::SqsQueue,
            "module" => return ResourceKind::Module,
            _ => {}
        }
        if type_name.contains("security_group") {
            ResourceKind::SecurityGroup
        } else if type_name.contains("internet_gateway") {
            ResourceKind::InternetGateway
        } else if type_name.contains("route_table") {
            ResourceKind::RouteTable
        } else if type_name.contains("subnet") {
            ResourceKind::Subnet
        } else if type_name.contains("vpc") {
            ResourceKind::Vpc
        } else if type_name.contains("lambda") {
            ResourceKind::LambdaFunction
        } else if type_name.contains("db_") || type_name.contains("rds") {
            ResourceKind::DbInstance
        } else if type_name.contains("s3") || type_name.contains("bucket") {
            ResourceKind::S3Bucket
        } else if type_name.contains("iam_role") || type_name.contains("role") {
            ResourceKind::IamRole
        } else if type_name.contains("load_balancer") || type_name.contains("_lb") {
            ResourceKind::LoadBalancer
        } else if type_name.contains("api_gateway") || type_name.contains("apigateway") {
            ResourceKind::ApiGateway
        } else if type_name.contains("dynamodb") {
            ResourceKind::DynamoTable
        } else if type_name.contains("sqs") || type_name.contains("queue") {
            ResourceKind::SqsQueue
        } else if type_name.contains("instance") {
            ResourceKind::Instance
        } else {
            ResourceKind::Unknown
        }
    }

    /// Target-property name patterns that can hold a reference to a source
    /// of the given kind, most specific first, then the generic
    /// `<token>_id` / `<token>_arn` fallbacks.
    pub fn reference_patterns(&self, source_kind: ResourceKind) -> Vec<String> {
        let specific: &[&str] = match source_kind {
            ResourceKind::Vpc => &["vpc_id"],
            ResourceKind::Subnet => &["subnet_id", "subnet_ids", "subnets"],
            ResourceKind::SecurityGroup => &[
                "vpc_security_group_ids",
                "security_group_ids",
                "security_groups",
            ],
            ResourceKind::InternetGateway => &["gateway_id", "internet_gateway_id"],
            ResourceKind::RouteTable => &["route_table_id"],
            ResourceKind::Instance => &["instance_id", "target_id"],
            ResourceKind::LoadBalancer => &["load_balancer_arn", "lb_arn"],
            ResourceKind::S3Bucket => &["bucket", "s3_bucket"],
            ResourceKind::IamRole => &["role", "role_arn", "iam_role_arn"],
            ResourceKind::LambdaFunction => &["function_name", "lambda_function_arn"],
            ResourceKind::DbInstance => &["db_instance_identifier"],
            ResourceKind::ApiGateway => &["api_id", "rest_api_id"],
            ResourceKind::DynamoTable => &["table_name", "table_arn"],
            ResourceKind::SqsQueue => &["queue_url", "queue_name"],
            ResourceKind::Module | ResourceKind::Unknown => &[],
        };
        let token = source_kind.short_token();
        let mut patterns: Vec<String> = specific.iter().map(|p| p.to_string()).collect();
        patterns.push(format!("{}_id", token));
        patterns.push(format!("{}_arn", token));
        patterns
    }

    /// Which attribute to read off the source, keyed on the matched target
    /// property's own name.
    pub fn attribute_for_property(&self, property_name: &str) -> &'static str {
        if property_name == "role" {
            return "arn";
        }
        if property_name == "bucket" || property_name == "s3_bucket" {
            return "bucket";
        }
        if property_name == "arn" || property_name.ends_with("_arn") {
            return "arn";
        }
        if property_name == "name" || property_name.ends_with("_name") {
            return "name";
        }
        "id"
    }

    /// Attribute exported as an output block for significant kinds.
    pub fn output_export(&self, kind: ResourceKind) -> Option<&'static str> {
        match kind {
            ResourceKind::LoadBalancer => Some("dns_name"),
            ResourceKind::Instance => Some("public_ip"),
            ResourceKind::DbInstance => Some("endpoint"),
            ResourceKind::LambdaFunction => Some("function_name"),
            ResourceKind::ApiGateway => Some("api_endpoint"),
            _ => None,
        }
    }
}

impl Default for SchemaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_exact_names() {
        let provider = SchemaProvider::new();
        assert_eq!(provider.categorize("aws_vpc"), ResourceKind::Vpc);
        assert_eq!(provider.categorize("aws_subnet"), ResourceKind::Subnet);
        assert_eq!(provider.categorize("aws_lb"), ResourceKind::LoadBalancer);
        assert_eq!(provider.categorize("module"), ResourceKind::Module);
    }

    #[test]
    fn test_categorize_patterns() {
        let provider = SchemaProvider::new();
        assert_eq!(
            provider.categorize("aws_default_security_group"),
            ResourceKind::SecurityGroup
        );
        assert_eq!(
            provider.categorize("aws_db_subnet_group"),
            ResourceKind::Subnet
        );
        assert_eq!(provider.categorize("google_thing"), ResourceKind::Unknown);
    }

    #[test]
    fn test_schema_lookup_miss_is_none() {
        let provider = SchemaProvider::new();
        assert!(provider.properties(ResourceKind::Unknown).is_none());
        assert!(provider.properties(ResourceKind::Vpc).is_some());
    }

    #[test]
    fn test_reference_patterns_include_generic_fallback() {
        let provider = SchemaProvider::new();
        let patterns = provider.reference_patterns(ResourceKind::Vpc);
        assert_eq!(patterns[0], "vpc_id");
        assert!(patterns.contains(&"vpc_arn".to_string()));
    }

    #[test]
    fn test_attribute_selection_by_suffix() {
        let provider = SchemaProvider::new();
        assert_eq!(provider.attribute_for_property("role_arn"), "arn");
        assert_eq!(provider.attribute_for_property("role"), "arn");
        assert_eq!(provider.attribute_for_property("function_name"), "name");
        assert_eq!(provider.attribute_for_property("bucket"), "bucket");
        assert_eq!(provider.attribute_for_property("vpc_id"), "id");
        assert_eq!(provider.attribute_for_property("subnet_ids"), "id");
    }

    #[test]
    fn test_output_export_table() {
        let provider = SchemaProvider::new();
        assert_eq!(provider.output_export(ResourceKind::LoadBalancer), Some("dns_name"));
        assert_eq!(provider.output_export(ResourceKind::Instance), Some("public_ip"));
        assert_eq!(provider.output_export(ResourceKind::Vpc), None);
    }
}
