// Context structs embedded in the APM event envelope.
//
// Each struct mirrors one fieldset of the downstream event schema. Empty
// strings and absent options are omitted on serialization so that contexts
// never appear present-but-empty.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Service {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ServiceTarget>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Language {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Framework {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// The backend service a span talks to, in type/name terms.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ServiceTarget {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Agent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Host {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub os_platform: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Cloud {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Container {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_tag: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Kubernetes {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_uid: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Client {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Source {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Destination {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Network {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<NetworkConnection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<NetworkCarrier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NetworkConnection {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtype: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NetworkCarrier {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mcc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mnc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icc: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UserAgent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Http {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
}

impl Http {
    pub fn is_empty(&self) -> bool {
        self == &Http::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HttpRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HttpResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
}
