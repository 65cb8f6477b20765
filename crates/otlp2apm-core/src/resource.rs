// Resource attributes → base-event metadata.
//
// Each resource-scoped group in an export request yields one base event
// carrying the identity of the producing entity: service, agent, host,
// cloud, container, kubernetes. Attributes without a dedicated field become
// resource-level labels shared by every event derived from the group.

use opentelemetry_proto::tonic::common::v1::any_value;
use opentelemetry_proto::tonic::resource::v1::Resource;
use otlp2apm_model::{Agent, ApmEvent, Language, Service};

use crate::common::{replace_dots, set_label, truncate};
use crate::semconv;

const AGENT_NAME_DEFAULT: &str = "otlp";
const UNKNOWN: &str = "unknown";

pub(crate) fn translate_resource_metadata(resource: Option<&Resource>, event: &mut ApmEvent) {
    let mut sdk_name = String::new();
    let mut sdk_version = String::new();
    let mut sdk_language = String::new();

    for kv in resource.map(|r| r.attributes.as_slice()).unwrap_or_default() {
        let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
            continue;
        };

        // The export timestamp feeds clock-skew correction and must never
        // surface as a label.
        if kv.key == semconv::ELASTIC_EXPORT_TIMESTAMP {
            continue;
        }

        let any_value::Value::StringValue(raw) = value else {
            set_label(replace_dots(&kv.key), event, value);
            continue;
        };
        let stringval = truncate(raw);

        match kv.key.as_str() {
            semconv::SERVICE_NAME => service(event).name = stringval.to_owned(),
            semconv::SERVICE_VERSION => service(event).version = stringval.to_owned(),
            semconv::SERVICE_INSTANCE_ID => service(event).node_name = stringval.to_owned(),
            semconv::DEPLOYMENT_ENVIRONMENT => {
                service(event).environment = stringval.to_owned();
            }

            semconv::TELEMETRY_SDK_NAME => sdk_name = stringval.to_owned(),
            semconv::TELEMETRY_SDK_VERSION => sdk_version = stringval.to_owned(),
            semconv::TELEMETRY_SDK_LANGUAGE => sdk_language = stringval.to_owned(),

            semconv::CLOUD_PROVIDER => cloud(event).provider = stringval.to_owned(),
            semconv::CLOUD_REGION => cloud(event).region = stringval.to_owned(),
            semconv::CLOUD_AVAILABILITY_ZONE => {
                cloud(event).availability_zone = stringval.to_owned();
            }
            semconv::CLOUD_ACCOUNT_ID => cloud(event).account_id = stringval.to_owned(),
            semconv::CLOUD_SERVICE_NAME => cloud(event).service_name = stringval.to_owned(),

            semconv::CONTAINER_ID => container(event).id = stringval.to_owned(),
            semconv::CONTAINER_NAME => container(event).name = stringval.to_owned(),
            semconv::CONTAINER_IMAGE_NAME => container(event).image_name = stringval.to_owned(),
            semconv::CONTAINER_IMAGE_TAG => container(event).image_tag = stringval.to_owned(),

            semconv::K8S_NAMESPACE_NAME => kubernetes(event).namespace = stringval.to_owned(),
            semconv::K8S_NODE_NAME => kubernetes(event).node_name = stringval.to_owned(),
            semconv::K8S_POD_NAME => kubernetes(event).pod_name = stringval.to_owned(),
            semconv::K8S_POD_UID => kubernetes(event).pod_uid = stringval.to_owned(),

            semconv::HOST_NAME => host(event).hostname = stringval.to_owned(),
            semconv::HOST_ID => host(event).id = stringval.to_owned(),
            semconv::HOST_ARCH => host(event).architecture = stringval.to_owned(),
            semconv::OS_TYPE => host(event).os_platform = stringval.to_owned(),

            _ => set_label(replace_dots(&kv.key), event, value),
        }
    }

    let agent = event.agent.get_or_insert_with(Agent::default);
    agent.name = match (sdk_name.is_empty(), sdk_language.is_empty()) {
        (false, false) => format!("{sdk_name}/{sdk_language}"),
        (false, true) => sdk_name,
        (true, false) => format!("{AGENT_NAME_DEFAULT}/{sdk_language}"),
        (true, true) => AGENT_NAME_DEFAULT.to_owned(),
    };
    agent.version = if sdk_version.is_empty() {
        UNKNOWN.to_owned()
    } else {
        sdk_version
    };

    let svc = service(event);
    if svc.name.is_empty() {
        svc.name = UNKNOWN.to_owned();
    }
    let language = svc.language.get_or_insert_with(Language::default);
    if language.name.is_empty() {
        language.name = UNKNOWN.to_owned();
    }
}

fn service(event: &mut ApmEvent) -> &mut Service {
    event.service.get_or_insert_with(Service::default)
}

fn cloud(event: &mut ApmEvent) -> &mut otlp2apm_model::Cloud {
    event.cloud.get_or_insert_with(Default::default)
}

fn container(event: &mut ApmEvent) -> &mut otlp2apm_model::Container {
    event.container.get_or_insert_with(Default::default)
}

fn kubernetes(event: &mut ApmEvent) -> &mut otlp2apm_model::Kubernetes {
    event.kubernetes.get_or_insert_with(Default::default)
}

fn host(event: &mut ApmEvent) -> &mut otlp2apm_model::Host {
    event.host.get_or_insert_with(Default::default)
}
