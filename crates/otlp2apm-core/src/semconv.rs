// OpenTelemetry semantic convention attribute keys, v1.5 vintage, as sent
// by the instrumentation this translator supports. Legacy OpenTracing and
// Jaeger spellings are kept alongside their successors.

// http.*
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_TARGET: &str = "http.target";
pub const HTTP_HOST: &str = "http.host";
pub const HTTP_SCHEME: &str = "http.scheme";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const HTTP_FLAVOR: &str = "http.flavor";
pub const HTTP_SERVER_NAME: &str = "http.server_name";
pub const HTTP_CLIENT_IP: &str = "http.client_ip";
pub const HTTP_USER_AGENT: &str = "http.user_agent";
pub const HTTP_PROTOCOL: &str = "http.protocol";
pub const HTTP_PATH: &str = "http.path";

// db.*
pub const DB_SYSTEM: &str = "db.system";
pub const DB_NAME: &str = "db.name";
pub const DB_STATEMENT: &str = "db.statement";
pub const DB_USER: &str = "db.user";
pub const DB_TYPE_LEGACY: &str = "db.type";
pub const DB_INSTANCE_LEGACY: &str = "db.instance";
pub const SQL_QUERY_LEGACY: &str = "sql.query";

// net.*
pub const NET_PEER_IP: &str = "net.peer.ip";
pub const NET_PEER_NAME: &str = "net.peer.name";
pub const NET_PEER_PORT: &str = "net.peer.port";
pub const NET_HOST_NAME: &str = "net.host.name";
pub const NET_HOST_PORT: &str = "net.host.port";
pub const NET_HOST_CONNECTION_TYPE: &str = "net.host.connection.type";
pub const NET_HOST_CONNECTION_SUBTYPE: &str = "net.host.connection.subtype";
pub const NET_HOST_CARRIER_NAME: &str = "net.host.carrier.name";
pub const NET_HOST_CARRIER_MCC: &str = "net.host.carrier.mcc";
pub const NET_HOST_CARRIER_MNC: &str = "net.host.carrier.mnc";
pub const NET_HOST_CARRIER_ICC: &str = "net.host.carrier.icc";

// peer.* (OpenTracing vintage)
pub const PEER_SERVICE: &str = "peer.service";
pub const PEER_ADDRESS: &str = "peer.address";
pub const PEER_PORT: &str = "peer.port";
pub const PEER_HOSTNAME: &str = "peer.hostname";
pub const PEER_IPV4: &str = "peer.ipv4";
pub const PEER_IPV6: &str = "peer.ipv6";

// messaging.*
pub const MESSAGING_SYSTEM: &str = "messaging.system";
pub const MESSAGING_DESTINATION: &str = "messaging.destination";
pub const MESSAGING_OPERATION: &str = "messaging.operation";
pub const MESSAGING_TEMP_DESTINATION: &str = "messaging.temp_destination";
pub const MESSAGE_BUS_DESTINATION_LEGACY: &str = "message_bus.destination";

// rpc.*
pub const RPC_SYSTEM: &str = "rpc.system";
pub const RPC_SERVICE: &str = "rpc.service";
pub const RPC_METHOD: &str = "rpc.method";
pub const RPC_GRPC_STATUS_CODE: &str = "rpc.grpc.status_code";

// exception.*
pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_MESSAGE: &str = "exception.message";
pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";
pub const EXCEPTION_ESCAPED: &str = "exception.escaped";

// resource attributes
pub const SERVICE_NAME: &str = "service.name";
pub const SERVICE_VERSION: &str = "service.version";
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
pub const CLOUD_PROVIDER: &str = "cloud.provider";
pub const CLOUD_REGION: &str = "cloud.region";
pub const CLOUD_AVAILABILITY_ZONE: &str = "cloud.availability_zone";
pub const CLOUD_ACCOUNT_ID: &str = "cloud.account.id";
pub const CLOUD_SERVICE_NAME: &str = "cloud.service.name";
pub const CONTAINER_ID: &str = "container.id";
pub const CONTAINER_NAME: &str = "container.name";
pub const CONTAINER_IMAGE_NAME: &str = "container.image.name";
pub const CONTAINER_IMAGE_TAG: &str = "container.image.tag";
pub const K8S_NAMESPACE_NAME: &str = "k8s.namespace.name";
pub const K8S_NODE_NAME: &str = "k8s.node.name";
pub const K8S_POD_NAME: &str = "k8s.pod.name";
pub const K8S_POD_UID: &str = "k8s.pod.uid";
pub const HOST_NAME: &str = "host.name";
pub const HOST_ID: &str = "host.id";
pub const HOST_ARCH: &str = "host.arch";
pub const OS_TYPE: &str = "os.type";

// miscellaneous span attributes
pub const SESSION_ID: &str = "session.id";
pub const SPAN_KIND_TAG: &str = "span.kind";
pub const TRANSACTION_TYPE_TAG: &str = "type";
pub const SAMPLER_TYPE: &str = "sampler.type";
pub const SAMPLER_PARAM: &str = "sampler.param";

/// Resource attribute carrying the agent-side export wall clock, used for
/// clock-skew correction. Consumed by the translator, never emitted.
pub const ELASTIC_EXPORT_TIMESTAMP: &str = "telemetry.sdk.elastic_export_timestamp";
