//! Client side of the per-Pod model registry protocol
//!
//! [`RegistryClient`] is the seam between the install state machine and the
//! gRPC service running in each registry sidecar. Duplicate requests are
//! reported as successful outcomes: pushing a model that is already present
//! yields [`PushOutcome::AlreadyInstalled`], deleting one that is absent yields
//! [`DeleteOutcome::NotInstalled`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use modelreg_common::crd::{GetStateMode, ModelSpec, PluginSpec};
use modelreg_common::metrics::{record_registry_call, CallOutcome};
use modelreg_common::{Error, DEFAULT_REGISTRY_PORT};
use modelreg_proto as proto;
use modelreg_proto::config_model_registry_service_client::ConfigModelRegistryServiceClient;

/// Default timeout for establishing a connection to a registry
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry reachable at a Pod's IP
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryTarget {
    /// Name of the Pod hosting the registry
    pub pod_name: String,
    /// Pod IP the registry listens on
    pub address: String,
}

impl RegistryTarget {
    /// Create a target for the given Pod and address
    pub fn new(pod_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            address: address.into(),
        }
    }
}

/// Model as pushed to a registry, with file names normalized
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Plugin type, used as the registry's model name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Operational state retrieval mode
    pub get_state_mode: GetStateMode,
    /// YANG modules
    pub modules: Vec<ModuleDescriptor>,
    /// Module sources keyed by normalized file name
    pub files: BTreeMap<String, String>,
}

/// A YANG module as pushed to a registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Module name
    pub name: String,
    /// Publishing organization
    pub organization: String,
    /// Revision date
    pub revision: String,
    /// Normalized name of the file holding the module source
    pub file: String,
}

impl ModelDescriptor {
    /// Build the push payload from a Model's plugin and its YANG sources
    ///
    /// `plugin` supplies the identity; modules and files come from the
    /// Model spec they sit beside.
    pub fn new(plugin: &PluginSpec, spec: &ModelSpec) -> Self {
        Self {
            name: plugin.type_.clone(),
            version: plugin.version.clone(),
            get_state_mode: plugin.get_state_mode,
            modules: spec
                .modules
                .iter()
                .map(|m| ModuleDescriptor {
                    name: m.name.clone(),
                    organization: m.organization.clone(),
                    revision: m.revision.clone(),
                    file: normalize_file_name(&m.file),
                })
                .collect(),
            files: spec
                .files
                .iter()
                .map(|(name, data)| (normalize_file_name(name), data.clone()))
                .collect(),
        }
    }
}

impl From<&ModelDescriptor> for proto::ConfigModel {
    fn from(model: &ModelDescriptor) -> Self {
        proto::ConfigModel {
            name: model.name.clone(),
            version: model.version.clone(),
            files: model
                .files
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            modules: model
                .modules
                .iter()
                .map(|m| proto::ConfigModule {
                    name: m.name.clone(),
                    organization: m.organization.clone(),
                    revision: m.revision.clone(),
                    file: m.file.clone(),
                })
                .collect(),
            get_state_mode: wire_get_state_mode(model.get_state_mode) as i32,
        }
    }
}

/// Translate the CRD get-state mode to the registry wire enum
fn wire_get_state_mode(mode: GetStateMode) -> proto::GetStateMode {
    match mode {
        GetStateMode::None => proto::GetStateMode::None,
        GetStateMode::OpState => proto::GetStateMode::OpState,
        GetStateMode::ExplicitRoPaths => proto::GetStateMode::ExplicitRoPaths,
        GetStateMode::ExplicitRoPathsExpandWildcards => {
            proto::GetStateMode::ExplicitRoPathsExpandWildcards
        }
    }
}

/// Normalize a module file name to a relative `/`-separated path
///
/// Backslashes become slashes, and empty or `.` segments are dropped, so
/// `.\yang\\a.yang` and `./yang/a.yang` both become `yang/a.yang`.
pub fn normalize_file_name(name: &str) -> String {
    name.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Result of a successful push
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The registry stored the model
    Installed,
    /// The registry already had this name and version
    AlreadyInstalled,
}

/// Result of a successful delete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The registry removed the model
    Deleted,
    /// The registry did not have this name and version
    NotInstalled,
}

/// Calls against a single Pod's model registry
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Install a model into the target's registry
    async fn push_model(
        &self,
        target: &RegistryTarget,
        model: &ModelDescriptor,
    ) -> Result<PushOutcome, Error>;

    /// Remove a model by name and version from the target's registry
    async fn delete_model(
        &self,
        target: &RegistryTarget,
        name: &str,
        version: &str,
    ) -> Result<DeleteOutcome, Error>;
}

/// [`RegistryClient`] speaking gRPC to the registry sidecar
///
/// A fresh connection is made per call; calls happen at most once per
/// reconcile pass so there is nothing worth pooling.
#[derive(Clone, Debug)]
pub struct GrpcRegistryClient {
    port: u16,
    connect_timeout: Duration,
}

impl Default for GrpcRegistryClient {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_PORT, DEFAULT_CONNECT_TIMEOUT)
    }
}

impl GrpcRegistryClient {
    /// Create a client for registries listening on `port`
    pub fn new(port: u16, connect_timeout: Duration) -> Self {
        Self {
            port,
            connect_timeout,
        }
    }

    /// Endpoint URI for a registry at `address`
    pub fn endpoint_uri(&self, address: &str) -> String {
        if address.contains(':') {
            format!("http://[{}]:{}", address, self.port)
        } else {
            format!("http://{}:{}", address, self.port)
        }
    }

    async fn connect(
        &self,
        target: &RegistryTarget,
        operation: &str,
    ) -> Result<ConfigModelRegistryServiceClient<Channel>, Error> {
        let uri = self.endpoint_uri(&target.address);
        let channel = Endpoint::from_shared(uri)
            .map_err(|e| Error::registry(&target.pod_name, operation, e.to_string()))?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await
            .map_err(|e| {
                Error::registry(&target.pod_name, operation, format!("connect failed: {e}"))
            })?;
        Ok(ConfigModelRegistryServiceClient::new(channel))
    }
}

#[async_trait]
impl RegistryClient for GrpcRegistryClient {
    async fn push_model(
        &self,
        target: &RegistryTarget,
        model: &ModelDescriptor,
    ) -> Result<PushOutcome, Error> {
        let mut client = match self.connect(target, "push").await {
            Ok(client) => client,
            Err(e) => {
                record_registry_call("push", CallOutcome::Error);
                return Err(e);
            }
        };

        let request = proto::PushModelRequest {
            model: Some(model.into()),
        };
        match client.push_model(request).await {
            Ok(_) => {
                record_registry_call("push", CallOutcome::Applied);
                Ok(PushOutcome::Installed)
            }
            Err(status) if status.code() == Code::AlreadyExists => {
                debug!(
                    pod = %target.pod_name,
                    model = %model.name,
                    "model already present in registry"
                );
                record_registry_call("push", CallOutcome::Duplicate);
                Ok(PushOutcome::AlreadyInstalled)
            }
            Err(status) => {
                record_registry_call("push", CallOutcome::Error);
                Err(status_error(target, "push", &status))
            }
        }
    }

    async fn delete_model(
        &self,
        target: &RegistryTarget,
        name: &str,
        version: &str,
    ) -> Result<DeleteOutcome, Error> {
        let mut client = match self.connect(target, "delete").await {
            Ok(client) => client,
            Err(e) => {
                record_registry_call("delete", CallOutcome::Error);
                return Err(e);
            }
        };

        let request = proto::DeleteModelRequest {
            name: name.to_string(),
            version: version.to_string(),
        };
        match client.delete_model(request).await {
            Ok(_) => {
                record_registry_call("delete", CallOutcome::Applied);
                Ok(DeleteOutcome::Deleted)
            }
            Err(status) if status.code() == Code::NotFound => {
                debug!(pod = %target.pod_name, model = %name, "model already absent from registry");
                record_registry_call("delete", CallOutcome::Duplicate);
                Ok(DeleteOutcome::NotInstalled)
            }
            Err(status) => {
                record_registry_call("delete", CallOutcome::Error);
                Err(status_error(target, "delete", &status))
            }
        }
    }
}

fn status_error(target: &RegistryTarget, operation: &str, status: &tonic::Status) -> Error {
    Error::registry(
        &target.pod_name,
        operation,
        format!("{:?}: {}", status.code(), status.message()),
    )
}
