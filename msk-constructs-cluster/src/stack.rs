//! Stack and template emission.
//!
//! A [`Stack`] collects resources, outputs, diagnostics and lookup
//! registrations while constructs are assembled. Synthesis consumes the stack,
//! so the template is produced exactly once and nothing can be added afterwards.

use std::collections::BTreeMap;

use aws_lc_rs::digest;
use log::{debug, info};
use msk_constructs_policy::StringValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::annotations::{Annotations, Diagnostic, DiagnosticLevel};
use crate::error::{ClusterError, ClusterResult};
use crate::lookup::{LookupField, LookupHandle, LookupRegistry};

/// What happens to a resource when it leaves the stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalPolicy {
    Destroy,
    #[default]
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    fn deletion_policy(self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// One entry of the template's `Resources` section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl CfnResource {
    pub fn new(resource_type: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Sets both `DeletionPolicy` and `UpdateReplacePolicy`
    pub fn apply_removal_policy(&mut self, policy: RemovalPolicy) {
        self.deletion_policy = Some(policy.deletion_policy().to_string());
        self.update_replace_policy = Some(policy.deletion_policy().to_string());
    }

    pub fn add_dependency(&mut self, logical_id: impl Into<String>) {
        self.depends_on.push(logical_id.into());
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The synthesized template
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<String, CfnResource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    /// Resources of one CloudFormation type, by logical id
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a CfnResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource.resource_type == resource_type)
    }

    pub fn to_json_string(&self, pretty: bool) -> ClusterResult<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(rendered)
    }
}

/// Result of synthesis: the template plus every diagnostic recorded on the way
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub template: Template,
    pub diagnostics: Vec<Diagnostic>,
}

impl Synthesis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }
}

/// Logical id for a construct path.
///
/// Non-alphanumeric characters are dropped. A single-component path is used
/// as is; deeper paths get an 8-character SHA-256 suffix so that different
/// paths that read the same once flattened stay distinct.
pub fn logical_id(path: &str) -> String {
    let components: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    let readable: String = components
        .iter()
        .flat_map(|part| part.chars().filter(char::is_ascii_alphanumeric))
        .collect();
    if components.len() <= 1 {
        return readable;
    }
    let hash = digest::digest(&digest::SHA256, components.join("/").as_bytes());
    let suffix: String = hash
        .as_ref()
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02X}"))
        .collect();
    format!("{readable}{suffix}")
}

/// [`logical_id`] for a construct id, rejecting ids without any alphanumeric character
pub fn checked_logical_id(id: &str) -> ClusterResult<String> {
    if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(ClusterError::InvalidConstructId(id.to_string()));
    }
    Ok(logical_id(id))
}

/// Container for the resources of one template
#[derive(Debug)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: BTreeMap<String, CfnResource>,
    outputs: BTreeMap<String, Output>,
    annotations: Annotations,
    lookups: LookupRegistry,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            annotations: Annotations::new(),
            lookups: LookupRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn add_resource(&mut self, logical_id: String, resource: CfnResource) -> ClusterResult<()> {
        if logical_id.is_empty() {
            return Err(ClusterError::InvalidConstructId(logical_id));
        }
        if self.resources.contains_key(&logical_id) {
            return Err(ClusterError::DuplicateLogicalId(logical_id));
        }
        debug!(
            "Adding {} as {} to stack {}",
            resource.resource_type, logical_id, self.name
        );
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    pub fn add_output(
        &mut self,
        id: &str,
        value: &StringValue,
        description: Option<String>,
    ) -> ClusterResult<()> {
        let output_id = checked_logical_id(id)?;
        if self.outputs.contains_key(&output_id) {
            return Err(ClusterError::DuplicateLogicalId(output_id));
        }
        self.outputs.insert(
            output_id,
            Output {
                value: value.to_json(),
                description,
            },
        );
        Ok(())
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Register a deferred lookup; repeated registrations for the same owner and field share one handle
    pub fn register_lookup(
        &mut self,
        owner_path: &str,
        cluster_arn: &StringValue,
        field: LookupField,
    ) -> LookupHandle {
        self.lookups.register(owner_path, cluster_arn, field)
    }

    /// Resolve lookups and produce the template along with every diagnostic
    pub fn synthesize(mut self) -> ClusterResult<Synthesis> {
        let lookups = std::mem::take(&mut self.lookups);
        let resolved = lookups.resolve()?;
        for (logical_id, resource) in resolved.resources {
            self.add_resource(logical_id, resource)?;
        }
        self.annotations.extend(resolved.diagnostics);

        info!(
            "Synthesized stack {} with {} resource(s) and {} diagnostic(s)",
            self.name,
            self.resources.len(),
            self.annotations.len()
        );

        Ok(Synthesis {
            template: Template {
                description: self.description,
                resources: self.resources,
                outputs: self.outputs,
            },
            diagnostics: self.annotations.into_vec(),
        })
    }

    /// Like [`Stack::synthesize`], but any error diagnostic fails synthesis
    pub fn synth(self) -> ClusterResult<Template> {
        let synthesis = self.synthesize()?;
        if synthesis.has_errors() {
            let errors = synthesis
                .diagnostics
                .into_iter()
                .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
                .collect();
            return Err(ClusterError::Validation(errors));
        }
        Ok(synthesis.template)
    }
}
