//! # Instances as observed from the orchestrator.
//!
//! The coordinator never touches raw Kubernetes objects. Watch adapters convert them into
//! the small, owned snapshots defined here:
//! - [`InstanceIdentity`] key of one pod (`namespace/name`)
//! - [`ApplicationIdentity`] value of the `app` label; names the topic and keys records
//! - [`Phase`] coarse pod phase
//! - [`Instance`] identity + labels + phase at the time of the event
//! - [`InstanceEvent`] added / updated / deleted notification

use std::collections::BTreeMap;
use std::fmt;

/// Label holding the application name.
pub const APP_LABEL: &str = "app";

/// Uniquely identifies one instance within the watched scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceIdentity {
    pub namespace: String,
    pub name: String,
}

impl InstanceIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Logical owner of one or more instances.
///
/// Used verbatim as the topic name and as the record key. An instance without the
/// [`APP_LABEL`] label resolves to the empty application, which is still a valid value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ApplicationIdentity(String);

impl ApplicationIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ApplicationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Simplified pod phase.
///
/// Mirrors the phase strings reported by Kubernetes. Unknown values map to
/// [`Phase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Unknown => "Unknown",
        }
    }
}

impl From<&str> for Phase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => Phase::Pending,
            "Running" => Phase::Running,
            "Succeeded" => Phase::Succeeded,
            "Failed" => Phase::Failed,
            _ => Phase::Unknown,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one instance as carried by a watch event.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: InstanceIdentity,
    pub labels: BTreeMap<String, String>,
    pub phase: Phase,
}

impl Instance {
    pub fn new(id: InstanceIdentity, phase: Phase) -> Self {
        Self {
            id,
            labels: BTreeMap::new(),
            phase,
        }
    }

    /// Adds a label (builder style).
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Resolves the application from the `app` label; missing label gives an empty name.
    pub fn app(&self) -> ApplicationIdentity {
        self.labels
            .get(APP_LABEL)
            .map(|v| ApplicationIdentity::new(v.as_str()))
            .unwrap_or_default()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

/// Lifecycle notification for one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceEvent {
    Added(Instance),
    Updated { old: Instance, new: Instance },
    Deleted(Instance),
}

impl InstanceEvent {
    /// Most recent snapshot carried by the event.
    pub fn instance(&self) -> &Instance {
        match self {
            InstanceEvent::Added(i) | InstanceEvent::Deleted(i) => i,
            InstanceEvent::Updated { new, .. } => new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_comes_from_app_label() {
        let i = Instance::new(InstanceIdentity::new("ns", "app-1"), Phase::Pending)
            .with_label("app", "checkout")
            .with_label("tier", "web");
        assert_eq!(i.app().as_str(), "checkout");
    }

    #[test]
    fn missing_app_label_is_empty_application() {
        let i = Instance::new(InstanceIdentity::new("ns", "loner"), Phase::Running);
        assert!(i.app().is_empty());
        assert_eq!(i.app().to_string(), "");
    }

    #[test]
    fn phase_parsing_falls_back_to_unknown() {
        assert_eq!(Phase::from("Running"), Phase::Running);
        assert_eq!(Phase::from("Pending"), Phase::Pending);
        assert_eq!(Phase::from("running"), Phase::Unknown);
        assert_eq!(Phase::from(""), Phase::Unknown);
    }

    #[test]
    fn identity_displays_as_namespace_slash_name() {
        assert_eq!(InstanceIdentity::new("ns", "app-1").to_string(), "ns/app-1");
    }

    #[test]
    fn updated_event_exposes_new_snapshot() {
        let id = InstanceIdentity::new("ns", "p");
        let ev = InstanceEvent::Updated {
            old: Instance::new(id.clone(), Phase::Pending),
            new: Instance::new(id, Phase::Running),
        };
        assert!(ev.instance().is_running());
    }
}
