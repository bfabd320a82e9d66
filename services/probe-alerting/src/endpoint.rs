//! Probe target model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A probed target: display name, optional port and free-form labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Destination address: `name`, or `name:port` when a port is set
    pub fn dst(&self) -> String {
        if self.port == 0 {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.port)
        }
    }

    /// Identity used to track per-target alert state.
    ///
    /// Labels are part of the key so that two targets sharing a name but
    /// carrying different labels are tracked independently.
    pub fn key(&self) -> TargetKey {
        TargetKey {
            dst: self.dst(),
            labels: self.labels.clone(),
        }
    }
}

/// Structured target identity; destination and labels are compared as
/// separate values, so no name or label text can alias another target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub dst: String,
    pub labels: BTreeMap<String, String>,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dst)?;
        for (k, v) in &self.labels {
            write!(f, ",{}={}", k, v)?;
        }
        Ok(())
    }
}
