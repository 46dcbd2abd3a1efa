// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection manager configuration.

use crate::attribute::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Accessor for the current pointer position
pub type MousePositionHook = Rc<dyn Fn() -> Point>;

/// What `announce` does when a node ID is already registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Refuse the new node and report an error
    #[default]
    Reject,
    /// Remove the registered node (with its connections) and register the new one
    Replace,
}

/// Persistable manager settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Handling of colliding node IDs
    pub duplicate_policy: DuplicatePolicy,
}

impl ManagerSettings {
    /// Load settings from RON
    pub fn from_ron(source: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(source)?)
    }

    /// Save settings to RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// RON parse error
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON write error
    #[error("Failed to write settings: {0}")]
    Write(#[from] ron::Error),
}

/// Options a [`ConnectionManager`](crate::ConnectionManager) is built with
#[derive(Clone)]
pub struct ManagerConfig {
    /// Fallback point source when no node anchor is available
    pub mouse_position: MousePositionHook,
    /// Behaviour settings
    pub settings: ManagerSettings,
}

impl ManagerConfig {
    /// Create a config with default settings
    pub fn new(mouse_position: impl Fn() -> Point + 'static) -> Self {
        Self {
            mouse_position: Rc::new(mouse_position),
            settings: ManagerSettings::default(),
        }
    }

    /// Replace the settings
    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the duplicate-ID policy
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.settings.duplicate_policy = policy;
        self
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
