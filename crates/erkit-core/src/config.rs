//! Engine configuration
//!
//! Tunables for the routing, maintenance and containment layers, loadable
//! from JSON or TOML. Every field has a default so partial files are valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path planner tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Outward expansion of each bounding box for the segment intersection test
    pub intersection_margin: f64,
    /// Outward expansion used when validating an intermediate waypoint
    pub safe_margin: f64,
    /// Below this separation on either axis the endpoints count as aligned
    pub axis_alignment_threshold: f64,
    /// Distance kept between a detour waypoint and the obstacles it avoids
    pub detour_clearance: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            intersection_margin: 10.0,
            safe_margin: 15.0,
            axis_alignment_threshold: 10.0,
            detour_clearance: 20.0,
        }
    }
}

/// Waypoint maintainer tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintainerConfig {
    /// Quiet period after the last move of a shape before it is rerouted
    pub debounce_ms: u64,
    /// Per-axis difference below which a recomputed waypoint is ignored
    pub change_tolerance: f64,
    /// Treat unrelated shapes as obstacles when rerouting
    pub avoid_obstacles: bool,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            change_tolerance: 2.0,
            avoid_obstacles: true,
        }
    }
}

/// Container sizing and ungroup placement tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainmentConfig {
    /// Side padding for groups of at most two members
    pub padding_small: f64,
    /// Side padding for groups of three or four members
    pub padding_medium: f64,
    /// Side padding for larger groups
    pub padding_large: f64,
    /// Top padding reserved for the container label
    pub title_band: f64,
    /// Children per row when ungrouping
    pub grid_columns: usize,
    /// Horizontal gap between ungrouped children
    pub column_spacing: f64,
    /// Vertical gap between rows of ungrouped children
    pub row_spacing: f64,
    /// Gap between the dissolved container's right edge and the child grid
    pub ungroup_offset: f64,
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            padding_small: 6.0,
            padding_medium: 8.0,
            padding_large: 10.0,
            title_band: 25.0,
            grid_columns: 3,
            column_spacing: 100.0,
            row_spacing: 80.0,
            ungroup_offset: 100.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub routing: RoutingConfig,
    pub maintainer: MaintainerConfig,
    pub containment: ContainmentConfig,
}

fn check_distance(key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("must be a finite non-negative number, got {}", value),
        });
    }
    Ok(())
}

impl EngineConfig {
    /// Load config from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        config.validate()?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Save config to a `.json` or `.toml` file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate all values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.routing;
        check_distance("routing.intersection_margin", r.intersection_margin)?;
        check_distance("routing.safe_margin", r.safe_margin)?;
        check_distance("routing.axis_alignment_threshold", r.axis_alignment_threshold)?;
        check_distance("routing.detour_clearance", r.detour_clearance)?;

        check_distance(
            "maintainer.change_tolerance",
            self.maintainer.change_tolerance,
        )?;

        let c = &self.containment;
        check_distance("containment.padding_small", c.padding_small)?;
        check_distance("containment.padding_medium", c.padding_medium)?;
        check_distance("containment.padding_large", c.padding_large)?;
        check_distance("containment.title_band", c.title_band)?;
        check_distance("containment.column_spacing", c.column_spacing)?;
        check_distance("containment.row_spacing", c.row_spacing)?;
        check_distance("containment.ungroup_offset", c.ungroup_offset)?;
        if c.grid_columns == 0 {
            return Err(ConfigError::InvalidValue {
                key: "containment.grid_columns".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
