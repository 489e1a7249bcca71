use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure};

fn default_name() -> String {
    "Action".to_string()
}

/// A dated event on the epidemic timeline. Markers without an effect are
/// annotations only; markers with an effect scale transmission by
/// `1 - effect` from `day` onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMarker {
    /// Days since the epidemic start.
    pub day: i64,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<f64>,
}

impl ActionMarker {
    pub fn new(day: i64, name: impl Into<String>, effect: Option<f64>) -> Self {
        Self {
            day,
            name: name.into(),
            effect,
        }
    }

    pub fn is_configurable(&self) -> bool {
        self.effect.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionSchedule {
    markers: Vec<ActionMarker>,
}

impl InterventionSchedule {
    pub fn new(mut markers: Vec<ActionMarker>) -> Self {
        markers.sort_by_key(|m| m.day);
        Self { markers }
    }

    pub fn default_script() -> Self {
        Self::new(vec![ActionMarker::new(70, "Open uusimaa", Some(0.3))])
    }

    pub fn markers(&self) -> &[ActionMarker] {
        &self.markers
    }

    pub fn validate(&self) -> Result<()> {
        for marker in &self.markers {
            if let Some(effect) = marker.effect {
                ensure(effect > -1.0 && effect < 1.0, || {
                    Error::InvalidParameter(format!(
                        "effect of marker {:?} on day {} must lie in (-1, 1), got {effect}",
                        marker.name, marker.day
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Product of `1 - effect` over every configurable marker whose day is at
    /// or before `day`.
    pub fn multiplier_at(&self, day: f64) -> f64 {
        self.markers
            .iter()
            .take_while(|m| m.day as f64 <= day)
            .filter_map(|m| m.effect)
            .map(|effect| 1.0 - effect)
            .product()
    }
}
