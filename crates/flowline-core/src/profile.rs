//! Flowline profiles handed over by the data-preparation side.
//!
//! A profile is a set of aligned arrays sampled at strictly increasing
//! along-flowline distances. How they were extracted from geographic data is
//! not this crate's concern; it only checks that they are usable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowlineError, Result};
use crate::field::Field;
use crate::mesh::Mesh;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSet {
    pub distance: Vec<f64>,
    pub bedrock: Vec<f64>,
    pub initial_thickness: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_thickness: Option<Vec<f64>>,
}

impl ProfileSet {
    pub fn new(
        distance: Vec<f64>,
        bedrock: Vec<f64>,
        initial_thickness: Vec<f64>,
        target_thickness: Option<Vec<f64>>,
    ) -> Result<Self> {
        let profile = Self { distance, bedrock, initial_thickness, target_thickness };
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(s)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.distance.len();
        if n < 2 {
            return Err(FlowlineError::InvalidProfile(format!("need at least 2 samples, got {n}")));
        }
        let mut arrays = vec![("bedrock", &self.bedrock), ("initial_thickness", &self.initial_thickness)];
        if let Some(target) = &self.target_thickness {
            arrays.push(("target_thickness", target));
        }
        for (name, values) in &arrays {
            if values.len() != n {
                return Err(FlowlineError::InvalidProfile(format!(
                    "{name} has {} samples, distance has {n}",
                    values.len()
                )));
            }
            if let Some(i) = values.iter().position(|v| !v.is_finite()) {
                return Err(FlowlineError::InvalidProfile(format!("{name}[{i}] is not finite")));
            }
        }
        if let Some(i) = self.distance.iter().position(|v| !v.is_finite()) {
            return Err(FlowlineError::InvalidProfile(format!("distance[{i}] is not finite")));
        }
        if let Some(i) = self.distance.windows(2).position(|w| w[1] <= w[0]) {
            return Err(FlowlineError::InvalidProfile(format!(
                "distance must be strictly increasing (distance[{}] = {} >= distance[{}] = {})",
                i,
                self.distance[i],
                i + 1,
                self.distance[i + 1]
            )));
        }
        Ok(())
    }

    pub fn bedrock_on(&self, mesh: Mesh) -> Result<Field> {
        Field::from_samples("bedrock", mesh, &self.distance, &self.bedrock)
    }

    pub fn initial_thickness_on(&self, mesh: Mesh) -> Result<Field> {
        Field::from_samples("ice_thickness", mesh, &self.distance, &self.initial_thickness)
    }

    pub fn target_thickness_on(&self, mesh: Mesh) -> Result<Option<Field>> {
        self.target_thickness
            .as_ref()
            .map(|t| Field::from_samples("target_thickness", mesh, &self.distance, t))
            .transpose()
    }
}
