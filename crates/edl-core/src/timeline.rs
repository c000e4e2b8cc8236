//! The story timeline: an immutable, strictly ordered list of phases.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    preset::CameraPreset,
};

/// A phase as stored in the story document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    /// Seconds from the mission epoch.
    timestamp: f64,
    #[serde(default)]
    camera_presets: Vec<CameraPreset>,
    #[serde(default)]
    reverse_camera_presets: Option<Vec<CameraPreset>>,
}

/// A named narrative segment with a fixed absolute start time.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub id: String,
    /// Absolute start time (Unix UTC seconds).
    pub start: f64,
    pub title: String,
    pub description: String,
    /// Presets used while playing forward.
    pub camera_presets: Vec<CameraPreset>,
    /// Presets used while playing backward, if different.
    pub reverse_camera_presets: Option<Vec<CameraPreset>>,
}

impl Phase {
    /// The preset list for the given playback direction.
    #[must_use]
    pub fn presets_for_rate(&self, rate: f64) -> &[CameraPreset] {
        if rate < 0.0 {
            if let Some(reverse) = &self.reverse_camera_presets {
                return reverse;
            }
        }
        &self.camera_presets
    }
}

/// The ordered list of phases, with their start times cached for searching.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    phases: Vec<Phase>,
    starts: Vec<f64>,
}

impl Timeline {
    /// Build a timeline from phases, validating their order.
    pub fn new(phases: Vec<Phase>) -> Result<Self> {
        if phases.is_empty() {
            return Err(Error::EmptyTimeline);
        }
        for pair in phases.windows(2) {
            // NaN starts compare as unordered and are rejected too.
            if pair[1].start.partial_cmp(&pair[0].start) != Some(Ordering::Greater) {
                return Err(Error::UnorderedPhases {
                    previous: pair[0].id.clone(),
                    phase: pair[1].id.clone(),
                });
            }
        }
        let starts = phases.iter().map(|phase| phase.start).collect();
        Ok(Self { phases, starts })
    }

    /// Parse a story document: a JSON array of phases whose `timestamp`
    /// fields are offsets in seconds from `epoch`.
    pub fn from_json(json: &str, epoch: f64) -> Result<Self> {
        let records: Vec<PhaseRecord> = serde_json::from_str(json)?;
        let phases = records
            .into_iter()
            .map(|record| Phase {
                id: record.id,
                start: epoch + record.timestamp,
                title: record.title,
                description: record.description,
                camera_presets: record.camera_presets,
                reverse_camera_presets: record.reverse_camera_presets,
            })
            .collect();
        let timeline = Self::new(phases)?;
        tracing::info!("Loaded story timeline with {} phases", timeline.len());
        Ok(timeline)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false for a validated timeline; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase start times, strictly increasing.
    #[must_use]
    pub fn starts(&self) -> &[f64] {
        &self.starts
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// The phase to display for a resolved index, mapping the past-the-end
    /// sentinel onto the last phase.
    #[must_use]
    pub fn display_phase(&self, index: usize) -> &Phase {
        &self.phases[index.min(self.phases.len() - 1)]
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.phases.iter().position(|phase| phase.id == id)
    }

    #[must_use]
    pub fn first_start(&self) -> f64 {
        self.starts[0]
    }
}
