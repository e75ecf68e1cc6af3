//! Fakes shared by unit tests.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::builder::InstanceFactory;
use crate::mesh::PlacedFrame;
use crate::terrain::TerrainProbe;

/// Terrain made of flat plateaus along X.
///
/// The ground is at `base` height, then at each step's height from its X
/// threshold onward.
#[derive(Debug, Clone, Default)]
pub struct StepTerrain {
    base: f32,
    steps: Vec<(f32, f32)>,
}

impl StepTerrain {
    pub fn flat(height: f32) -> Self {
        Self {
            base: height,
            steps: Vec::new(),
        }
    }

    /// Change the ground height to `height` from `x` onward.
    pub fn with_step(mut self, x: f32, height: f32) -> Self {
        self.steps.push((x, height));
        self.steps.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    pub fn height_at(&self, x: f32) -> f32 {
        self.steps
            .iter()
            .rev()
            .find(|(threshold, _)| x >= *threshold)
            .map_or(self.base, |(_, height)| *height)
    }
}

impl TerrainProbe for StepTerrain {
    /// Only vertical probes are answered.
    fn line_probe(&self, start: Vec3, end: Vec3) -> Option<Vec3> {
        let height = self.height_at(start.x);
        let (low, high) = (start.y.min(end.y), start.y.max(end.y));
        (low..=high)
            .contains(&height)
            .then(|| Vec3::new(start.x, height, start.z))
    }
}

/// Mesh bounds keyed by name.
pub fn bounds(entries: &[(&'static str, Vec3)]) -> HashMap<&'static str, Vec3> {
    entries.iter().copied().collect()
}

/// Instance factory keeping every live instance in memory.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    next_id: usize,
    live: BTreeMap<usize, (usize, PlacedFrame)>,
    pub destroyed: usize,
}

impl RecordingFactory {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Frames of the live instances, ordered by segment index.
    pub fn live_frames(&self) -> Vec<PlacedFrame> {
        let mut frames: Vec<_> = self.live.values().copied().collect();
        frames.sort_by_key(|(index, _)| *index);
        frames.into_iter().map(|(_, frame)| frame).collect()
    }
}

impl<M> InstanceFactory<M> for RecordingFactory {
    type Instance = usize;

    fn create_instance(&mut self, _mesh: &M, index: usize) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, (index, PlacedFrame::default()));
        id
    }

    fn destroy_instance(&mut self, instance: usize) {
        if self.live.remove(&instance).is_some() {
            self.destroyed += 1;
        }
    }

    fn set_instance_frame(&mut self, instance: &usize, frame: &PlacedFrame) {
        if let Some((_, placed)) = self.live.get_mut(instance) {
            *placed = *frame;
        }
    }
}
