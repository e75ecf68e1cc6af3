use bevy::prelude::*;

use crate::spline::{SplinePath, SplinePointType, POINT_TOLERANCE};
use crate::terrain::{TerrainProbe, TerrainSampler};

use super::{GroundSnapSettings, GroundState};

/// Number of control points changed by one ground adaptation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundReport {
    /// Existing points moved onto the ground.
    pub snapped: usize,
    /// Points inserted at discovered elevation changes, including their step corners.
    pub discovered: usize,
    /// Step corners inserted by the between-points pass.
    pub corners: usize,
}

fn same_height(a: f32, b: f32) -> bool {
    (a - b).abs() <= POINT_TOLERANCE
}

fn same_column(a: Vec3, b: Vec3) -> bool {
    (a.x - b.x).abs() <= POINT_TOLERANCE && (a.z - b.z).abs() <= POINT_TOLERANCE
}

impl GroundState {
    /// Remove every previously synthesized point from the spline and clear tracking.
    ///
    /// Returns the number of removed points.
    pub fn flush<S: SplinePath + ?Sized>(&mut self, spline: &mut S) -> usize {
        let mut removed = 0;
        for location in self.synthesized.drain(..).rev() {
            if let Some(index) = spline.find_coincident_point(location) {
                if spline.remove_point(index) {
                    removed += 1;
                }
            }
        }
        self.raycast_hits.clear();
        removed
    }

    /// Insert a linear point unless one already exists at `location`.
    ///
    /// Returns `true` if the point was inserted.
    pub(crate) fn insert_tracked<S: SplinePath + ?Sized>(
        &mut self,
        spline: &mut S,
        index: usize,
        location: Vec3,
        point_type: SplinePointType,
    ) -> bool {
        if spline.find_coincident_point(location).is_some() {
            return false;
        }
        spline.insert_point(index, location, point_type);
        self.synthesized.push(location);
        true
    }

    /// Insert a vertical step face rising at `column` from `low` to `high`.
    ///
    /// The ground corner goes at `index`, the air corner right after it.
    /// Returns the number of inserted points.
    fn insert_step_up<S: SplinePath + ?Sized>(
        &mut self,
        spline: &mut S,
        index: usize,
        column: Vec3,
        low: f32,
        high: f32,
    ) -> usize {
        let ground = Vec3::new(column.x, low, column.z);
        let air = Vec3::new(column.x, high, column.z);

        let mut cursor = index;
        if self.insert_tracked(spline, cursor, ground, SplinePointType::Linear) {
            cursor += 1;
        }
        let air_inserted = self.insert_tracked(spline, cursor, air, SplinePointType::Linear);
        (cursor - index) + usize::from(air_inserted)
    }

    /// Run the snap, discovery and between-points passes.
    pub fn adapt<S, T>(
        &mut self,
        spline: &mut S,
        terrain: &T,
        settings: &GroundSnapSettings,
    ) -> GroundReport
    where
        S: SplinePath + ?Sized,
        T: TerrainProbe + ?Sized,
    {
        let sampler = TerrainSampler::new(terrain, settings.origin_offset);
        let snapped = self.snap_points(spline, &sampler, settings.depth);
        if let Some(point_type) = settings.point_type {
            for index in 0..spline.point_count() {
                spline.set_point_type(index, point_type);
            }
        }
        let report = GroundReport {
            snapped,
            discovered: self.discover_steps(spline, &sampler, settings),
            corners: self.fill_step_corners(spline),
        };
        debug!(
            "Ground adaptation snapped {} points, discovered {}, added {} corners",
            report.snapped, report.discovered, report.corners
        );
        report
    }

    /// Move every control point onto the ground below it.
    pub fn snap_points<S, T>(
        &mut self,
        spline: &mut S,
        sampler: &TerrainSampler<T>,
        depth: f32,
    ) -> usize
    where
        S: SplinePath + ?Sized,
        T: TerrainProbe + ?Sized,
    {
        let mut snapped = 0;
        for index in 0..spline.point_count() {
            let location = spline.location_at_point(index);
            let Some(hit) = sampler.probe_below(location, depth) else {
                continue;
            };
            if spline.find_coincident_point(hit).is_some() {
                continue;
            }
            spline.set_point_location(index, hit);
            snapped += 1;
        }
        snapped
    }

    /// Sample the ground along the spline and insert points where its elevation changes.
    ///
    /// Sample locations are taken from the spline before any insertion.
    pub fn discover_steps<S, T>(
        &mut self,
        spline: &mut S,
        sampler: &TerrainSampler<T>,
        settings: &GroundSnapSettings,
    ) -> usize
    where
        S: SplinePath + ?Sized,
        T: TerrainProbe + ?Sized,
    {
        let samples: Vec<Vec3> = settings
            .method
            .sample_distances(spline.length())
            .into_iter()
            .map(|distance| spline.location_at_distance(distance))
            .collect();

        let mut inserted = 0;
        let mut last_unused: Option<Vec3> = None;

        for location in samples {
            let Some(hit) = sampler.probe_below(location, settings.depth) else {
                continue;
            };
            self.raycast_hits.push(hit);

            if spline.find_coincident_point(hit).is_some() || spline.point_count() < 2 {
                last_unused = Some(hit);
                continue;
            }

            let key = spline.find_nearest_input_key(hit);
            let index = (key.ceil() as usize).clamp(1, spline.point_count() - 1);
            let previous = spline.location_at_point(index - 1);

            if same_height(hit.y, previous.y) {
                last_unused = Some(hit);
                continue;
            }

            if !self.insert_tracked(spline, index, hit, SplinePointType::Linear) {
                continue;
            }
            inserted += 1;

            if hit.y < previous.y {
                // Step down: stay in the air until right above the new point
                let air = Vec3::new(hit.x, previous.y, hit.z);
                if self.insert_tracked(spline, index, air, SplinePointType::Linear) {
                    inserted += 1;
                }
            } else {
                // Step up: rise at the last ground hit that lies past the previous point
                let column = last_unused
                    .filter(|reference| {
                        spline.find_nearest_input_key(*reference) > (index - 1) as f32
                    })
                    .unwrap_or(previous);
                inserted += self.insert_step_up(spline, index, column, previous.y, hit.y);
            }

            last_unused = None;
        }

        inserted
    }

    /// Insert step corners between consecutive points where the elevation rises.
    pub fn fill_step_corners<S: SplinePath + ?Sized>(&mut self, spline: &mut S) -> usize {
        let mut inserted = 0;
        let mut index = 0;

        while index + 1 < spline.point_count() {
            let current = spline.location_at_point(index);
            let next = spline.location_at_point(index + 1);

            if next.y > current.y + POINT_TOLERANCE && !same_column(current, next) {
                let added = self.insert_step_up(spline, index + 1, current, current.y, next.y);
                inserted += added;
                index += added;
            }
            index += 1;
        }

        inserted
    }
}
