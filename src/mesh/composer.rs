use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::geometry::{clamp_tangent, UP};
use crate::spline::SplinePath;

use super::{CompositionMethod, MeshBounds, MeshComposition, PlacementMethod, SplineMeshValues};

/// Random draws in a row that may hit invalid entries before composition gives up.
pub const MAX_CONSECUTIVE_INVALID_DRAWS: usize = 1024;

/// Errors raised while composing meshes along a spline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    /// Random composition kept drawing entries without a usable mesh.
    #[error("could not compose: no valid mesh after {attempts} random draws")]
    NoValidDraw { attempts: usize },
    /// A mesh plus gap does not advance along the spline.
    #[error("could not compose: segment step {step} does not advance along the spline")]
    DegenerateStep { step: f32 },
}

/// A mesh chosen by composition, with its measured bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedMesh<M> {
    pub mesh: M,
    /// Bounding box size of the unscaled mesh.
    pub size: Vec3,
    /// Scale factor of the composition entry.
    pub scale: f32,
}

impl<M> ComposedMesh<M> {
    /// Length covered along the spline.
    pub fn extent(&self) -> f32 {
        self.size.x * self.scale
    }

    /// Vertical extent after scaling.
    pub fn height(&self) -> f32 {
        self.size.y * self.scale
    }
}

/// A composed mesh with its segment geometry, before rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment<M> {
    pub mesh: M,
    pub size: Vec3,
    pub values: SplineMeshValues,
}

/// Which meshes cover the spline and how they are laid out.
#[derive(Debug, Clone)]
pub struct CompositionSettings<M> {
    pub composition_method: CompositionMethod,
    pub placement_method: PlacementMethod,
    /// The single mesh used by [`CompositionMethod::Fill`].
    pub fill: MeshComposition<M>,
    /// Meshes used by [`CompositionMethod::Usual`] and [`CompositionMethod::Random`].
    pub compositions: Vec<MeshComposition<M>>,
    /// Space left between consecutive meshes. Ignored by [`PlacementMethod::Extend`].
    pub gap: f32,
    /// Seed for random composition.
    pub seed: u64,
}

impl<M> Default for CompositionSettings<M> {
    fn default() -> Self {
        Self {
            composition_method: CompositionMethod::default(),
            placement_method: PlacementMethod::default(),
            fill: MeshComposition::default(),
            compositions: Vec::new(),
            gap: 0.0,
            seed: 0,
        }
    }
}

impl<M: Clone> CompositionSettings<M> {
    /// Fill the spline with a single repeated mesh.
    pub fn fill(composition: MeshComposition<M>) -> Self {
        Self {
            composition_method: CompositionMethod::Fill,
            fill: composition,
            ..default()
        }
    }

    /// Use the listed meshes once each, in order.
    pub fn usual(compositions: Vec<MeshComposition<M>>) -> Self {
        Self {
            composition_method: CompositionMethod::Usual,
            compositions,
            ..default()
        }
    }

    /// Draw the listed meshes at random.
    pub fn random(compositions: Vec<MeshComposition<M>>, seed: u64) -> Self {
        Self {
            composition_method: CompositionMethod::Random,
            compositions,
            seed,
            ..default()
        }
    }

    /// Set the gap between meshes, clamped to be non-negative.
    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap.max(0.0);
        self
    }

    pub fn with_placement(mut self, placement_method: PlacementMethod) -> Self {
        self.placement_method = placement_method;
        self
    }

    /// Choose the meshes covering a spline of `length`.
    ///
    /// The sum of every extent plus one gap per mesh never exceeds `length`.
    pub fn compose<B>(&self, length: f32, bounds: &B) -> Result<Vec<ComposedMesh<M>>, ComposeError>
    where
        B: MeshBounds<M> + ?Sized,
    {
        let composed = match self.composition_method {
            CompositionMethod::Fill => self.compose_fill(length, bounds)?,
            CompositionMethod::Usual => self.compose_usual(length, bounds),
            CompositionMethod::Random => self.compose_random(length, bounds)?,
        };
        debug!(
            "{} composition fit {} meshes on length {length}",
            self.composition_method.name(),
            composed.len()
        );
        Ok(composed)
    }

    fn compose_fill<B>(&self, length: f32, bounds: &B) -> Result<Vec<ComposedMesh<M>>, ComposeError>
    where
        B: MeshBounds<M> + ?Sized,
    {
        let Some(mesh) = resolve(&self.fill, bounds) else {
            trace!("Fill composition has no valid mesh");
            return Ok(Vec::new());
        };

        let step = mesh.extent() + self.gap;
        if step <= 0.0 {
            return Err(ComposeError::DegenerateStep { step });
        }

        let count = (length / step).floor().max(0.0) as usize;
        // Guard against rounding putting the last mesh past the end
        let count = if count as f32 * step > length {
            count.saturating_sub(1)
        } else {
            count
        };
        Ok(vec![mesh; count])
    }

    fn compose_usual<B>(&self, length: f32, bounds: &B) -> Vec<ComposedMesh<M>>
    where
        B: MeshBounds<M> + ?Sized,
    {
        let mut composed = Vec::new();
        let mut total = 0.0;

        for mesh in self.compositions.iter().filter_map(|c| resolve(c, bounds)) {
            let step = mesh.extent() + self.gap;
            if total + step > length {
                break;
            }
            total += step;
            composed.push(mesh);
        }

        composed
    }

    fn compose_random<B>(
        &self,
        length: f32,
        bounds: &B,
    ) -> Result<Vec<ComposedMesh<M>>, ComposeError>
    where
        B: MeshBounds<M> + ?Sized,
    {
        let mut composed = Vec::new();
        if self.compositions.is_empty() {
            return Ok(composed);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut total = 0.0;
        let mut invalid_draws = 0;

        loop {
            let index = rng.random_range(0..self.compositions.len());
            let Some(mesh) = resolve(&self.compositions[index], bounds) else {
                invalid_draws += 1;
                if invalid_draws >= MAX_CONSECUTIVE_INVALID_DRAWS {
                    return Err(ComposeError::NoValidDraw {
                        attempts: invalid_draws,
                    });
                }
                continue;
            };
            invalid_draws = 0;

            let step = mesh.extent() + self.gap;
            if step <= 0.0 {
                return Err(ComposeError::DegenerateStep { step });
            }
            if total + step > length {
                break;
            }
            total += step;
            composed.push(mesh);
        }

        Ok(composed)
    }

    /// Compose and lay out segments on `spline`.
    ///
    /// With `raise` set, segments are lifted by half their height so meshes rest
    /// on the spline instead of being centered on it.
    pub fn layout<S, B>(
        &self,
        spline: &S,
        bounds: &B,
        raise: bool,
    ) -> Result<Vec<PlannedSegment<M>>, ComposeError>
    where
        S: SplinePath + ?Sized,
        B: MeshBounds<M> + ?Sized,
    {
        match self.placement_method {
            PlacementMethod::Duplicate => {
                let composed = self.compose(spline.length(), bounds)?;
                Ok(layout_duplicate(spline, &composed, self.gap, raise))
            }
            PlacementMethod::Extend => Ok(self.layout_extend(spline, bounds, raise)),
        }
    }

    /// The composition stretched between control points.
    pub fn extend_composition(&self) -> &MeshComposition<M> {
        match self.compositions.first() {
            Some(first) if self.composition_method != CompositionMethod::Fill => first,
            _ => &self.fill,
        }
    }

    /// Stretch one mesh between each pair of consecutive control points.
    pub fn layout_extend<S, B>(&self, spline: &S, bounds: &B, raise: bool) -> Vec<PlannedSegment<M>>
    where
        S: SplinePath + ?Sized,
        B: MeshBounds<M> + ?Sized,
    {
        let Some(composed) = resolve(self.extend_composition(), bounds) else {
            return Vec::new();
        };
        let offset = if raise { UP * (composed.height() / 2.0) } else { Vec3::ZERO };

        (0..spline.point_count().saturating_sub(1))
            .map(|index| {
                let start = spline.location_at_point(index);
                let end = spline.location_at_point(index + 1);
                let scale = (start.distance(end) / composed.size.x).abs();
                let values = SplineMeshValues::new(
                    start,
                    spline.tangent_at_point(index),
                    end,
                    spline.tangent_at_point(index + 1),
                    scale,
                );
                PlannedSegment {
                    mesh: composed.mesh.clone(),
                    size: composed.size,
                    values: values.translated(offset),
                }
            })
            .collect()
    }
}

/// Lay composed meshes end to end along `spline`, separated by `gap`.
pub fn layout_duplicate<M, S>(
    spline: &S,
    composed: &[ComposedMesh<M>],
    gap: f32,
    raise: bool,
) -> Vec<PlannedSegment<M>>
where
    M: Clone,
    S: SplinePath + ?Sized,
{
    let mut previous_end = 0.0;

    composed
        .iter()
        .enumerate()
        .map(|(index, mesh)| {
            let extent = mesh.extent();
            let start_distance = if index > 0 { previous_end + gap } else { 0.0 };
            let end_distance = start_distance + extent;
            previous_end = end_distance;

            let values = SplineMeshValues::new(
                spline.location_at_distance(start_distance),
                clamp_tangent(spline.tangent_at_distance(start_distance), extent),
                spline.location_at_distance(end_distance),
                clamp_tangent(spline.tangent_at_distance(end_distance), extent),
                mesh.scale,
            );
            let offset = if raise { UP * (mesh.height() / 2.0) } else { Vec3::ZERO };

            PlannedSegment {
                mesh: mesh.mesh.clone(),
                size: mesh.size,
                values: values.translated(offset),
            }
        })
        .collect()
}

fn resolve<M, B>(composition: &MeshComposition<M>, bounds: &B) -> Option<ComposedMesh<M>>
where
    M: Clone,
    B: MeshBounds<M> + ?Sized,
{
    let size = composition.valid_size(bounds)?;
    Some(ComposedMesh {
        mesh: composition.mesh.clone()?,
        size,
        scale: composition.scale_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::Spline;
    use crate::test_support::bounds;

    fn entry(name: &'static str) -> MeshComposition<&'static str> {
        MeshComposition::new(name)
    }

    #[test]
    fn test_fill_count_with_gap() {
        let bounds = bounds(&[("post", Vec3::new(100.0, 10.0, 10.0))]);
        let settings = CompositionSettings::fill(entry("post")).with_gap(50.0);

        let composed = settings.compose(1000.0, &bounds).unwrap();
        assert_eq!(composed.len(), 6);
    }

    #[test]
    fn test_fill_count_bounds_hold() {
        let bounds = bounds(&[("post", Vec3::new(37.0, 1.0, 1.0))]);
        let cases = [
            (1000.0, 50.0, 1.0),
            (999.0, 3.0, 0.5),
            (74.0, 0.0, 1.0),
            (10.0, 0.0, 1.0),
        ];
        for (length, gap, scale) in cases {
            let settings = CompositionSettings::fill(entry("post").with_scale(scale)).with_gap(gap);
            let count = settings.compose(length, &bounds).unwrap().len() as f32;
            let step = 37.0 * scale + gap;
            assert!(count * step <= length);
            assert!(length < (count + 1.0) * step);
        }
    }

    #[test]
    fn test_fill_without_mesh_is_empty() {
        let bounds = bounds(&[]);
        let settings = CompositionSettings::<&str>::fill(MeshComposition::default());
        assert!(settings.compose(1000.0, &bounds).unwrap().is_empty());
    }

    #[test]
    fn test_fill_zero_scale_without_gap_is_degenerate() {
        let bounds = bounds(&[("post", Vec3::new(100.0, 1.0, 1.0))]);
        let settings = CompositionSettings::fill(entry("post").with_scale(0.0));
        assert_eq!(
            settings.compose(1000.0, &bounds),
            Err(ComposeError::DegenerateStep { step: 0.0 })
        );
    }

    #[test]
    fn test_usual_stops_at_first_overflow() {
        let bounds = bounds(&[("wall", Vec3::new(80.0, 5.0, 5.0))]);
        let settings =
            CompositionSettings::usual(vec![entry("wall"), entry("wall"), entry("wall")])
                .with_gap(10.0);

        assert_eq!(settings.compose(200.0, &bounds).unwrap().len(), 2);
    }

    #[test]
    fn test_usual_skips_invalid_entries() {
        let bounds = bounds(&[("a", Vec3::new(10.0, 1.0, 1.0)), ("b", Vec3::new(20.0, 1.0, 1.0))]);
        let settings = CompositionSettings::usual(vec![
            entry("a"),
            MeshComposition::default(),
            entry("missing"),
            entry("b"),
        ]);

        let composed = settings.compose(100.0, &bounds).unwrap();
        assert_eq!(composed.iter().map(|c| c.mesh).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_random_terminates_with_mostly_invalid_entries() {
        let bounds = bounds(&[("rock", Vec3::new(40.0, 5.0, 5.0))]);
        let mut compositions = vec![entry("rock")];
        compositions.extend((0..9).map(|_| MeshComposition::default()));
        let settings = CompositionSettings::random(compositions, 7);

        let composed = settings.compose(500.0, &bounds).unwrap();
        assert_eq!(composed.len(), 12);
    }

    #[test]
    fn test_random_without_valid_entries_fails() {
        let bounds = bounds(&[]);
        let settings =
            CompositionSettings::random(vec![entry("missing"), MeshComposition::default()], 1);

        assert_eq!(
            settings.compose(500.0, &bounds),
            Err(ComposeError::NoValidDraw {
                attempts: MAX_CONSECUTIVE_INVALID_DRAWS
            })
        );
        let empty = CompositionSettings::<&str>::random(Vec::new(), 1);
        assert!(empty.compose(500.0, &bounds).unwrap().is_empty());
    }

    #[test]
    fn test_random_is_reproducible_for_a_seed() {
        let bounds = bounds(&[
            ("a", Vec3::new(10.0, 1.0, 1.0)),
            ("b", Vec3::new(15.0, 1.0, 1.0)),
            ("c", Vec3::new(25.0, 1.0, 1.0)),
        ]);
        let settings =
            CompositionSettings::random(vec![entry("a"), entry("b"), entry("c")], 42).with_gap(2.0);

        let first = settings.compose(400.0, &bounds).unwrap();
        let second = settings.compose(400.0, &bounds).unwrap();
        assert_eq!(first, second);

        let total: f32 = first.iter().map(|c| c.extent() + 2.0).sum();
        assert!(total <= 400.0);
    }

    #[test]
    fn test_duplicate_layout_positions() {
        let bounds = bounds(&[("post", Vec3::new(100.0, 20.0, 10.0))]);
        let spline = Spline::straight(Vec3::ZERO, Vec3::X, 1000.0);
        let settings = CompositionSettings::fill(entry("post")).with_gap(50.0);

        let segments = settings.layout(&spline, &bounds, false).unwrap();
        assert_eq!(segments.len(), 6);
        for (index, segment) in segments.iter().enumerate() {
            let start = index as f32 * 150.0;
            assert!((segment.values.start - Vec3::new(start, 0.0, 0.0)).length() < 0.1);
            assert!((segment.values.end - Vec3::new(start + 100.0, 0.0, 0.0)).length() < 0.1);
            assert!(segment.values.start_tangent.length() <= 100.0 + 1e-3);
            assert_eq!(segment.values.start_scale, Vec2::ONE);
        }
    }

    #[test]
    fn test_duplicate_layout_raised_by_half_height() {
        let bounds = bounds(&[("post", Vec3::new(100.0, 20.0, 10.0))]);
        let spline = Spline::straight(Vec3::ZERO, Vec3::X, 250.0);
        let settings = CompositionSettings::fill(entry("post").with_scale(2.0));

        let segments = settings.layout(&spline, &bounds, true).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((segments[0].values.start - Vec3::new(0.0, 20.0, 0.0)).length() < 0.1);
        assert!((segments[0].values.end - Vec3::new(200.0, 20.0, 0.0)).length() < 0.1);
        assert_eq!(segments[0].values.end_scale, Vec2::splat(2.0));
    }

    #[test]
    fn test_extend_one_segment_per_point_pair() {
        let bounds = bounds(&[
            ("rail", Vec3::new(50.0, 4.0, 4.0)),
            ("fence", Vec3::new(25.0, 4.0, 4.0)),
        ]);
        let spline = Spline::new(vec![
            Vec3::ZERO,
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 50.0),
            Vec3::new(175.0, 0.0, 50.0),
        ]);
        let settings = CompositionSettings::fill(entry("rail"))
            .with_gap(30.0)
            .with_placement(PlacementMethod::Extend);

        let segments = settings.layout(&spline, &bounds, false).unwrap();
        assert_eq!(segments.len(), spline.point_count() - 1);
        let scales: Vec<f32> = segments.iter().map(|s| s.values.start_scale.x).collect();
        assert_eq!(scales, vec![2.0, 1.0, 1.5]);
        // Gap never applies: segments share their control points
        assert_eq!(segments[0].values.end, segments[1].values.start);

        // Non-fill methods stretch the first listed mesh
        let mut listed = settings.clone();
        listed.composition_method = CompositionMethod::Usual;
        listed.compositions = vec![entry("fence"), entry("rail")];
        let segments = listed.layout(&spline, &bounds, false).unwrap();
        assert!(segments.iter().all(|s| s.mesh == "fence"));
        assert_eq!(segments[0].values.start_scale.x, 4.0);
    }

    #[test]
    fn test_extend_with_invalid_mesh_is_empty() {
        let bounds = bounds(&[]);
        let spline = Spline::new(vec![Vec3::ZERO, Vec3::X * 10.0]);
        let settings =
            CompositionSettings::fill(entry("missing")).with_placement(PlacementMethod::Extend);
        assert!(settings.layout(&spline, &bounds, true).unwrap().is_empty());
    }
}
