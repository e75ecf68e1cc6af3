//! Mesh rotation settings and per-index rotation resolution.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use bevy::prelude::*;

/// The axis a mesh segment is rotated around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Default)]
pub enum RotationAxis {
    /// Roll around the segment's forward axis.
    #[default]
    X,
    /// Swing the segment end around the Y axis.
    Y,
    /// Swing the segment end around the Z axis.
    Z,
}

/// How rotations are assigned to the placed meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Default)]
pub enum RotationMethod {
    /// No rotation; segments do not bend.
    #[default]
    None,
    /// One rotation for every mesh.
    Regular,
    /// One rotation per mesh index.
    Irregular,
    /// Rotations assigned to index ranges.
    Group,
    /// Rotations assigned to explicit index lists.
    Angle,
}

/// A rotation applied to one mesh segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Default)]
pub struct MeshRotation {
    /// The axis used for the rotation.
    pub axis: RotationAxis,
    /// The angle in degrees.
    pub angle: f32,
}

impl MeshRotation {
    /// Create a rotation around `axis` by `angle` degrees.
    pub fn new(axis: RotationAxis, angle: f32) -> Self {
        Self { axis, angle }
    }
}

/// A rotation applied to every mesh from `start_index` to `end_index` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Default)]
pub struct GroupMeshRotation {
    /// First mesh index of the group.
    pub start_index: usize,
    /// Last mesh index of the group. Never lower than `start_index` once normalized.
    pub end_index: usize,
    /// Rotation applied to the group.
    pub rotation: MeshRotation,
}

impl Default for GroupMeshRotation {
    fn default() -> Self {
        Self {
            start_index: 0,
            end_index: 1,
            rotation: MeshRotation::default(),
        }
    }
}

impl GroupMeshRotation {
    /// Create a group rotation, correcting an end index below the start index.
    pub fn new(start_index: usize, end_index: usize, rotation: MeshRotation) -> Self {
        let mut group = Self {
            start_index,
            end_index,
            rotation,
        };
        group.normalize();
        group
    }

    /// Clamp `end_index` up to `start_index`. Returns `true` if a correction was made.
    pub fn normalize(&mut self) -> bool {
        if self.end_index < self.start_index {
            self.end_index = self.start_index;
            true
        } else {
            false
        }
    }

    /// Mesh indexes covered by this group.
    pub fn indexes(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index.max(self.start_index)
    }
}

/// A rotation applied to an explicit list of mesh indexes.
#[derive(Debug, Clone, PartialEq, Default, Reflect)]
#[reflect(Default)]
pub struct AngleMeshRotation {
    /// Indexes of the meshes to rotate.
    pub indexes: Vec<usize>,
    /// Rotation applied to the selected meshes.
    pub rotation: MeshRotation,
}

impl AngleMeshRotation {
    /// Create a rotation for the given indexes.
    pub fn new(indexes: impl Into<Vec<usize>>, rotation: MeshRotation) -> Self {
        Self {
            indexes: indexes.into(),
            rotation,
        }
    }
}

/// User-authored rotation settings.
///
/// Only the tables matching [`RotationRegistry::method`] are consulted when
/// rotations are resolved.
#[derive(Debug, Clone, Default, Reflect)]
#[reflect(Default)]
pub struct RotationRegistry {
    /// Active rotation method.
    pub method: RotationMethod,
    /// Rotation for every mesh, and the fallback for indexes without override.
    pub regular: MeshRotation,
    /// Per-index rotations (used by [`RotationMethod::Irregular`]).
    pub irregular: Vec<MeshRotation>,
    /// Index range rotations (used by [`RotationMethod::Group`]).
    pub groups: Vec<GroupMeshRotation>,
    /// Index list rotations (used by [`RotationMethod::Angle`]).
    pub angles: Vec<AngleMeshRotation>,
}

impl RotationRegistry {
    /// Create a registry using a single rotation for every mesh.
    pub fn regular(rotation: MeshRotation) -> Self {
        Self {
            method: RotationMethod::Regular,
            regular: rotation,
            ..default()
        }
    }

    /// Create a registry with one rotation per mesh index.
    pub fn irregular(rotations: Vec<MeshRotation>) -> Self {
        Self {
            method: RotationMethod::Irregular,
            irregular: rotations,
            ..default()
        }
    }

    /// Create a registry from index range rotations.
    pub fn group(groups: Vec<GroupMeshRotation>) -> Self {
        let mut registry = Self {
            method: RotationMethod::Group,
            groups,
            ..default()
        };
        registry.normalize_groups();
        registry
    }

    /// Create a registry from index list rotations.
    pub fn angle(angles: Vec<AngleMeshRotation>) -> Self {
        Self {
            method: RotationMethod::Angle,
            angles,
            ..default()
        }
    }

    /// Switch the rotation method, clearing every rotation value.
    pub fn set_method(&mut self, method: RotationMethod) {
        *self = Self {
            method,
            ..default()
        };
    }

    /// Append a group rotation, correcting its range.
    pub fn add_group(&mut self, group: GroupMeshRotation) {
        let mut group = group;
        group.normalize();
        self.groups.push(group);
    }

    /// Append an index list rotation.
    pub fn add_angle(&mut self, angle: AngleMeshRotation) {
        self.angles.push(angle);
    }

    /// Correct every group whose end index is before its start index.
    ///
    /// Returns the number of corrected groups.
    pub fn normalize_groups(&mut self) -> usize {
        self.groups
            .iter_mut()
            .map(GroupMeshRotation::normalize)
            .filter(|&corrected| corrected)
            .count()
    }

    /// Expand the settings into a lookup table for `instance_count` meshes.
    pub fn table(&self, instance_count: usize) -> RotationTable {
        let mut overrides = BTreeMap::new();

        match self.method {
            RotationMethod::None | RotationMethod::Regular => {}
            RotationMethod::Irregular => {
                overrides.extend(self.irregular.iter().copied().enumerate());
            }
            RotationMethod::Group => {
                for group in &self.groups {
                    for index in group.indexes() {
                        if index >= instance_count {
                            break;
                        }
                        overrides.insert(index, group.rotation);
                    }
                }
            }
            RotationMethod::Angle => {
                for angle in &self.angles {
                    for &index in angle.indexes.iter().filter(|&&i| i < instance_count) {
                        overrides.insert(index, angle.rotation);
                    }
                }
            }
        }

        RotationTable {
            method: self.method,
            regular: self.regular,
            overrides,
        }
    }
}

/// Resolved rotations for one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationTable {
    method: RotationMethod,
    regular: MeshRotation,
    overrides: BTreeMap<usize, MeshRotation>,
}

impl RotationTable {
    /// The rotation method the table was built for.
    pub fn method(&self) -> RotationMethod {
        self.method
    }

    /// Rotation for the mesh at `index`, falling back to the regular rotation.
    pub fn resolve(&self, index: usize) -> MeshRotation {
        self.overrides.get(&index).copied().unwrap_or(self.regular)
    }

    /// Indexes that carry an explicit override.
    pub fn overridden_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.overrides.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw(angle: f32) -> MeshRotation {
        MeshRotation::new(RotationAxis::Z, angle)
    }

    #[test]
    fn test_regular_applies_everywhere() {
        let table = RotationRegistry::regular(yaw(15.0)).table(4);
        for index in 0..10 {
            assert_eq!(table.resolve(index), yaw(15.0));
        }
        assert_eq!(table.overridden_indexes().count(), 0);
    }

    #[test]
    fn test_irregular_falls_back_to_regular() {
        let mut registry = RotationRegistry::irregular(vec![yaw(10.0), yaw(20.0)]);
        registry.regular = yaw(5.0);
        let table = registry.table(5);

        assert_eq!(table.resolve(0), yaw(10.0));
        assert_eq!(table.resolve(1), yaw(20.0));
        assert_eq!(table.resolve(4), yaw(5.0));
    }

    #[test]
    fn test_group_end_before_start_is_corrected() {
        let group = GroupMeshRotation::new(3, 1, yaw(45.0));
        assert_eq!(group.start_index, 3);
        assert_eq!(group.end_index, 3);

        let mut raw = GroupMeshRotation {
            start_index: 3,
            end_index: 1,
            rotation: yaw(45.0),
        };
        assert!(raw.normalize());
        assert_eq!(raw.indexes(), 3..=3);
        assert!(!raw.normalize());
    }

    #[test]
    fn test_group_table_covers_single_index_after_correction() {
        let mut registry = RotationRegistry {
            method: RotationMethod::Group,
            ..default()
        };
        registry.groups.push(GroupMeshRotation {
            start_index: 3,
            end_index: 1,
            rotation: yaw(45.0),
        });
        assert_eq!(registry.normalize_groups(), 1);

        let table = registry.table(6);
        assert_eq!(table.overridden_indexes().collect::<Vec<_>>(), vec![3]);
        assert_eq!(table.resolve(3), yaw(45.0));
        assert_eq!(table.resolve(2), MeshRotation::default());
    }

    #[test]
    fn test_group_expansion_is_capped_by_instance_count() {
        let group = GroupMeshRotation::new(2, usize::MAX, yaw(30.0));
        let registry = RotationRegistry::group(vec![group]);
        let table = registry.table(5);
        assert_eq!(table.overridden_indexes().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_angle_applies_to_listed_indexes() {
        let registry = RotationRegistry::angle(vec![
            AngleMeshRotation::new(vec![0, 4, 9], yaw(90.0)),
            AngleMeshRotation::new(vec![4], yaw(-90.0)),
        ]);
        let table = registry.table(6);

        assert_eq!(table.resolve(0), yaw(90.0));
        assert_eq!(table.resolve(4), yaw(-90.0));
        assert_eq!(table.resolve(9), MeshRotation::default());
        assert_eq!(table.resolve(1), MeshRotation::default());
    }

    #[test]
    fn test_set_method_resets_values() {
        let mut registry = RotationRegistry::irregular(vec![yaw(10.0)]);
        registry.regular = yaw(3.0);
        registry.set_method(RotationMethod::Group);

        assert_eq!(registry.method, RotationMethod::Group);
        assert_eq!(registry.regular, MeshRotation::default());
        assert!(registry.irregular.is_empty());
    }

    #[test]
    fn test_added_groups_and_angles_resolve() {
        let mut registry = RotationRegistry::default();
        registry.set_method(RotationMethod::Group);
        registry.add_group(GroupMeshRotation {
            start_index: 4,
            end_index: 2,
            rotation: yaw(20.0),
        });
        assert_eq!(registry.groups[0].indexes(), 4..=4);
        assert_eq!(registry.table(6).resolve(4), yaw(20.0));

        registry.set_method(RotationMethod::Angle);
        registry.add_angle(AngleMeshRotation::new(vec![1, 3], yaw(-15.0)));
        let table = registry.table(6);
        assert_eq!(table.overridden_indexes().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(table.resolve(4), MeshRotation::default());
    }
}
