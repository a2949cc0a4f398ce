use crate::Aabb;

/// A point cloud stored as a struct of arrays: one column per field.
///
/// The `x`, `y`, `z` columns are always present; `intensity` and `colors`
/// are optional auxiliary columns. Every present column has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub intensity: Option<Vec<f32>>,
    pub colors: Option<Colors>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colors {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            intensity: None,
            colors: None,
        }
    }

    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        Self {
            x,
            y,
            z,
            intensity: None,
            colors: None,
        }
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_cloud(self)
    }

    /// True when all three coordinates of point `i` are finite.
    pub fn is_finite(&self, i: usize) -> bool {
        self.x[i].is_finite() && self.y[i].is_finite() && self.z[i].is_finite()
    }

    pub fn has_intensity(&self) -> bool {
        self.intensity.is_some()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// An empty cloud with the same field set as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            intensity: self.intensity.as_ref().map(|_| Vec::new()),
            colors: self.colors.as_ref().map(|_| Colors {
                r: Vec::new(),
                g: Vec::new(),
                b: Vec::new(),
            }),
        }
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Colors, PointCloud};
    use proptest::prelude::*;

    #[test]
    fn new_is_empty() {
        let cloud = PointCloud::new();
        assert!(cloud.is_empty());
        assert_eq!(cloud.len(), 0);
    }

    #[test]
    fn from_xyz_builds_cloud() {
        let cloud = PointCloud::from_xyz(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.point(0), [1.0, 3.0, 5.0]);
        assert_eq!(cloud.point(1), [2.0, 4.0, 6.0]);
    }

    #[test]
    fn iter_points_yields_xyz_tuples() {
        let cloud = PointCloud::from_xyz(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
        let pts: Vec<[f32; 3]> = cloud.iter_points().collect();
        assert_eq!(pts, vec![[1.0, 3.0, 5.0], [2.0, 4.0, 6.0]]);
    }

    #[test]
    fn is_finite_flags_bad_points() {
        let cloud = PointCloud::from_xyz(
            vec![0.0, f32::NAN, 2.0],
            vec![1.0, 2.0, f32::INFINITY],
            vec![4.0, 5.0, 6.0],
        );
        assert!(cloud.is_finite(0));
        assert!(!cloud.is_finite(1));
        assert!(!cloud.is_finite(2));
    }

    #[test]
    fn empty_like_preserves_field_set() {
        let mut cloud = PointCloud::from_xyz(vec![1.0], vec![2.0], vec![3.0]);
        cloud.intensity = Some(vec![0.5]);
        cloud.colors = Some(Colors {
            r: vec![255],
            g: vec![0],
            b: vec![0],
        });

        let empty = cloud.empty_like();
        assert!(empty.is_empty());
        assert!(empty.has_intensity());
        assert!(empty.has_colors());

        let plain = PointCloud::from_xyz(vec![1.0], vec![2.0], vec![3.0]);
        let empty = plain.empty_like();
        assert!(!empty.has_intensity());
        assert!(!empty.has_colors());
    }

    #[test]
    #[should_panic]
    fn from_xyz_panics_on_mismatch() {
        let _ = PointCloud::from_xyz(vec![1.0], vec![2.0, 3.0], vec![4.0]);
    }

    proptest! {
        #[test]
        fn aabb_contains_all_finite_points(
            pts in prop::collection::vec(
                (-1000.0f32..1000.0f32, -1000.0f32..1000.0f32, -1000.0f32..1000.0f32),
                1..500
            )
        ) {
            let cloud = PointCloud::from_xyz(
                pts.iter().map(|p| p.0).collect(),
                pts.iter().map(|p| p.1).collect(),
                pts.iter().map(|p| p.2).collect(),
            );
            let aabb = cloud.aabb();
            for p in cloud.iter_points() {
                prop_assert!(aabb.contains(&p));
            }
        }
    }
}
