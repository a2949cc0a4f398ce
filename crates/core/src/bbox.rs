use crate::PointCloud;

/// Axis-aligned bounding box over the finite points of a cloud.
///
/// Points with any NaN or infinite coordinate never contribute to the
/// bounds. A box built over zero finite points reports `is_empty()` and
/// holds no usable min/max.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
    empty: bool,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn expand_with_point(&mut self, point: [f32; 3]) {
        if !point.iter().all(|v| v.is_finite()) {
            return;
        }

        if self.empty {
            self.min = point;
            self.max = point;
            self.empty = false;
            return;
        }

        for (axis, &val) in point.iter().enumerate() {
            self.min[axis] = self.min[axis].min(val);
            self.max[axis] = self.max[axis].max(val);
        }
    }

    pub fn contains(&self, point: &[f32; 3]) -> bool {
        if self.empty || !point.iter().all(|v| v.is_finite()) {
            return false;
        }

        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// Per-axis extent `max - min`. Zero for an empty box.
    pub fn extent(&self) -> [f32; 3] {
        if self.empty {
            return [0.0; 3];
        }
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn from_cloud(cloud: &PointCloud) -> Self {
        let mut aabb = Self::empty();
        for p in cloud.iter_points() {
            aabb.expand_with_point(p);
        }
        aabb
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb;
    use crate::PointCloud;

    #[test]
    fn empty_box_reports_empty() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert!(!aabb.contains(&[0.0, 0.0, 0.0]));
        assert_eq!(aabb.extent(), [0.0; 3]);
    }

    #[test]
    fn expand_tracks_min_max() {
        let mut aabb = Aabb::empty();
        aabb.expand_with_point([1.0, 2.0, 3.0]);
        aabb.expand_with_point([-1.0, 5.0, 0.0]);
        assert_eq!(aabb.min, [-1.0, 2.0, 0.0]);
        assert_eq!(aabb.max, [1.0, 5.0, 3.0]);
        assert_eq!(aabb.extent(), [2.0, 3.0, 3.0]);
    }

    #[test]
    fn expand_skips_non_finite() {
        let mut aabb = Aabb::empty();
        aabb.expand_with_point([f32::NAN, 0.0, 0.0]);
        aabb.expand_with_point([f32::INFINITY, 0.0, 0.0]);
        assert!(aabb.is_empty());

        aabb.expand_with_point([1.0, 1.0, 1.0]);
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, [1.0; 3]);
        assert_eq!(aabb.max, [1.0; 3]);
    }

    #[test]
    fn from_cloud_ignores_nan_points() {
        let cloud = PointCloud::from_xyz(
            vec![0.0, f32::NAN, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
        );
        let aabb = Aabb::from_cloud(&cloud);
        assert!(aabb.contains(&[0.0, 1.0, 4.0]));
        assert!(aabb.contains(&[2.0, 3.0, 6.0]));
        assert!(!aabb.contains(&[f32::NAN, 2.0, 5.0]));
    }

    #[test]
    fn from_cloud_all_non_finite_is_empty() {
        let cloud = PointCloud::from_xyz(
            vec![f32::NAN, f32::INFINITY],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
        );
        assert!(Aabb::from_cloud(&cloud).is_empty());
    }

    #[test]
    fn single_point_box_is_degenerate() {
        let cloud = PointCloud::from_xyz(vec![42.0], vec![-1.0], vec![0.5]);
        let aabb = Aabb::from_cloud(&cloud);
        assert_eq!(aabb.min, aabb.max);
        assert_eq!(aabb.extent(), [0.0; 3]);
        assert!(aabb.contains(&[42.0, -1.0, 0.5]));
    }
}
