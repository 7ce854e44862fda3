/// Axis-aligned bounding box used for domain extents, spatial binning and
/// tolerance resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }

    /// Smallest box enclosing a flat `[x, y, z, ...]` coordinate array.
    /// Returns `None` for an empty array.
    pub fn from_points(points: &[f64]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let mut b = BoundingBox::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for p in points.chunks_exact(3) {
            b.min_x = b.min_x.min(p[0]);
            b.min_y = b.min_y.min(p[1]);
            b.min_z = b.min_z.min(p[2]);
            b.max_x = b.max_x.max(p[0]);
            b.max_y = b.max_y.max(p[1]);
            b.max_z = b.max_z.max(p[2]);
        }
        Some(b)
    }

    pub fn extents(&self) -> [f64; 3] {
        [
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        ]
    }

    /// Length of the main diagonal. Percentage-valued tolerances (repair
    /// epsilon, border margin) resolve against this.
    pub fn diagonal(&self) -> f64 {
        let [ex, ey, ez] = self.extents();
        (ex * ex + ey * ey + ez * ez).sqrt()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let b = BoundingBox::from_points(&[0.0, 1.0, 2.0, -1.0, 5.0, 0.5]).unwrap();
        assert_eq!(b.min_x, -1.0);
        assert_eq!(b.max_y, 5.0);
        assert_eq!(b.max_z, 2.0);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_diagonal() {
        let b = BoundingBox::new(0.0, 0.0, 0.0, 3.0, 4.0, 12.0);
        assert!((b.diagonal() - 13.0).abs() < 1e-12);
    }
}
