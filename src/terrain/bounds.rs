// ============================================
// Bounds - Ограничивающий бокс компонента
// ============================================

use ultraviolet::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Радиус описанной сферы
    #[inline]
    pub fn radius(&self) -> f32 {
        self.extent().mag()
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x
            && p.y >= self.min.y && p.y <= self.max.y
            && p.z >= self.min.z && p.z <= self.max.z
    }

    /// Расстояние от точки до бокса (0 внутри)
    pub fn distance_to(&self, p: Vec3) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        Vec3::new(dx, dy, dz).mag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_contains() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 2.0));
        assert!(aabb.contains(Vec3::new(5.0, 5.0, 1.0)));
        assert_eq!(aabb.distance_to(Vec3::new(5.0, 5.0, 1.0)), 0.0);
        assert_eq!(aabb.distance_to(Vec3::new(13.0, 14.0, 1.0)), 5.0);
        assert_eq!(aabb.center(), Vec3::new(5.0, 5.0, 1.0));
    }
}
