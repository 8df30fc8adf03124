use glam::IVec3;

/// Axis-aligned cube given by its minimum corner and edge length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisAlignedCube {
    pub pos: IVec3,
    pub span: i32,
}

impl AxisAlignedCube {
    pub fn new(pos: IVec3, span: i32) -> Self {
        AxisAlignedCube { pos, span }
    }

    /// Half-open containment: `[pos, pos + span)` on each axis.
    pub fn contains(&self, point: IVec3) -> bool {
        point.x >= self.pos.x
            && point.x < self.pos.x + self.span
            && point.y >= self.pos.y
            && point.y < self.pos.y + self.span
            && point.z >= self.pos.z
            && point.z < self.pos.z + self.span
    }

    pub fn intersects(&self, other: &AxisAlignedCube) -> bool {
        !(other.pos.x + other.span <= self.pos.x
            || self.pos.x + self.span <= other.pos.x
            || other.pos.y + other.span <= self.pos.y
            || self.pos.y + self.span <= other.pos.y
            || other.pos.z + other.span <= self.pos.z
            || self.pos.z + self.span <= other.pos.z)
    }

    /// The eight octants, indexed by child numbering: bit 2 picks the high x
    /// half, bit 1 high y, bit 0 high z.
    pub fn split(&self) -> [AxisAlignedCube; 8] {
        let half = self.span / 2;
        let mut children = [*self; 8];
        for (c, child) in children.iter_mut().enumerate() {
            let c = c as i32;
            child.pos = self.pos + IVec3::new((c >> 2 & 1) * half, (c >> 1 & 1) * half, (c & 1) * half);
            child.span = half;
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_half_open() {
        let cube = AxisAlignedCube::new(IVec3::new(4, 4, 4), 4);
        assert!(cube.contains(IVec3::new(4, 4, 4)));
        assert!(cube.contains(IVec3::new(7, 7, 7)));
        assert!(!cube.contains(IVec3::new(8, 4, 4)));
        assert!(!cube.contains(IVec3::new(4, 3, 4)));
    }

    #[test]
    fn split_follows_child_numbering() {
        let cube = AxisAlignedCube::new(IVec3::new(0, 0, 0), 8);
        let children = cube.split();
        assert_eq!(children[0].pos, IVec3::new(0, 0, 0));
        assert_eq!(children[1].pos, IVec3::new(0, 0, 4));
        assert_eq!(children[2].pos, IVec3::new(0, 4, 0));
        assert_eq!(children[4].pos, IVec3::new(4, 0, 0));
        assert_eq!(children[7].pos, IVec3::new(4, 4, 4));
        assert!(children.iter().all(|c| c.span == 4));
        // Exactly one octant contains any given point.
        let p = IVec3::new(5, 2, 7);
        assert_eq!(children.iter().filter(|c| c.contains(p)).count(), 1);
        assert!(children[0b101].contains(p));
    }

    #[test]
    fn intersection_is_exclusive_at_faces() {
        let a = AxisAlignedCube::new(IVec3::ZERO, 4);
        let b = AxisAlignedCube::new(IVec3::new(4, 0, 0), 4);
        let c = AxisAlignedCube::new(IVec3::new(3, 3, 3), 4);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c) && c.intersects(&a));
    }
}
