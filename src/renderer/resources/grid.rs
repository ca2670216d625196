use glam::{Mat4, Vec3};

/// Model matrices of a square grid of cubes on the XZ plane, one unit apart, regenerated on
/// every call to [`GridInstances::new`]. Row-major: `x` is the outer loop, `z` the inner one.
#[derive(Debug, Clone)]
pub struct GridInstances {
    size: u32,
    next: u64,
}

impl GridInstances {
    pub fn new(size: u32) -> Self {
        Self { size, next: 0 }
    }

    /// Total number of cells. Widened so any `u32` side length fits.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.size) * u64::from(self.size)
    }

    pub fn cell_transform(x: u32, z: u32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x as f32, 0.0, z as f32))
    }
}

impl Iterator for GridInstances {
    type Item = Mat4;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.cell_count() {
            return None;
        }
        let size = u64::from(self.size);
        // Both quotient and remainder are below `size`, so they fit back into u32
        let x = (self.next / size) as u32;
        let z = (self.next % size) as u32;
        self.next += 1;
        Some(Self::cell_transform(x, z))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cell_count() - self.next;
        match usize::try_from(remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}
