//! Batch CPU tracing over an image plane. Construction is single-threaded,
//! queries are not: rows fan out across the rayon pool against the shared
//! read-only store.

use glam::Vec3;
use rayon::prelude::*;

use hashdag_core::dag::DEFAULT_RAY_PERTURBATION;
use hashdag_core::HashDag;

/// Camera-plane description of a ray bundle: one primary ray per pixel,
/// aimed from `camera_position` through `ray_min + x * ray_ddx + y * ray_ddy`.
#[derive(Debug, Clone, Copy)]
pub struct TracingParameters {
    pub camera_position: Vec3,
    /// World position the top-left pixel's ray passes through.
    pub ray_min: Vec3,
    /// Image-plane step per pixel column.
    pub ray_ddx: Vec3,
    /// Image-plane step per pixel row.
    pub ray_ddy: Vec3,
}

impl TracingParameters {
    /// Plane one unit in front of the camera, `fov_y` vertical field of
    /// view, square pixels.
    pub fn for_frame(
        camera_position: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y: f32,
        width: usize,
        height: usize,
    ) -> Self {
        let forward = forward.normalize();
        let right = forward.cross(up).normalize();
        let true_up = right.cross(forward);

        let half_height = (fov_y * 0.5).tan();
        let half_width = half_height * width as f32 / height as f32;

        let ray_min = camera_position + forward - right * half_width + true_up * half_height;
        TracingParameters {
            camera_position,
            ray_min,
            ray_ddx: right * (2.0 * half_width / width as f32),
            ray_ddy: -true_up * (2.0 * half_height / height as f32),
        }
    }

    fn direction(&self, x: usize, y: usize) -> Vec3 {
        self.ray_min + self.ray_ddx * x as f32 + self.ray_ddy * y as f32 - self.camera_position
    }
}

/// 0/255 per pixel, 255 where the pixel's ray hits a voxel.
pub fn render_hit_mask(
    dag: &HashDag,
    tp: &TracingParameters,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let perturbation = Vec3::splat(DEFAULT_RAY_PERTURBATION);
    let mut image = vec![0u8; width * height];
    image.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, pixel) in row.iter_mut().enumerate() {
            if dag
                .cast_ray(tp.camera_position, tp.direction(x, y), perturbation)
                .is_some()
            {
                *pixel = 255;
            }
        }
    });
    image
}

/// Distance from the camera to the center of the first voxel each pixel's
/// ray hits; `f32::INFINITY` where it misses.
pub fn render_depth(
    dag: &HashDag,
    tp: &TracingParameters,
    width: usize,
    height: usize,
) -> Vec<f32> {
    let perturbation = Vec3::splat(DEFAULT_RAY_PERTURBATION);
    let mut image = vec![f32::INFINITY; width * height];
    image.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, pixel) in row.iter_mut().enumerate() {
            if let Some(voxel) =
                dag.cast_ray(tp.camera_position, tp.direction(x, y), perturbation)
            {
                let center = voxel.as_vec3() + Vec3::splat(0.5);
                *pixel = (center - tp.camera_position).length();
            }
        }
    });
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::import_grid;
    use crate::grid::SparseGrid;
    use glam::IVec3;

    fn boxed_grid() -> SparseGrid {
        // A solid 16^3 box around (40, 40, 40).
        let mut grid = SparseGrid::new();
        for x in 32..48 {
            for y in 32..48 {
                for z in 32..48 {
                    grid.set_voxel(IVec3::new(x, y, z));
                }
            }
        }
        grid
    }

    #[test]
    fn center_pixel_hits_the_box_and_corners_miss() {
        let dag = import_grid(&boxed_grid()).unwrap();
        let tp = TracingParameters::for_frame(
            Vec3::new(40.0, 40.0, 4.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            std::f32::consts::FRAC_PI_3,
            32,
            32,
        );
        let image = render_hit_mask(&dag, &tp, 32, 32);
        assert_eq!(image.len(), 32 * 32);
        assert_eq!(image[16 * 32 + 16], 255, "center ray must hit the box");
        assert_eq!(image[0], 0, "corner ray must miss");
        assert_eq!(image[32 * 32 - 1], 0, "corner ray must miss");

        let depth = render_depth(&dag, &tp, 32, 32);
        let center = depth[16 * 32 + 16];
        // The box face nearest the camera is ~28 units away.
        assert!(center > 20.0 && center < 40.0, "depth {}", center);
        assert!(depth[0].is_infinite());
    }
}
