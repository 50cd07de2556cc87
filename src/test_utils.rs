use rand::prelude::Distribution;
use static_assertions::assert_eq_size;

use crate::layout::PointRecord;

#[derive(Default, Copy, Clone, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub(crate) struct PointXYZ {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub _padding: f32,
}

impl PointXYZ {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }
}

impl PointRecord for PointXYZ {
    type Scalar = f32;
}

#[derive(Default, Copy, Clone, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub(crate) struct PointXYZRGBNormal {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub curvature: f32,
    pub rgb: f32,
    pub _padding: [f32; 2],
}

impl PointRecord for PointXYZRGBNormal {
    type Scalar = f32;
}

assert_eq_size!(PointXYZ, [f32; 4]);
assert_eq_size!(PointXYZRGBNormal, [f32; 12]);

pub(crate) struct DefaultPointDistribution;

impl Distribution<PointXYZ> for DefaultPointDistribution {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> PointXYZ {
        PointXYZ::new(rng.gen(), rng.gen(), rng.gen())
    }
}

impl Distribution<PointXYZRGBNormal> for DefaultPointDistribution {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> PointXYZRGBNormal {
        PointXYZRGBNormal {
            position: [rng.gen(), rng.gen(), rng.gen(), 1.0],
            normal: [rng.gen(), rng.gen(), rng.gen(), 0.0],
            curvature: rng.gen(),
            rgb: rng.gen(),
            _padding: [0.0; 2],
        }
    }
}

/// Creates `count` points whose coordinates encode their index, so that reordering is easy to spot in tests
pub(crate) fn indexed_points(count: usize) -> Vec<PointXYZ> {
    (0..count)
        .map(|idx| {
            let idx = idx as f32;
            PointXYZ::new(idx, idx * 10.0, idx * 100.0)
        })
        .collect()
}
