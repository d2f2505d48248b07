use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sand_surface::image::RawDepthFrame;
use sand_surface::types::{Resolution, Roi};

/// Constant depth everywhere.
pub fn flat(res: Resolution, depth: u16) -> RawDepthFrame {
    RawDepthFrame::filled(res.width, res.height, depth)
}

/// Walls at `wall` depth around a floor at `floor` depth inside `interior`.
pub fn walled_box(res: Resolution, interior: Roi, floor: u16, wall: u16) -> RawDepthFrame {
    let mut frame = flat(res, wall);
    let w = res.width;
    for (i, px) in frame.data_mut().iter_mut().enumerate() {
        if interior.contains(i % w, i / w) {
            *px = floor;
        }
    }
    frame
}

/// Depth increasing linearly to the right by `slope` per pixel.
pub fn ramp_x(res: Resolution, base: u16, slope: u16) -> RawDepthFrame {
    let mut frame = flat(res, base);
    let w = res.width;
    for (i, px) in frame.data_mut().iter_mut().enumerate() {
        *px = base + slope * (i % w) as u16;
    }
    frame
}

/// Seeded source of `base ± amplitude` frames with uniform integer noise.
pub struct NoisySource {
    rng: StdRng,
    res: Resolution,
}

impl NoisySource {
    pub fn new(res: Resolution, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            res,
        }
    }

    pub fn frame(&mut self, base: u16, amplitude: u16) -> RawDepthFrame {
        let mut frame = flat(self.res, base);
        for px in frame.data_mut() {
            let noise = self.rng.random_range(0..=2 * amplitude);
            *px = base - amplitude + noise;
        }
        frame
    }
}
