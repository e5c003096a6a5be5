use anyhow::Result;
use rand::Rng;

use super::{FrameSource, RawFrame};

/// Frame source that renders a moving gradient with a little noise. Stands in
/// for a real camera in the demo binary and in tests.
pub struct SyntheticSource {
    width: u32,
    height: u32,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for SyntheticSource {
    fn latest_frame(&self) -> Result<Option<RawFrame>> {
        let mut rng = rand::thread_rng();
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        let phase: u8 = rng.gen();

        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x * 255) / self.width.max(1)) as u8;
                let g = ((y * 255) / self.height.max(1)) as u8;
                let noise: u8 = rng.gen_range(0..16);
                pixels.push(r.wrapping_add(phase));
                pixels.push(g);
                pixels.push(noise.wrapping_mul(16));
            }
        }

        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            pixels,
        }))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
