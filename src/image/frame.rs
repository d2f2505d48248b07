//! Owned frames as they travel from the acquisition side to the worker.
use super::ImageU16;
use crate::types::Resolution;

/// One raw depth map, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDepthFrame {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl RawDepthFrame {
    /// `None` if `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: u16) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn as_view(&self) -> ImageU16<'_> {
        ImageU16 {
            w: self.width,
            h: self.height,
            stride: self.width,
            data: &self.data,
        }
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }
}

/// Interleaved RGB8 color frame from the sensor's color stream.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ColorFrame {
    /// `None` if `data.len() != width * height * 3`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height * 3).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn rgb(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Luma conversion (BT.601 integer weights).
    pub fn to_gray(&self) -> GrayFrame {
        let data = self
            .data
            .chunks_exact(3)
            .map(|p| ((77 * p[0] as u32 + 150 * p[1] as u32 + 29 * p[2] as u32) >> 8) as u8)
            .collect();
        GrayFrame::new(self.width, self.height, data)
    }
}

/// Owned 8-bit grayscale buffer with borrowed view conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Everything the acquisition side hands over for one cycle.
#[derive(Clone, Debug)]
pub struct SensorFrame {
    pub depth: RawDepthFrame,
    pub color: Option<ColorFrame>,
}

impl SensorFrame {
    pub fn depth_only(depth: RawDepthFrame) -> Self {
        Self { depth, color: None }
    }
}
