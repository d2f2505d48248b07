use super::traits::ImageView;

/// Borrowed raw depth frame as delivered by the sensor, one `u16` per pixel.
///
/// Sensor SDKs may pad rows, hence the separate `stride` (in samples).
#[derive(Clone, Copy, Debug)]
pub struct ImageU16<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize,
    pub data: &'a [u16],
}

impl<'a> ImageU16<'a> {
    /// Tightly packed samples; `None` if `data` holds fewer than `w * h`.
    pub fn new(w: usize, h: usize, data: &'a [u16]) -> Option<Self> {
        Self::with_stride(w, h, w, data)
    }

    /// Padded rows of `stride` samples; `None` if the buffer is too short.
    pub fn with_stride(w: usize, h: usize, stride: usize, data: &'a [u16]) -> Option<Self> {
        let needed = if h == 0 { 0 } else { (h - 1) * stride + w };
        (stride >= w && data.len() >= needed).then_some(Self { w, h, stride, data })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.stride + x]
    }
}

impl ImageView for ImageU16<'_> {
    type Pixel = u16;

    fn width(&self) -> usize {
        self.w
    }

    fn height(&self) -> usize {
        self.h
    }

    #[inline]
    fn row(&self, y: usize) -> &[u16] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_skip_the_padding() {
        let data = [1000, 1001, 0, 1002, 1003];
        let view = ImageU16::with_stride(2, 2, 3, &data).unwrap();
        assert_eq!(view.row(1), &[1002, 1003]);
        assert_eq!(view.get(1, 0), 1001);
        assert!(ImageU16::with_stride(2, 2, 1, &data).is_none());
        assert!(ImageU16::new(3, 2, &data).is_none());
    }
}
