use crate::types::{Resolution, Roi};

/// Row access shared by the raw and filtered depth buffers.
///
/// Processing passes walk frames row by row and only ever touch the columns
/// of the current ROI, so the trait hands out whole rows or their ROI span.
pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];

    fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Columns `roi.x0..roi.x1` of row `y`.
    ///
    /// The ROI must already be clamped to the frame.
    fn roi_row(&self, y: usize, roi: &Roi) -> &[Self::Pixel] {
        &self.row(y)[roi.x0..roi.x1]
    }

    /// True when the frame has the given sensor resolution.
    fn matches(&self, res: Resolution) -> bool {
        self.width() == res.width && self.height() == res.height
    }
}
