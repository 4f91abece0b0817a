use ndarray::{Array2, Array3, ArrayView2, s};

/// Calibrated 3-D voxel data ordered (depth, height, width).
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    /// Wrap an already stacked array. Returns `None` for a volume without
    /// slices.
    pub fn new(data: Array3<f32>) -> Option<Self> {
        if data.dim().0 == 0 {
            return None;
        }
        Some(Self { data })
    }

    /// Stack equally sized 2-D slices along a new leading axis.
    ///
    /// Returns `None` if `slices` is empty or the slice dimensions differ.
    pub fn from_slices(slices: &[Array2<f32>]) -> Option<Self> {
        let first_dim = slices.first()?.dim();
        if slices.iter().any(|slice| slice.dim() != first_dim) {
            return None;
        }

        let (height, width) = first_dim;
        let mut data = Array3::<f32>::zeros((slices.len(), height, width));
        for (i, slice) in slices.iter().enumerate() {
            data.slice_mut(s![i, .., ..]).assign(slice);
        }

        Some(Self { data })
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of slices
    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Slice `index` along the depth axis, `None` when out of range.
    pub fn slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.depth()).then(|| self.data.slice(s![index, .., ..]))
    }

    /// Apply the linear calibration `value * slope + intercept` in place.
    pub(crate) fn rescale(&mut self, slope: f32, intercept: f32) {
        if slope == 1.0 && intercept == 0.0 {
            return;
        }
        self.data.par_mapv_inplace(|v| v.mul_add(slope, intercept));
    }
}
