//! Dense depth maps and the estimator seam.

use image::RgbImage;
use perceptor_core::PerceptorError;

/// Monocular depth model: one relative-depth value per output pixel.
pub trait DepthEstimator: Send + Sync {
    fn name(&self) -> &str;

    /// Estimate depth for `frame`. The map may be at model resolution.
    fn estimate(&self, frame: &RgbImage) -> Result<DepthMap, PerceptorError>;
}

/// Row-major `f32` depth grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, PerceptorError> {
        if width == 0 || height == 0 {
            return Err(PerceptorError::ModelInference("depth map has no pixels".to_string()));
        }
        if values.len() != width as usize * height as usize {
            return Err(PerceptorError::ModelInference(format!(
                "depth map of {width}x{height} expects {} values, got {}",
                width as usize * height as usize,
                values.len()
            )));
        }
        Ok(Self { width, height, values })
    }

    /// Map filled with `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            values: vec![value; width.max(1) as usize * height.max(1) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get((y * self.width + x) as usize).copied()
    }

    /// Bilinear resize with half-pixel centers and edge clamping.
    pub fn resize_bilinear(&self, width: u32, height: u32) -> DepthMap {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let width = width.max(1);
        let height = height.max(1);
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
            let y0 = fy.floor() as u32;
            let y1 = (y0 + 1).min(self.height - 1);
            let wy = fy - y0 as f32;
            for x in 0..width {
                let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
                let x0 = fx.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let wx = fx - x0 as f32;

                let top = self.at(x0, y0) * (1.0 - wx) + self.at(x1, y0) * wx;
                let bottom = self.at(x0, y1) * (1.0 - wx) + self.at(x1, y1) * wx;
                values.push(top * (1.0 - wy) + bottom * wy);
            }
        }
        DepthMap { width, height, values }
    }

    /// Min-max normalize to `0..=255`, truncating to integers. A flat map
    /// becomes all zeros; non-finite samples become zero.
    pub fn normalize(&self) -> NormalizedDepth {
        let (min, max) = self
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let range = max - min;

        let values = if range.is_finite() && range > 0.0 {
            self.values
                .iter()
                .map(|v| {
                    if v.is_finite() {
                        ((v - min) * 255.0 / range).clamp(0.0, 255.0) as u8
                    } else {
                        0
                    }
                })
                .collect()
        } else {
            vec![0; self.values.len()]
        };
        NormalizedDepth {
            width: self.width,
            height: self.height,
            values,
        }
    }

    fn at(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

/// Depth map rescaled to 8-bit levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDepth {
    width: u32,
    height: u32,
    values: Vec<u8>,
}

impl NormalizedDepth {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Level at column `x`, row `y`.
    pub fn at(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        self.values.get(y as usize * self.width as usize + x as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(DepthMap::new(2, 2, vec![0.0; 3]).is_err());
        assert!(DepthMap::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn normalize_spans_full_range() {
        let map = DepthMap::new(3, 1, vec![2.0, 4.0, 6.0]).unwrap();
        let norm = map.normalize();
        assert_eq!(norm.at(0, 0), Some(0));
        assert_eq!(norm.at(1, 0), Some(127));
        assert_eq!(norm.at(2, 0), Some(255));
        assert_eq!(norm.at(3, 0), None);
        assert_eq!(norm.at(-1, 0), None);
    }

    #[test]
    fn flat_map_normalizes_to_zero() {
        let norm = DepthMap::filled(4, 4, 7.5).normalize();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(norm.at(x, y), Some(0));
            }
        }
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let map = DepthMap::new(3, 1, vec![f32::NAN, 0.0, 10.0]).unwrap();
        let norm = map.normalize();
        assert_eq!(norm.at(0, 0), Some(0));
        assert_eq!(norm.at(2, 0), Some(255));
    }

    #[test]
    fn resize_preserves_constant_and_gradients() {
        let flat = DepthMap::filled(2, 2, 3.0).resize_bilinear(5, 7);
        assert_eq!((flat.width(), flat.height()), (5, 7));
        assert!(flat.values.iter().all(|v| (*v - 3.0).abs() < 1e-6));

        let ramp = DepthMap::new(2, 1, vec![0.0, 1.0]).unwrap().resize_bilinear(4, 1);
        // Half-pixel sampling: edges clamp, interior interpolates.
        let expected = [0.0, 0.25, 0.75, 1.0];
        for (x, want) in expected.iter().enumerate() {
            assert!((ramp.get(x as u32, 0).unwrap() - want).abs() < 1e-6);
        }
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let map = DepthMap::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(map.resize_bilinear(2, 2), map);
    }
}
