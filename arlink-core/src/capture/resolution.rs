//! Downscaled capture resolution.

use crate::capture::types::Resolution;
use crate::error::ArlinkError;

/// Scale `display` by `scale`, rounding each axis to the nearest integer
/// (halves away from zero).
///
/// Zero-area input gives a zero-area result.
pub fn compute_resolution(display_width: u32, display_height: u32, scale: f64) -> Resolution {
    Resolution {
        width: scale_axis(display_width, scale),
        height: scale_axis(display_height, scale),
    }
}

fn scale_axis(length: u32, scale: f64) -> u32 {
    // f64::round already rounds half away from zero.
    (length as f64 * scale).round() as u32
}

/// Holds a validated scale factor and maps live display sizes to
/// capture sizes. The display size itself is never cached.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionTracker {
    scale: f64,
}

impl ResolutionTracker {
    /// `scale` must lie in `(0, 1]`.
    pub fn new(scale: f64) -> Result<Self, ArlinkError> {
        if !scale.is_finite() || scale <= 0.0 || scale > 1.0 {
            return Err(ArlinkError::Configuration(format!(
                "resolution_scale must be in (0, 1], got {scale}"
            )));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn compute(&self, display: Resolution) -> Resolution {
        compute_resolution(display.width, display.height, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_scale() {
        assert_eq!(compute_resolution(1920, 1080, 0.5), Resolution::new(960, 540));
        assert_eq!(compute_resolution(960, 540, 0.5), Resolution::new(480, 270));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 3 * 0.5 = 1.5 -> 2, 5 * 0.5 = 2.5 -> 3
        assert_eq!(compute_resolution(3, 5, 0.5), Resolution::new(2, 3));
        // 7 * 0.3 = 2.1 -> 2
        assert_eq!(compute_resolution(7, 7, 0.3).width, 2);
    }

    #[test]
    fn zero_area_in_zero_area_out() {
        assert!(compute_resolution(0, 1080, 0.5).is_empty());
        assert!(compute_resolution(1920, 0, 1.0).is_empty());
    }

    #[test]
    fn pure_and_roughly_linear() {
        for (w, h) in [(1280, 720), (2560, 1440), (1001, 333)] {
            for scale in [0.1, 0.25, 0.75, 1.0] {
                let a = compute_resolution(w, h, scale);
                assert_eq!(a, compute_resolution(w, h, scale));
                assert!((a.width as f64 - w as f64 * scale).abs() <= 0.5);
                assert!((a.height as f64 - h as f64 * scale).abs() <= 0.5);
            }
        }
    }

    #[test]
    fn tracker_validates_scale() {
        assert!(ResolutionTracker::new(0.0).is_err());
        assert!(ResolutionTracker::new(1.5).is_err());
        assert!(ResolutionTracker::new(f64::NAN).is_err());
        let tracker = ResolutionTracker::new(1.0).unwrap();
        assert_eq!(tracker.compute(Resolution::new(800, 600)), Resolution::new(800, 600));
    }
}
