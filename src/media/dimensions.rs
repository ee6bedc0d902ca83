use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round both sides down to an even number, never below 2.
    ///
    /// yuv420p subsamples chroma 2x2, so H.264 rejects odd frame sizes.
    pub fn to_even(self) -> Self {
        Self {
            width: round_down_even(self.width),
            height: round_down_even(self.height),
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn round_down_even(value: u32) -> u32 {
    (value - value % 2).max(2)
}

/// Output dimensions for a probe result, substituting `fallback` when the probe failed
pub fn normalize(probed: Option<Dimensions>, fallback: Dimensions) -> Dimensions {
    let dimensions = match probed {
        Some(dimensions) => dimensions,
        None => {
            warn!("Could not determine image dimensions, using default: {}", fallback);
            fallback
        }
    };
    dimensions.to_even()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: Dimensions = Dimensions { width: 1280, height: 720 };

    #[test]
    fn test_odd_sides_round_down() {
        assert_eq!(
            normalize(Some(Dimensions::new(1281, 721)), FALLBACK),
            Dimensions::new(1280, 720)
        );
        assert_eq!(
            normalize(Some(Dimensions::new(641, 480)), FALLBACK),
            Dimensions::new(640, 480)
        );
    }

    #[test]
    fn test_even_input_is_unchanged() {
        let even = Dimensions::new(1280, 720);
        assert_eq!(normalize(Some(even), FALLBACK), even);
        assert_eq!(normalize(Some(normalize(Some(even), FALLBACK)), FALLBACK), even);
    }

    #[test]
    fn test_missing_probe_uses_fallback() {
        assert_eq!(normalize(None, FALLBACK), Dimensions::new(1280, 720));
        assert_eq!(normalize(None, Dimensions::new(801, 601)), Dimensions::new(800, 600));
    }

    #[test]
    fn test_single_pixel_side_is_clamped() {
        assert_eq!(Dimensions::new(1, 3).to_even(), Dimensions::new(2, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimensions::new(640, 360).to_string(), "640x360");
    }
}
