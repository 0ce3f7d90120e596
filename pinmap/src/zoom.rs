/// Highest zoom level any of the supported widgets can display.
pub const MAX_ZOOM: u8 = 22;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid zoom level {zoom}, expected {min}..={max}")]
pub struct InvalidZoom {
    pub zoom: u8,
    pub min: u8,
    pub max: u8,
}

/// Zoom levels allowed by the map's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ZoomRange {
    min: u8,
    max: u8,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: MAX_ZOOM,
        }
    }
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Self {
        let max = max.min(MAX_ZOOM);
        Self {
            min: min.min(max),
            max,
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn check(&self, zoom: u8) -> Result<u8, InvalidZoom> {
        if (self.min..=self.max).contains(&zoom) {
            Ok(zoom)
        } else {
            Err(InvalidZoom {
                zoom,
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn clamp(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructing_range() {
        let range = ZoomRange::new(2, 21);
        assert_eq!(2, range.min());
        assert_eq!(21, range.max());

        // Upper limit is capped, and min never exceeds max.
        let range = ZoomRange::new(30, 40);
        assert_eq!(MAX_ZOOM, range.max());
        assert_eq!(MAX_ZOOM, range.min());
    }

    #[test]
    fn test_checking_zoom() {
        let range = ZoomRange::new(2, 21);
        assert_eq!(Ok(2), range.check(2));
        assert_eq!(Ok(21), range.check(21));
        assert_eq!(
            Err(InvalidZoom {
                zoom: 1,
                min: 2,
                max: 21
            }),
            range.check(1)
        );
    }

    #[test]
    fn test_clamping_zoom() {
        let range = ZoomRange::new(2, 21);
        assert_eq!(2, range.clamp(0));
        assert_eq!(10, range.clamp(10));
        assert_eq!(21, range.clamp(22));
    }
}
