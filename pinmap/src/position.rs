//! Types and functions for working with positions.

/// Geographical position with latitude and longitude.
pub type Position = geo_types::Point;

/// Construct `Position` from latitude and longitude, the order in which map SDKs usually take
/// them (e.g. `{lat: 51.1044, lng: 17.0751}`).
pub fn lat_lng(lat: f64, lng: f64) -> Position {
    Position::new(lng, lat)
}

/// Construct `Position` from longitude and latitude.
pub fn lng_lat(lng: f64, lat: f64) -> Position {
    Position::new(lng, lat)
}

/// Visible area as reported by the map widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub north_east: Position,
    pub south_west: Position,
}

/// Visible area, flattened into edges. This is what gets written into
/// [`ViewState::bounds`](crate::ViewState::bounds).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct Bounds {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl From<LatLngBounds> for Bounds {
    fn from(bounds: LatLngBounds) -> Self {
        Self {
            top: bounds.north_east.y(),
            right: bounds.north_east.x(),
            bottom: bounds.south_west.y(),
            left: bounds.south_west.x(),
        }
    }
}

impl Bounds {
    /// Whether `position` lies within these bounds. Bounds spanning the antimeridian have
    /// `left > right`.
    pub fn contains(&self, position: Position) -> bool {
        let lat_inside = (self.bottom..=self.top).contains(&position.y());
        let lng_inside = if self.left <= self.right {
            (self.left..=self.right).contains(&position.x())
        } else {
            position.x() >= self.left || position.x() <= self.right
        };
        lat_inside && lng_inside
    }
}

/// Exact-equality key of a coordinate pair. Two positions get the same key if and only if their
/// latitudes and longitudes are numerically equal, so `-0.0` and `0.0` collapse into one key.
/// NaN is not equal to anything, therefore it has no key at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat: u64,
    lng: u64,
}

impl CoordKey {
    pub fn new(position: Position) -> Option<Self> {
        Some(Self {
            lat: canonical_bits(position.y())?,
            lng: canonical_bits(position.x())?,
        })
    }
}

fn canonical_bits(value: f64) -> Option<u64> {
    if value.is_nan() {
        None
    } else if value == 0.0 {
        Some(0.0_f64.to_bits())
    } else {
        Some(value.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lat_lng_and_lng_lat_agree() {
        assert_eq!(lat_lng(51.1, 17.07), lng_lat(17.07, 51.1));
        assert_eq!(lat_lng(51.1, 17.07).y(), 51.1);
    }

    #[test]
    fn equal_coordinates_give_equal_keys() {
        assert_eq!(
            CoordKey::new(lat_lng(1.5, -3.25)),
            CoordKey::new(lat_lng(1.5, -3.25))
        );
        assert_ne!(
            CoordKey::new(lat_lng(1.5, -3.25)),
            CoordKey::new(lat_lng(-3.25, 1.5))
        );
    }

    #[test]
    fn keys_are_not_tolerant() {
        assert_ne!(
            CoordKey::new(lat_lng(1.0, 1.0)),
            CoordKey::new(lat_lng(1.0 + f64::EPSILON, 1.0))
        );
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(
            CoordKey::new(lat_lng(-0.0, 0.0)),
            CoordKey::new(lat_lng(0.0, -0.0))
        );
    }

    #[test]
    fn nan_has_no_key() {
        assert_eq!(None, CoordKey::new(lat_lng(f64::NAN, 0.0)));
        assert_eq!(None, CoordKey::new(lat_lng(0.0, f64::NAN)));
    }

    #[test]
    fn bounds_from_widget_corners() {
        let bounds = Bounds::from(LatLngBounds {
            north_east: lat_lng(52.0, 18.0),
            south_west: lat_lng(50.0, 16.0),
        });

        assert_eq!(
            Bounds {
                top: 52.0,
                right: 18.0,
                bottom: 50.0,
                left: 16.0
            },
            bounds
        );
        assert!(bounds.contains(lat_lng(51.0, 17.0)));
        assert!(!bounds.contains(lat_lng(53.0, 17.0)));
    }

    #[test]
    fn bounds_across_antimeridian() {
        let bounds = Bounds {
            top: 10.0,
            right: -170.0,
            bottom: -10.0,
            left: 170.0,
        };

        assert!(bounds.contains(lat_lng(0.0, 175.0)));
        assert!(bounds.contains(lat_lng(0.0, -175.0)));
        assert!(!bounds.contains(lat_lng(0.0, 0.0)));
    }
}
