#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod container;
mod content;
mod error;
mod options;
mod overlay;
mod position;
mod reconcile;
mod view;
pub mod widget;
mod zoom;

pub use container::{ActiveOverlay, MapContainer, MountPhase, Settle};
pub use content::{MarkerContent, MarkerDescription};
pub use error::Error;
pub use options::{ControlPosition, MapConfig, MapOptions, UiOptions};
pub use overlay::{MarkerOverlay, OverlayState, anchor_top_left};
pub use position::{Bounds, CoordKey, LatLngBounds, Position, lat_lng, lng_lat};
pub use reconcile::{Located, OverlayLifecycle, ReconcileStats, Reconciled, reconcile};
pub use view::{SubscriptionId, ViewCursor, ViewState};
pub use zoom::{InvalidZoom, MAX_ZOOM};
