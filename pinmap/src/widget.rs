//! Capabilities required from the map widget and from the document it renders into.
//!
//! The widget does all the heavy lifting (tiles, projection, gestures). These traits describe
//! the small surface this crate talks to, so that any SDK, or a test double, can be plugged in.

use std::{cell::RefCell, fmt, rc::Rc};

use egui::{Pos2, Vec2};

use crate::{LatLngBounds, MapConfig, Position};

/// Camera-change notifications emitted by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraEvent {
    /// Camera settled after panning or zooming.
    Idle,
    DragStart,
    DragEnd,
    ZoomChanged,
    BoundsChanged,
}

impl CameraEvent {
    pub const ALL: [CameraEvent; 5] = [
        CameraEvent::Idle,
        CameraEvent::DragStart,
        CameraEvent::DragEnd,
        CameraEvent::ZoomChanged,
        CameraEvent::BoundsChanged,
    ];

    /// Event name, as SDKs usually spell it.
    pub fn name(&self) -> &'static str {
        match self {
            CameraEvent::Idle => "idle",
            CameraEvent::DragStart => "dragstart",
            CameraEvent::DragEnd => "dragend",
            CameraEvent::ZoomChanged => "zoom_changed",
            CameraEvent::BoundsChanged => "bounds_changed",
        }
    }
}

impl fmt::Display for CameraEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type Listener = Box<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("could not create the map widget: {0}")]
pub struct CreateMapError(pub String);

/// Node of the document, e.g. a DOM element. Handles are cheap to clone and refer to the same
/// node, hence all the methods take `&self`.
pub trait DomNode {
    /// Rendered size in pixels.
    fn client_size(&self) -> Vec2;

    /// Place the node's top-left corner at `position`, relative to its parent.
    fn set_position(&self, position: Pos2);
}

/// Part of the widget where overlays put their nodes.
pub trait OverlayLayer {
    fn append_child(&self, node: Rc<dyn DomNode>);

    /// Returns `false` if `node` was not a child of this layer.
    fn remove_child(&self, node: &Rc<dyn DomNode>) -> bool;
}

/// Layers of the widget available to overlays.
#[derive(Clone)]
pub struct Panes {
    pub overlay_layer: Rc<dyn OverlayLayer>,
}

/// Projects geographical position into pixels of the overlay layer.
pub trait Projection {
    fn lat_lng_to_div_pixel(&self, position: Position) -> Pos2;
}

/// Custom overlay, driven by the widget.
pub trait OverlayView {
    /// Widget is ready to display the overlay. Called once.
    fn on_add(&mut self, panes: &Panes);

    /// Camera changed, or the overlay was just added. `projection` is `None` while the widget
    /// is still initializing.
    fn draw(&mut self, projection: Option<&dyn Projection>);

    /// Overlay was removed from the widget.
    fn on_remove(&mut self);
}

/// Live map widget.
///
/// Widgets must not invoke listeners from within these calls. Notifications are expected to
/// be delivered from the widget's own turn of the event loop.
pub trait MapHandle {
    fn zoom(&self) -> u8;
    fn set_zoom(&mut self, zoom: u8);
    fn center(&self) -> Position;

    /// Move the camera to `center`, possibly with an animation.
    fn pan_to(&mut self, center: Position);

    /// `None` until the widget has been laid out.
    fn bounds(&self) -> Option<LatLngBounds>;

    fn add_listener(&mut self, event: CameraEvent, listener: Listener) -> ListenerId;
    fn clear_listeners(&mut self);

    /// `None` until the widget has been laid out.
    fn projection(&self) -> Option<Rc<dyn Projection>>;

    /// Start displaying `overlay`. The widget calls [`OverlayView::on_add`] once it is ready,
    /// and [`OverlayView::draw`] on every camera change afterwards.
    fn add_overlay(&mut self, overlay: Rc<RefCell<dyn OverlayView>>) -> OverlayId;

    /// Stop displaying the overlay, calling [`OverlayView::on_remove`] if it has been added.
    fn remove_overlay(&mut self, id: OverlayId);
}

/// Entry point of the map SDK.
pub trait MapFactory {
    fn create_map(
        &self,
        container: &Rc<dyn DomNode>,
        config: &MapConfig,
    ) -> Result<Box<dyn MapHandle>, CreateMapError>;
}
