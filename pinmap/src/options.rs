use crate::{Position, zoom::ZoomRange};

/// Where a control is placed on the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum ControlPosition {
    TopLeft,
    TopCenter,
    TopRight,
    LeftTop,
    LeftCenter,
    LeftBottom,
    #[default]
    RightTop,
    RightCenter,
    RightBottom,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Built-in controls of the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UiOptions {
    /// Hide every control which is not explicitly enabled below.
    pub disable_default_ui: bool,
    pub zoom_control: bool,
    pub zoom_control_position: ControlPosition,
    /// Zoom with the mouse wheel. Off by default, since the map is usually embedded in
    /// a scrollable page.
    pub scrollwheel: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            disable_default_ui: true,
            zoom_control: true,
            zoom_control_position: ControlPosition::RightTop,
            scrollwheel: false,
        }
    }
}

/// Configuration of the map, which stays fixed for the lifetime of a [`MapContainer`].
///
/// [`MapContainer`]: crate::MapContainer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub ui: UiOptions,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            min_zoom: 2,
            max_zoom: 21,
            ui: UiOptions::default(),
        }
    }
}

impl MapOptions {
    pub fn with_min_zoom(mut self, min_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_ui(mut self, ui: UiOptions) -> Self {
        self.ui = ui;
        self
    }

    pub(crate) fn zoom_range(&self) -> ZoomRange {
        ZoomRange::new(self.min_zoom, self.max_zoom)
    }

    /// Resolve the options against the initial camera.
    pub(crate) fn config(&self, center: Position, zoom: u8) -> MapConfig {
        let range = self.zoom_range();
        MapConfig {
            center,
            zoom: range.clamp(zoom),
            min_zoom: range.min(),
            max_zoom: range.max(),
            ui: self.ui.clone(),
        }
    }
}

/// Everything the [`MapFactory`](crate::widget::MapFactory) needs to create a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub center: Position,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub ui: UiOptions,
}
