use std::rc::Rc;

use egui::{Align2, Pos2, Vec2};

use crate::{
    MarkerContent, MarkerDescription, Position,
    widget::{DomNode, OverlayLayer, OverlayView, Panes, Projection},
};

/// Where in its lifecycle a [`MarkerOverlay`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Handed to the widget, which has not added it yet.
    Constructed,
    /// Content node is in the widget's overlay layer.
    Attached,
    Detached,
}

enum Lifecycle {
    Constructed,
    Attached {
        layer: Rc<dyn OverlayLayer>,
        node: Rc<dyn DomNode>,
    },
    Detached,
}

/// Content pinned to a single geographical position.
pub struct MarkerOverlay<C> {
    position: Position,
    content: C,
    lifecycle: Lifecycle,
}

impl<C> MarkerOverlay<C>
where
    C: MarkerContent,
{
    pub fn new(description: MarkerDescription<C>) -> Self {
        Self {
            position: description.location,
            content: description.content,
            lifecycle: Lifecycle::Constructed,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn state(&self) -> OverlayState {
        match self.lifecycle {
            Lifecycle::Constructed => OverlayState::Constructed,
            Lifecycle::Attached { .. } => OverlayState::Attached,
            Lifecycle::Detached => OverlayState::Detached,
        }
    }

    /// Put the content node into `layer`.
    pub fn attach(&mut self, layer: Rc<dyn OverlayLayer>) {
        if !matches!(self.lifecycle, Lifecycle::Constructed) {
            log::warn!(
                "Overlay at {:?} is already {:?}, not attaching again.",
                self.position,
                self.state()
            );
            return;
        }

        let node = self.content.to_dom();
        layer.append_child(Rc::clone(&node));
        self.lifecycle = Lifecycle::Attached { layer, node };
    }

    /// Move the content node over its position, so that the content's bottom edge touches the
    /// position and it is centered horizontally.
    pub fn redraw(&mut self, projection: Option<&dyn Projection>) {
        let Lifecycle::Attached { node, .. } = &self.lifecycle else {
            log::trace!("Overlay at {:?} is not attached, skipping redraw.", self.position);
            return;
        };

        let Some(projection) = projection else {
            log::trace!("Projection is not available yet.");
            return;
        };

        let anchor = projection.lat_lng_to_div_pixel(self.position);
        node.set_position(anchor_top_left(anchor, node.client_size()));
    }

    /// Take the content node out of the map. Calling it again does nothing.
    pub fn detach(&mut self) {
        if let Lifecycle::Attached { layer, node } =
            std::mem::replace(&mut self.lifecycle, Lifecycle::Detached)
            && !layer.remove_child(&node)
        {
            log::debug!("Node of overlay at {:?} was already gone.", self.position);
        }
    }

    pub(crate) fn replace_content(&mut self, next: C) {
        self.content.update(next);
    }
}

impl<C> OverlayView for MarkerOverlay<C>
where
    C: MarkerContent,
{
    fn on_add(&mut self, panes: &Panes) {
        self.attach(Rc::clone(&panes.overlay_layer));
    }

    fn draw(&mut self, projection: Option<&dyn Projection>) {
        self.redraw(projection);
    }

    fn on_remove(&mut self) {
        self.detach();
    }
}

/// Top-left corner of content of a given `size`, which is centered horizontally above `anchor`.
pub fn anchor_top_left(anchor: Pos2, size: Vec2) -> Pos2 {
    Align2::CENTER_BOTTOM.anchor_size(anchor, size).min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lat_lng;
    use egui::{pos2, vec2};
    use std::cell::{Cell, RefCell};

    struct Node {
        size: Vec2,
        position: Cell<Option<Pos2>>,
    }

    impl DomNode for Node {
        fn client_size(&self) -> Vec2 {
            self.size
        }

        fn set_position(&self, position: Pos2) {
            self.position.set(Some(position));
        }
    }

    #[derive(Default)]
    struct Layer {
        children: RefCell<Vec<Rc<dyn DomNode>>>,
    }

    impl OverlayLayer for Layer {
        fn append_child(&self, node: Rc<dyn DomNode>) {
            self.children.borrow_mut().push(node);
        }

        fn remove_child(&self, node: &Rc<dyn DomNode>) -> bool {
            let mut children = self.children.borrow_mut();
            let before = children.len();
            children.retain(|child| !std::ptr::addr_eq(Rc::as_ptr(child), Rc::as_ptr(node)));
            children.len() != before
        }
    }

    struct Content {
        label: &'static str,
        node: Rc<Node>,
        materialized: usize,
    }

    impl Content {
        fn new(label: &'static str) -> Self {
            Self {
                label,
                node: Rc::new(Node {
                    size: vec2(40., 20.),
                    position: Cell::new(None),
                }),
                materialized: 0,
            }
        }
    }

    impl MarkerContent for Content {
        fn to_dom(&mut self) -> Rc<dyn DomNode> {
            self.materialized += 1;
            self.node.clone()
        }

        fn update(&mut self, next: Self) {
            self.label = next.label;
        }
    }

    /// One degree is one pixel, with (0, 0) at the top-left corner.
    struct Flat;

    impl Projection for Flat {
        fn lat_lng_to_div_pixel(&self, position: Position) -> Pos2 {
            pos2(position.x() as f32, -position.y() as f32)
        }
    }

    fn overlay(label: &'static str) -> MarkerOverlay<Content> {
        MarkerOverlay::new(MarkerDescription::new(
            lat_lng(-100., 200.),
            Content::new(label),
        ))
    }

    #[test]
    fn anchoring_above_and_centered() {
        assert_eq!(
            pos2(80., 70.),
            anchor_top_left(pos2(100., 100.), vec2(40., 30.))
        );
    }

    #[test]
    fn redraw_before_attach_does_nothing() {
        let mut overlay = overlay("A");
        overlay.redraw(Some(&Flat));

        assert_eq!(OverlayState::Constructed, overlay.state());
        assert_eq!(None, overlay.content().node.position.get());
    }

    #[test]
    fn redraw_without_projection_leaves_node_where_it_was() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.attach(layer);
        overlay.redraw(None);
        assert_eq!(None, overlay.content().node.position.get());

        overlay.redraw(Some(&Flat));
        let placed = overlay.content().node.position.get();
        overlay.redraw(None);
        assert_eq!(placed, overlay.content().node.position.get());
    }

    #[test]
    fn redraw_places_content_over_its_position() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.attach(layer.clone());
        overlay.redraw(Some(&Flat));

        assert_eq!(1, layer.children.borrow().len());
        assert_eq!(
            Some(pos2(180., 80.)),
            overlay.content().node.position.get()
        );
    }

    #[test]
    fn attaching_twice_keeps_single_node() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.attach(layer.clone());
        overlay.attach(layer.clone());

        assert_eq!(1, layer.children.borrow().len());
        assert_eq!(1, overlay.content().materialized);
    }

    #[test]
    fn detach_is_idempotent() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.attach(layer.clone());

        overlay.detach();
        assert_eq!(OverlayState::Detached, overlay.state());
        assert!(layer.children.borrow().is_empty());

        overlay.detach();
        assert_eq!(OverlayState::Detached, overlay.state());
    }

    #[test]
    fn detached_overlay_cannot_be_attached_again() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.detach();
        overlay.attach(layer.clone());

        assert_eq!(OverlayState::Detached, overlay.state());
        assert!(layer.children.borrow().is_empty());
    }

    #[test]
    fn replacing_content_keeps_overlay_attached() {
        let layer = Rc::new(Layer::default());
        let mut overlay = overlay("A");
        overlay.attach(layer.clone());
        overlay.replace_content(Content::new("B"));

        assert_eq!("B", overlay.content().label);
        assert_eq!(OverlayState::Attached, overlay.state());
        assert_eq!(1, layer.children.borrow().len());
    }
}
