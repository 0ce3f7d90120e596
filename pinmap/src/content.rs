use std::rc::Rc;

use crate::{Position, widget::DomNode};

/// Content rendered by the host UI framework, which can be pinned to the map.
pub trait MarkerContent {
    /// Materialize the content. Subsequent calls return the same node.
    fn to_dom(&mut self) -> Rc<dyn DomNode>;

    /// Refresh in place from a newer rendition of the same marker, keeping the node.
    fn update(&mut self, next: Self)
    where
        Self: Sized;
}

/// Marker as described by the parent on every update. Markers are matched by `location`,
/// never by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDescription<C> {
    pub location: Position,
    pub content: C,
}

impl<C> MarkerDescription<C> {
    pub fn new(location: Position, content: C) -> Self {
        Self { location, content }
    }
}
