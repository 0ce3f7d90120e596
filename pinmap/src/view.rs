use std::{cell::RefCell, rc::Rc};

use crate::{Bounds, InvalidZoom, Position, zoom::ZoomRange};

/// Camera state shared between the application and the map.
///
/// The application writes the desired `center` and `zoom`, while [`MapContainer`] writes
/// `bounds`, `center` and `zoom` back after every camera change of the widget.
///
/// [`MapContainer`]: crate::MapContainer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct ViewState {
    pub center: Position,
    pub zoom: u8,
    /// Visible area. Unknown until the widget reports it for the first time.
    pub bounds: Option<Bounds>,
}

impl ViewState {
    pub fn new(center: Position, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            bounds: None,
        }
    }
}

/// Identifies a subscription made with [`ViewCursor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Rc<dyn Fn(&ViewState)>;

struct Shared {
    state: ViewState,
    /// Bumped on every write of the center, whoever the writer is. Two centers are considered
    /// the same only if they come from the same write, not if their coordinates are equal.
    center_revision: u64,
    zoom_range: ZoomRange,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

/// Observable handle to a [`ViewState`]. Clones refer to the same state.
#[derive(Clone)]
pub struct ViewCursor {
    shared: Rc<RefCell<Shared>>,
}

impl std::fmt::Debug for ViewCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("ViewCursor")
            .field("state", &shared.state)
            .field("center_revision", &shared.center_revision)
            .finish_non_exhaustive()
    }
}

impl ViewCursor {
    pub fn new(state: ViewState) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state,
                center_revision: 0,
                zoom_range: ZoomRange::default(),
                observers: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> ViewState {
        self.shared.borrow().state.clone()
    }

    pub fn center(&self) -> Position {
        self.shared.borrow().state.center
    }

    pub fn zoom(&self) -> u8 {
        self.shared.borrow().state.zoom
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.shared.borrow().state.bounds
    }

    pub fn center_revision(&self) -> u64 {
        self.shared.borrow().center_revision
    }

    /// Request the map to be centered at `center`. Writing the same coordinates again still
    /// counts as a new request.
    pub fn set_center(&self, center: Position) {
        {
            let mut shared = self.shared.borrow_mut();
            shared.state.center = center;
            shared.center_revision += 1;
        }
        self.notify();
    }

    /// Request the map to be zoomed to `zoom`, returning `Err(InvalidZoom)` if it is outside of
    /// the range the map was configured with.
    pub fn set_zoom(&self, zoom: u8) -> Result<(), InvalidZoom> {
        {
            let mut shared = self.shared.borrow_mut();
            shared.state.zoom = shared.zoom_range.check(zoom)?;
        }
        self.notify();
        Ok(())
    }

    /// Replace center and zoom at once. Bounds are only ever written by the map, so the ones in
    /// `state` are ignored.
    pub fn set(&self, state: ViewState) -> Result<(), InvalidZoom> {
        {
            let mut shared = self.shared.borrow_mut();
            shared.zoom_range.check(state.zoom)?;
            shared.state = ViewState {
                bounds: shared.state.bounds,
                ..state
            };
            shared.center_revision += 1;
        }
        self.notify();
        Ok(())
    }

    /// Call `observer` after every change of the state.
    pub fn subscribe(&self, observer: impl Fn(&ViewState) + 'static) -> SubscriptionId {
        let mut shared = self.shared.borrow_mut();
        let id = SubscriptionId(shared.next_subscription);
        shared.next_subscription += 1;
        shared.observers.push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared
            .borrow_mut()
            .observers
            .retain(|(subscription, _)| *subscription != id);
    }

    /// Allow only zoom levels within `range` from now on, pulling the current one into it.
    /// Observers are not called and the center is left untouched.
    pub(crate) fn restrict_zoom(&self, range: ZoomRange) {
        let mut shared = self.shared.borrow_mut();
        shared.zoom_range = range;
        shared.state.zoom = range.clamp(shared.state.zoom);
    }

    /// Store the camera reported by the widget, returning the new center revision. Observers
    /// are not called, see [`ViewCursor::notify`].
    pub(crate) fn write_camera(&self, center: Position, zoom: u8, bounds: Option<Bounds>) -> u64 {
        let mut shared = self.shared.borrow_mut();
        shared.state.center = center;
        shared.state.zoom = zoom;
        if bounds.is_some() {
            shared.state.bounds = bounds;
        }
        shared.center_revision += 1;
        shared.center_revision
    }

    pub(crate) fn notify(&self) {
        // Observers are free to read or write the cursor, so nothing can stay borrowed here.
        let (state, observers) = {
            let shared = self.shared.borrow();
            let observers: Vec<Observer> = shared
                .observers
                .iter()
                .map(|(_, observer)| Rc::clone(observer))
                .collect();
            (shared.state.clone(), observers)
        };

        for observer in observers {
            observer(&state);
        }
    }
}
