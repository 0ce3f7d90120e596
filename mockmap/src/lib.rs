//! In-memory map widget, scripted by the test. Camera changes made through [`MapHandle`] are
//! only queued, just like a real widget delivers them in a later turn of its event loop; call
//! [`MockMap::dispatch`] to deliver them. Gestures such as [`MockMap::drag_to`] are delivered
//! right away. Widgets made by [`MockFactory::synchronous`] deliver the camera changes from
//! within the call instead, leaving only `idle` for later.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use egui::{Pos2, Vec2, pos2, vec2};
use pinmap::{
    LatLngBounds, MapConfig, MarkerContent, Position, lat_lng,
    widget::{
        CameraEvent, CreateMapError, DomNode, Listener, ListenerId, MapFactory, MapHandle,
        OverlayId, OverlayLayer, OverlayView, Panes, Projection,
    },
};

/// Widget call made by the code under test.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetZoom(u8),
    PanTo(Position),
}

struct Slot {
    id: OverlayId,
    view: Rc<RefCell<dyn OverlayView>>,
    added: bool,
}

struct State {
    config: MapConfig,
    center: Position,
    zoom: u8,
    viewport: Vec2,
    ready: bool,
    synchronous: bool,
    listeners: Vec<(ListenerId, CameraEvent, Rc<dyn Fn()>)>,
    next_listener: u64,
    overlays: Vec<Slot>,
    next_overlay: u64,
    queue: VecDeque<CameraEvent>,
    calls: Vec<Call>,
    layer: Rc<MockLayer>,
}

impl State {
    fn projection(&self) -> Option<MockProjection> {
        self.ready.then_some(MockProjection {
            center: self.center,
            zoom: self.zoom,
            viewport: self.viewport,
        })
    }
}

/// Test-side handle to a widget created by [`MockFactory`].
#[derive(Clone)]
pub struct MockMap {
    state: Rc<RefCell<State>>,
}

impl MockMap {
    fn new(config: &MapConfig, viewport: Vec2, synchronous: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                config: config.clone(),
                center: config.center,
                zoom: config.zoom,
                viewport,
                ready: false,
                synchronous,
                listeners: Vec::new(),
                next_listener: 0,
                overlays: Vec::new(),
                next_overlay: 0,
                queue: VecDeque::new(),
                calls: Vec::new(),
                layer: Rc::new(MockLayer::default()),
            })),
        }
    }

    /// Configuration the widget was created with.
    pub fn config(&self) -> MapConfig {
        self.state.borrow().config.clone()
    }

    pub fn center(&self) -> Position {
        self.state.borrow().center
    }

    pub fn zoom(&self) -> u8 {
        self.state.borrow().zoom
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    /// Calls made through [`MapHandle`] since the last time this was called.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    pub fn layer(&self) -> Rc<MockLayer> {
        Rc::clone(&self.state.borrow().layer)
    }

    /// Where `position` currently lands in the overlay layer.
    pub fn project(&self, position: Position) -> Option<Pos2> {
        self.state
            .borrow()
            .projection()
            .map(|projection| projection.lat_lng_to_div_pixel(position))
    }

    /// Finish the initial layout: projection becomes available, overlays get added and drawn.
    pub fn ready(&self) {
        self.state.borrow_mut().ready = true;
        self.emit(CameraEvent::BoundsChanged);
        self.emit(CameraEvent::Idle);
    }

    /// Deliver the events queued by [`MapHandle`] calls.
    pub fn dispatch(&self) {
        loop {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some(event) = next else {
                break;
            };
            self.deliver(event);
        }
        self.render();
    }

    pub fn begin_drag(&self) {
        self.emit(CameraEvent::DragStart);
    }

    /// Move the camera as a dragging user would.
    pub fn drag_to(&self, center: Position) {
        self.state.borrow_mut().center = center;
        self.emit(CameraEvent::BoundsChanged);
    }

    pub fn end_drag(&self) {
        self.emit(CameraEvent::DragEnd);
    }

    /// Camera came to rest.
    pub fn idle(&self) {
        self.emit(CameraEvent::Idle);
    }

    /// Zoom as a user would, with the mouse wheel or a pinch.
    pub fn user_zoom(&self, zoom: u8) {
        self.state.borrow_mut().zoom = zoom;
        self.emit(CameraEvent::ZoomChanged);
        self.emit(CameraEvent::BoundsChanged);
    }

    /// Deliver `event` to its listeners and redraw overlays.
    pub fn emit(&self, event: CameraEvent) {
        self.deliver(event);
        self.render();
    }

    fn deliver(&self, event: CameraEvent) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, listening_to, _)| *listening_to == event)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect();

        log::trace!("Delivering '{event}' to {} listeners.", listeners.len());
        for listener in listeners {
            listener();
        }
    }

    /// Add pending overlays and draw all of them, as the widget does after every camera change.
    pub fn render(&self) {
        let (to_add, to_draw, layer, projection) = {
            let mut state = self.state.borrow_mut();
            if !state.ready {
                return;
            }

            let mut to_add = Vec::new();
            for slot in &mut state.overlays {
                if !slot.added {
                    slot.added = true;
                    to_add.push(Rc::clone(&slot.view));
                }
            }
            let to_draw: Vec<_> = state
                .overlays
                .iter()
                .map(|slot| Rc::clone(&slot.view))
                .collect();

            (to_add, to_draw, Rc::clone(&state.layer), state.projection())
        };

        let panes = Panes {
            overlay_layer: layer,
        };

        for view in to_add {
            view.borrow_mut().on_add(&panes);
        }

        for view in to_draw {
            view.borrow_mut()
                .draw(projection.as_ref().map(|p| p as &dyn Projection));
        }
    }
}

/// [`MapHandle`] given to the code under test.
struct Handle {
    state: Rc<RefCell<State>>,
}

impl Handle {
    /// Camera was moved by `events`, which are followed by `idle` once it settles.
    fn camera_moved(&self, events: &[CameraEvent]) {
        let map = MockMap {
            state: Rc::clone(&self.state),
        };

        if map.state.borrow().synchronous {
            for event in events {
                map.emit(*event);
            }
        } else {
            map.state.borrow_mut().queue.extend(events);
        }

        map.state.borrow_mut().queue.push_back(CameraEvent::Idle);
    }
}

impl MapHandle for Handle {
    fn zoom(&self) -> u8 {
        self.state.borrow().zoom
    }

    fn set_zoom(&mut self, zoom: u8) {
        {
            let mut state = self.state.borrow_mut();
            state.calls.push(Call::SetZoom(zoom));
            state.zoom = zoom.clamp(state.config.min_zoom, state.config.max_zoom);
        }
        self.camera_moved(&[CameraEvent::ZoomChanged, CameraEvent::BoundsChanged]);
    }

    fn center(&self) -> Position {
        self.state.borrow().center
    }

    fn pan_to(&mut self, center: Position) {
        {
            let mut state = self.state.borrow_mut();
            state.calls.push(Call::PanTo(center));
            state.center = center;
        }
        self.camera_moved(&[CameraEvent::BoundsChanged]);
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        self.state
            .borrow()
            .projection()
            .map(|projection| projection.bounds())
    }

    fn add_listener(&mut self, event: CameraEvent, listener: Listener) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, event, Rc::from(listener)));
        id
    }

    fn clear_listeners(&mut self) {
        self.state.borrow_mut().listeners.clear();
    }

    fn projection(&self) -> Option<Rc<dyn Projection>> {
        self.state
            .borrow()
            .projection()
            .map(|projection| Rc::new(projection) as Rc<dyn Projection>)
    }

    fn add_overlay(&mut self, overlay: Rc<RefCell<dyn OverlayView>>) -> OverlayId {
        let mut state = self.state.borrow_mut();
        let id = OverlayId(state.next_overlay);
        state.next_overlay += 1;
        state.overlays.push(Slot {
            id,
            view: overlay,
            added: false,
        });
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let position = state.overlays.iter().position(|slot| slot.id == id);
            position.map(|index| state.overlays.remove(index))
        };

        match removed {
            Some(slot) if slot.added => slot.view.borrow_mut().on_remove(),
            Some(_) => {}
            None => log::warn!("Removing unknown overlay {id:?}."),
        }
    }
}

/// Creates [`MockMap`]s and remembers them.
pub struct MockFactory {
    maps: RefCell<Vec<MockMap>>,
    failure: Option<String>,
    viewport: Vec2,
    synchronous: bool,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self {
            maps: RefCell::new(Vec::new()),
            failure: None,
            viewport: vec2(512., 512.),
            synchronous: false,
        }
    }
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory which fails to create any widget.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_owned()),
            ..Self::default()
        }
    }

    /// Factory of widgets which notify listeners right from within [`MapHandle::set_zoom`] and
    /// [`MapHandle::pan_to`], as some SDKs do.
    pub fn synchronous() -> Self {
        Self {
            synchronous: true,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, viewport: Vec2) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn created(&self) -> usize {
        self.maps.borrow().len()
    }

    /// Most recently created widget.
    pub fn last(&self) -> Option<MockMap> {
        self.maps.borrow().last().cloned()
    }
}

impl MapFactory for MockFactory {
    fn create_map(
        &self,
        _container: &Rc<dyn DomNode>,
        config: &MapConfig,
    ) -> Result<Box<dyn MapHandle>, CreateMapError> {
        if let Some(reason) = &self.failure {
            return Err(CreateMapError(reason.clone()));
        }

        let map = MockMap::new(config, self.viewport, self.synchronous);
        let handle = Handle {
            state: Rc::clone(&map.state),
        };
        self.maps.borrow_mut().push(map);
        Ok(Box::new(handle))
    }
}

/// Equirectangular projection, `256 * 2^zoom` pixels around the globe, with the center in the
/// middle of the viewport.
#[derive(Debug, Clone, Copy)]
struct MockProjection {
    center: Position,
    zoom: u8,
    viewport: Vec2,
}

impl MockProjection {
    fn pixels_per_degree(&self) -> f64 {
        256. * 2_f64.powi(self.zoom.into()) / 360.
    }

    fn bounds(&self) -> LatLngBounds {
        let half_width = f64::from(self.viewport.x) / 2. / self.pixels_per_degree();
        let half_height = f64::from(self.viewport.y) / 2. / self.pixels_per_degree();
        LatLngBounds {
            north_east: lat_lng(
                self.center.y() + half_height,
                self.center.x() + half_width,
            ),
            south_west: lat_lng(
                self.center.y() - half_height,
                self.center.x() - half_width,
            ),
        }
    }
}

impl Projection for MockProjection {
    fn lat_lng_to_div_pixel(&self, position: Position) -> Pos2 {
        let scale = self.pixels_per_degree();
        let x = f64::from(self.viewport.x) / 2. + (position.x() - self.center.x()) * scale;
        let y = f64::from(self.viewport.y) / 2. - (position.y() - self.center.y()) * scale;
        pos2(x as f32, y as f32)
    }
}

/// Overlay layer of a [`MockMap`].
#[derive(Default)]
pub struct MockLayer {
    children: RefCell<Vec<Rc<dyn DomNode>>>,
}

impl MockLayer {
    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    pub fn contains(&self, node: &Rc<dyn DomNode>) -> bool {
        self.children.borrow().iter().any(|child| same_node(child, node))
    }
}

impl OverlayLayer for MockLayer {
    fn append_child(&self, node: Rc<dyn DomNode>) {
        self.children.borrow_mut().push(node);
    }

    fn remove_child(&self, node: &Rc<dyn DomNode>) -> bool {
        let mut children = self.children.borrow_mut();
        let count = children.len();
        children.retain(|child| !same_node(child, node));
        children.len() != count
    }
}

fn same_node(a: &Rc<dyn DomNode>, b: &Rc<dyn DomNode>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Document node with a fixed size, remembering where it was placed.
#[derive(Debug)]
pub struct MockNode {
    text: RefCell<String>,
    size: Vec2,
    position: Cell<Option<Pos2>>,
}

impl MockNode {
    pub fn new(text: &str, size: Vec2) -> Rc<Self> {
        Rc::new(Self {
            text: RefCell::new(text.to_owned()),
            size,
            position: Cell::new(None),
        })
    }

    /// Node to host the widget in.
    pub fn container() -> Rc<dyn DomNode> {
        Self::new("map", vec2(512., 512.))
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Top-left corner, if the node has been placed.
    pub fn position(&self) -> Option<Pos2> {
        self.position.get()
    }
}

impl DomNode for MockNode {
    fn client_size(&self) -> Vec2 {
        self.size
    }

    fn set_position(&self, position: Pos2) {
        self.position.set(Some(position));
    }
}

/// Marker content which renders as a [`MockNode`] with some text.
#[derive(Debug)]
pub struct Label {
    text: String,
    size: Vec2,
    node: Option<Rc<MockNode>>,
}

impl Label {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            size: vec2(40., 20.),
            node: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Materialized node, if any.
    pub fn node(&self) -> Option<Rc<MockNode>> {
        self.node.clone()
    }
}

impl MarkerContent for Label {
    fn to_dom(&mut self) -> Rc<dyn DomNode> {
        let node = self
            .node
            .get_or_insert_with(|| MockNode::new(&self.text, self.size));
        Rc::clone(node) as Rc<dyn DomNode>
    }

    fn update(&mut self, next: Self) {
        self.text = next.text;
        if let Some(node) = &self.node {
            node.text.replace(self.text.clone());
        }
    }
}
