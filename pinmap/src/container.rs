use std::{cell::RefCell, collections::VecDeque, future::Future, rc::Rc};

use futures::{FutureExt as _, future::LocalBoxFuture};

use crate::{
    Bounds, Error, Located, MapOptions, MarkerContent, MarkerDescription, MarkerOverlay,
    OverlayLifecycle, Position, ReconcileStats, ViewCursor, reconcile,
    widget::{CameraEvent, DomNode, MapFactory, MapHandle, OverlayId, OverlayView, Projection},
};

/// Completes mounting of a [`MapContainer`] created with [`MapContainer::mount_deferred`], once
/// the initial center is known. Meant to be spawned on the UI thread's executor.
pub type Settle = LocalBoxFuture<'static, Result<(), Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPhase {
    /// Waiting for the initial center. There is no widget yet.
    Pending,
    Mounted,
    Unmounted,
}

/// Overlay which is currently on the map, together with its handle in the widget.
pub struct ActiveOverlay<C> {
    position: Position,
    handle: OverlayId,
    overlay: Rc<RefCell<MarkerOverlay<C>>>,
}

impl<C> Clone for ActiveOverlay<C> {
    fn clone(&self) -> Self {
        Self {
            position: self.position,
            handle: self.handle,
            overlay: Rc::clone(&self.overlay),
        }
    }
}

impl<C> ActiveOverlay<C> {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn handle(&self) -> OverlayId {
        self.handle
    }

    pub fn overlay(&self) -> &Rc<RefCell<MarkerOverlay<C>>> {
        &self.overlay
    }

    /// Whether both refer to the very same overlay instance.
    pub fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.overlay, &other.overlay)
    }
}

impl<C> Located for ActiveOverlay<C> {
    fn location(&self) -> Position {
        self.position
    }
}

enum Widget {
    Pending,
    Mounted(Box<dyn MapHandle>),
    Unmounted,
}

struct MapState<C> {
    widget: Widget,
    view: ViewCursor,
    overlays: Vec<ActiveOverlay<C>>,
    /// Latest markers received while waiting for the initial center.
    buffered: Option<Vec<MarkerDescription<C>>>,
    /// Revision of the view's center which the widget already shows.
    pushed_center: u64,
    /// User gesture or animation is in progress.
    animating: bool,
    dragging: bool,
}

struct Inner<C> {
    state: RefCell<MapState<C>>,
    /// Camera events which arrived while the state was busy.
    inbox: RefCell<VecDeque<CameraEvent>>,
}

/// Owns a map widget and keeps it in sync with a [`ViewCursor`] and a list of markers.
///
/// Host framework calls [`MapContainer::mount`] (or [`MapContainer::mount_deferred`]) once,
/// then [`MapContainer::on_update`] and [`MapContainer::on_children_change`] on each re-render
/// and finally [`MapContainer::on_unmount`].
pub struct MapContainer<C> {
    inner: Rc<Inner<C>>,
}

impl<C> MapContainer<C>
where
    C: MarkerContent + 'static,
{
    /// Create the widget inside `container`, centered as `view` says.
    pub fn mount(
        factory: &dyn MapFactory,
        container: Option<Rc<dyn DomNode>>,
        view: ViewCursor,
        options: &MapOptions,
    ) -> Result<Self, Error> {
        let container = container.ok_or(Error::MissingContainer)?;
        let this = Self::pending(view);
        this.inner.create_widget(factory, &container, options)?;
        Ok(this)
    }

    /// Like [`MapContainer::mount`], but the initial center is not known yet. The widget gets
    /// created, and starts to report camera changes, only after `center` resolves and the
    /// returned [`Settle`] future is driven to completion. Markers received in the meantime are
    /// put on the map then.
    pub fn mount_deferred<F>(
        factory: Rc<dyn MapFactory>,
        container: Option<Rc<dyn DomNode>>,
        view: ViewCursor,
        options: MapOptions,
        center: F,
    ) -> Result<(Self, Settle), Error>
    where
        F: Future<Output = Position> + 'static,
    {
        let container = container.ok_or(Error::MissingContainer)?;
        let this = Self::pending(view);
        let inner = Rc::downgrade(&this.inner);

        let settle = async move {
            let center = center.await;

            let Some(inner) = inner.upgrade() else {
                log::debug!("Map container is gone, ignoring initial center.");
                return Ok(());
            };

            if inner.phase() != MountPhase::Pending {
                log::debug!("Map was unmounted before initial center was known.");
                return Ok(());
            }

            let view = inner.state.borrow().view.clone();
            view.set_center(center);
            inner.create_widget(&*factory, &container, &options)
        }
        .boxed_local();

        Ok((this, settle))
    }

    fn pending(view: ViewCursor) -> Self {
        let pushed_center = view.center_revision();
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(MapState {
                    widget: Widget::Pending,
                    view,
                    overlays: Vec::new(),
                    buffered: None,
                    pushed_center,
                    animating: false,
                    dragging: false,
                }),
                inbox: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Push the view's zoom and center into the widget. Does nothing while the user is
    /// dragging or zooming the map.
    pub fn on_update(&self) {
        self.inner.state.borrow_mut().update();
        self.inner.flush();
    }

    /// Show `markers` on the map, reusing overlays which are already at the same positions.
    pub fn on_children_change(&self, markers: Vec<MarkerDescription<C>>) -> ReconcileStats {
        let stats = self.inner.state.borrow_mut().children_changed(markers);
        self.inner.flush();
        stats
    }

    /// Stop listening to the widget. The widget itself, along with its overlays, belongs to
    /// the document and is left alone.
    pub fn on_unmount(&self) {
        let mut state = self.inner.state.borrow_mut();
        match std::mem::replace(&mut state.widget, Widget::Unmounted) {
            Widget::Mounted(mut map) => {
                map.clear_listeners();
                log::debug!("Map unmounted.");
            }
            Widget::Pending => log::debug!("Map unmounted before it was created."),
            Widget::Unmounted => log::trace!("Map was already unmounted."),
        }
        state.overlays.clear();
        state.buffered = None;
        self.inner.inbox.borrow_mut().clear();
    }

    pub fn phase(&self) -> MountPhase {
        self.inner.phase()
    }

    /// Whether a gesture is in progress, during which [`MapContainer::on_update`] is ignored.
    pub fn is_animating(&self) -> bool {
        self.inner.state.borrow().animating
    }

    /// Overlays on the map, in the order of the last markers list.
    pub fn overlays(&self) -> Vec<ActiveOverlay<C>> {
        self.inner.state.borrow().overlays.clone()
    }

    pub fn view(&self) -> ViewCursor {
        self.inner.state.borrow().view.clone()
    }
}

impl<C> Inner<C>
where
    C: MarkerContent + 'static,
{
    fn phase(&self) -> MountPhase {
        match self.state.borrow().widget {
            Widget::Pending => MountPhase::Pending,
            Widget::Mounted(_) => MountPhase::Mounted,
            Widget::Unmounted => MountPhase::Unmounted,
        }
    }

    fn create_widget(
        self: &Rc<Self>,
        factory: &dyn MapFactory,
        container: &Rc<dyn DomNode>,
        options: &MapOptions,
    ) -> Result<(), Error> {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(state.widget, Widget::Pending) {
                return Ok(());
            }

            state.view.restrict_zoom(options.zoom_range());
            let config = options.config(state.view.center(), state.view.zoom());
            log::debug!("Creating map widget: {config:?}.");

            let mut map = match factory.create_map(container, &config) {
                Ok(map) => map,
                Err(err) => {
                    state.widget = Widget::Unmounted;
                    return Err(err.into());
                }
            };

            for event in CameraEvent::ALL {
                let inner = Rc::downgrade(self);
                map.add_listener(
                    event,
                    Box::new(move || {
                        if let Some(inner) = inner.upgrade() {
                            inner.deliver(event);
                        }
                    }),
                );
            }

            state.pushed_center = state.view.center_revision();
            state.widget = Widget::Mounted(map);

            if let Some(markers) = state.buffered.take() {
                state.children_changed(markers);
            }
        }

        self.flush();
        Ok(())
    }

    fn deliver(&self, event: CameraEvent) {
        self.inbox.borrow_mut().push_back(event);
        self.flush();
    }

    /// Handle queued camera events, unless the state is already being worked on, in which case
    /// the events stay queued until that work is done.
    fn flush(&self) {
        loop {
            let written = {
                let Ok(mut state) = self.state.try_borrow_mut() else {
                    log::trace!("Map container is busy, deferring camera event.");
                    return;
                };

                let next = self.inbox.borrow_mut().pop_front();
                let Some(event) = next else {
                    return;
                };

                state.camera_changed(event).then(|| state.view.clone())
            };

            // Observers might want to update the map, so they are called with nothing borrowed.
            if let Some(view) = written {
                view.notify();
            }
        }
    }
}

impl<C> MapState<C>
where
    C: MarkerContent + 'static,
{
    fn update(&mut self) {
        let Widget::Mounted(map) = &mut self.widget else {
            log::trace!("Map is not mounted, ignoring update.");
            return;
        };

        if self.animating {
            log::trace!("Map is animating, ignoring update.");
            return;
        }

        let view = self.view.get();

        if map.zoom() != view.zoom {
            log::debug!("Zooming map to {}.", view.zoom);
            map.set_zoom(view.zoom);
        }

        let revision = self.view.center_revision();
        if revision != self.pushed_center {
            log::debug!("Panning map to {:?}.", view.center);
            self.pushed_center = revision;
            map.pan_to(view.center);
        }
    }

    /// Track the gesture window and write the camera back into the view. Returns whether the
    /// view was written.
    fn camera_changed(&mut self, event: CameraEvent) -> bool {
        let Widget::Mounted(map) = &self.widget else {
            return false;
        };

        match event {
            CameraEvent::Idle => self.animating = self.dragging,
            CameraEvent::DragStart => {
                self.dragging = true;
                self.animating = true;
            }
            CameraEvent::DragEnd => self.dragging = false,
            CameraEvent::ZoomChanged => self.animating = true,
            CameraEvent::BoundsChanged => {}
        }

        log::trace!("Camera event '{event}', animating: {}.", self.animating);

        let bounds = map.bounds().map(Bounds::from);
        self.pushed_center = self.view.write_camera(map.center(), map.zoom(), bounds);
        true
    }

    fn children_changed(&mut self, markers: Vec<MarkerDescription<C>>) -> ReconcileStats {
        match &mut self.widget {
            Widget::Pending => {
                log::trace!("Map is not created yet, keeping {} markers.", markers.len());
                self.buffered = Some(markers);
                ReconcileStats::default()
            }
            Widget::Unmounted => {
                log::debug!("Map is unmounted, ignoring markers.");
                ReconcileStats::default()
            }
            Widget::Mounted(map) => {
                let mut lifecycle = WidgetOverlays::new(map.as_mut());
                let active = std::mem::take(&mut self.overlays);
                let reconciled = reconcile(active, markers, &mut lifecycle);

                let projection = map.projection();
                for active in &reconciled.overlays {
                    active.overlay.borrow_mut().redraw(projection.as_deref());
                }

                self.overlays = reconciled.overlays;
                reconciled.stats
            }
        }
    }
}

/// Creates and removes overlays in the widget during reconciliation.
struct WidgetOverlays<'a> {
    map: &'a mut dyn MapHandle,
    projection: Option<Rc<dyn Projection>>,
}

impl<'a> WidgetOverlays<'a> {
    fn new(map: &'a mut dyn MapHandle) -> Self {
        let projection = map.projection();
        Self { map, projection }
    }
}

impl<C> OverlayLifecycle<ActiveOverlay<C>, C> for WidgetOverlays<'_>
where
    C: MarkerContent + 'static,
{
    fn create(&mut self, description: MarkerDescription<C>) -> ActiveOverlay<C> {
        let position = description.location;
        let overlay = Rc::new(RefCell::new(MarkerOverlay::new(description)));
        let view = Rc::clone(&overlay) as Rc<RefCell<dyn OverlayView>>;
        let handle = self.map.add_overlay(view);
        log::trace!("Overlay {handle:?} created at {position:?}.");

        ActiveOverlay {
            position,
            handle,
            overlay,
        }
    }

    fn reuse(&mut self, active: &mut ActiveOverlay<C>, content: C) {
        let mut overlay = active.overlay.borrow_mut();
        overlay.replace_content(content);
        overlay.redraw(self.projection.as_deref());
    }

    fn destroy(&mut self, active: ActiveOverlay<C>) {
        log::trace!("Removing overlay {:?}.", active.handle);
        self.map.remove_overlay(active.handle);
        // Widget calls `on_remove` only for overlays it has added, so make sure.
        active.overlay.borrow_mut().detach();
    }
}
