//! Scripted session with an in-memory widget. Run with `RUST_LOG=debug` to see what the
//! container does with it.

use std::rc::Rc;

use futures::executor::LocalPool;
use mockmap::{Label, MockFactory, MockNode};
use pinmap::{MapContainer, MapOptions, MarkerDescription, ViewCursor, ViewState, lat_lng};

fn places(names: &[(&str, f64, f64)]) -> Vec<MarkerDescription<Label>> {
    names
        .iter()
        .map(|(name, lat, lng)| MarkerDescription::new(lat_lng(*lat, *lng), Label::new(name)))
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let view = ViewCursor::new(ViewState::new(lat_lng(0., 0.), 11));
    view.subscribe(|state| log::info!("View: {:?} @ {}.", state.center, state.zoom));

    let factory = Rc::new(MockFactory::new());

    // Center is not known until, say, the geolocation comes back.
    let (container, settle) = MapContainer::mount_deferred(
        Rc::clone(&factory) as Rc<dyn pinmap::widget::MapFactory>,
        Some(MockNode::container()),
        view.clone(),
        MapOptions::default(),
        async { lat_lng(50.0647, 19.9450) },
    )?;

    container.on_children_change(places(&[
        ("Rynek", 50.0617, 19.9373),
        ("Wawel", 50.0540, 19.9354),
    ]));

    LocalPool::new().run_until(settle)?;
    log::info!("Map is {:?}.", container.phase());

    let Some(map) = factory.last() else {
        return Ok(());
    };
    map.ready();

    for active in container.overlays() {
        let overlay = active.overlay().borrow();
        let position = overlay.content().node().and_then(|node| node.position());
        log::info!("'{}' drawn at {position:?}.", overlay.content().text());
    }

    // The user drags the map around. The application tries to zoom in the meantime, but has
    // to wait until the camera settles.
    map.begin_drag();
    map.drag_to(lat_lng(50.07, 19.95));
    view.set_zoom(14)?;
    container.on_update();
    map.end_drag();
    map.idle();

    view.set_zoom(14)?;
    container.on_update();
    map.dispatch();

    let stats = container.on_children_change(places(&[
        ("Wawel", 50.0540, 19.9354),
        ("Kazimierz", 50.0510, 19.9440),
    ]));
    log::info!("Markers changed: {stats:?}.");
    map.render();

    container.on_unmount();
    log::info!("Final view: {:?}.", view.get());
    Ok(())
}
