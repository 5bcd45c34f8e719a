pub mod app;
pub mod config;
pub mod engine;
pub mod logger;
pub mod runtime;
pub mod sim;

use std::cell::RefCell;

use log::LevelFilter;
use wasm_bindgen::prelude::*;

use crate::app::{schedule_notifications, Explorer};
use crate::sim::selection::SelectionInfo;

thread_local! {
    static EXPLORER: RefCell<Option<Explorer>> = RefCell::new(None);
}

/// Run `f` against the live explorer, if there is one and it is not already
/// borrowed further up the stack.
pub(crate) fn with_explorer<R>(f: impl FnOnce(&mut Explorer) -> R) -> Option<R> {
    EXPLORER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map(f),
        Err(_) => {
            log::warn!("Explorer is busy; ignoring re-entrant call");
            None
        }
    })
}

fn take_explorer() -> Option<Explorer> {
    EXPLORER.with(|cell| cell.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
}

#[wasm_bindgen]
pub async fn init_explorer() -> Result<(), JsValue> {
    logger::init(LevelFilter::Info);
    // Tear down a previous instance before touching the canvas again.
    drop(take_explorer());

    let window = web_sys::window().ok_or("No window")?;
    let config = app::load_config(&window).await?;
    if let Ok(level) = config.level_filter() {
        logger::init(level);
    }

    let explorer = Explorer::new(&config)?;
    EXPLORER.with(|cell| *cell.borrow_mut() = Some(explorer));

    // Listeners and the frame loop look the explorer up through EXPLORER, so
    // they are attached only once it is in place.
    let started = with_explorer(|explorer| explorer.start(&window)).unwrap_or(Err("Explorer vanished".into()));
    if let Err(err) = started {
        drop(take_explorer());
        return Err(err);
    }
    Ok(())
}

/// Stop the frame loop, detach every listener and release GL resources.
#[wasm_bindgen]
pub fn shutdown_explorer() {
    if take_explorer().is_some() {
        log::info!("Explorer stopped");
    }
}

#[wasm_bindgen]
pub fn set_paused(paused: bool) {
    with_explorer(|explorer| explorer.simulation.set_paused(paused));
}

#[wasm_bindgen]
pub fn toggle_paused() -> bool {
    with_explorer(|explorer| explorer.simulation.toggle_paused()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn is_paused() -> bool {
    with_explorer(|explorer| explorer.simulation.controls().paused()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn set_speed(speed: f64) {
    with_explorer(|explorer| explorer.simulation.set_speed(speed));
}

#[wasm_bindgen]
pub fn speed() -> f64 {
    with_explorer(|explorer| explorer.simulation.controls().speed()).unwrap_or(sim::controls::SPEED_DEFAULT)
}

#[wasm_bindgen]
pub fn speed_label() -> String {
    with_explorer(|explorer| explorer.simulation.controls().label()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn reset() {
    with_explorer(|explorer| explorer.simulation.reset());
    schedule_notifications();
}

#[wasm_bindgen]
pub fn close_selection() {
    with_explorer(|explorer| explorer.simulation.close_selection());
    schedule_notifications();
}

/// `callback(info | null, "Star" | "Planet" | null)` on every selection change.
/// Passing `null`/`undefined` unregisters it.
#[wasm_bindgen]
pub fn on_body_selected(callback: Option<js_sys::Function>) {
    with_explorer(|explorer| explorer.set_selection_callback(callback));
}

/// Pick at pixel (x, y) of a `width` × `height` viewport. Returns the id of the
/// body hit, if any; the selection callback fires only if the selection changed.
#[wasm_bindgen]
pub fn on_pointer_click(x: f32, y: f32, viewport_width: f32, viewport_height: f32) -> Option<String> {
    let hit = with_explorer(|explorer| {
        let hit = explorer.simulation.pointer_click(x, y, viewport_width, viewport_height)?;
        let body = explorer.simulation.context().catalog().body(hit.body)?;
        Some(body.id.clone())
    })
    .flatten();
    schedule_notifications();
    hit
}

#[wasm_bindgen]
pub fn on_viewport_resize(width: u32, height: u32) {
    with_explorer(|explorer| explorer.simulation.viewport_resize(width, height));
}

#[wasm_bindgen]
pub fn on_wheel(delta_y: f32) {
    with_explorer(|explorer| explorer.simulation.zoom(delta_y));
}

/// Info for the current selection, or `null`.
#[wasm_bindgen]
pub fn selected_body() -> JsValue {
    with_explorer(|explorer| {
        let index = explorer.simulation.selection().body()?;
        let body = explorer.simulation.context().catalog().body(index)?;
        serde_wasm_bindgen::to_value(&SelectionInfo::from_descriptor(body)).ok()
    })
    .flatten()
    .unwrap_or(JsValue::NULL)
}

/// Body ids in the same order as [`body_states`].
#[wasm_bindgen]
pub fn body_ids() -> js_sys::Array {
    let ids = js_sys::Array::new();
    with_explorer(|explorer| {
        for pose in explorer.simulation.context().poses() {
            ids.push(&JsValue::from_str(&pose.descriptor.id));
        }
    });
    ids
}

/// Per body `[x, y, z, spin]`, star first, as read by the renderer this frame.
#[wasm_bindgen]
pub fn body_states() -> Vec<f32> {
    with_explorer(|explorer| {
        explorer
            .simulation
            .context()
            .poses()
            .flat_map(|pose| [pose.position.x, pose.position.y, pose.position.z, pose.spin as f32])
            .collect()
    })
    .unwrap_or_default()
}
