//! Browser wiring: owns the simulation together with the frame loop and DOM
//! listeners that drive it. Dropping an [`Explorer`] tears all of it down.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlCanvasElement, MouseEvent, Request, RequestInit, RequestMode, Response, WheelEvent, Window};
use wasm_bindgen_futures::JsFuture;

use crate::config::{ExplorerConfig, CONFIG_URL};
use crate::engine::camera::Camera;
use crate::engine::mesh;
use crate::engine::renderer::{webgl_context, WebGlRenderer};
use crate::runtime::{EventListener, FrameLoop};
use crate::sim::catalog::Catalog;
use crate::sim::selection::SelectionInfo;
use crate::sim::{phase_rng, Simulation, SimulationContext};

/// (info or null, kind label or null) waiting to be handed to JavaScript.
type Notification = (JsValue, JsValue);

pub struct Explorer {
    // Field order is drop order: stop frames, detach listeners, then release GL.
    frame_loop: Option<FrameLoop>,
    listeners: Vec<EventListener>,
    pub simulation: Simulation<WebGlRenderer>,
    outbox: Rc<RefCell<Vec<Notification>>>,
    selection_callback: Option<js_sys::Function>,
}

impl Explorer {
    /// Build everything up to, but not including, the frame loop and listeners.
    pub fn new(config: &ExplorerConfig) -> Result<Self, JsValue> {
        let catalog = Catalog::solar_system().map_err(|e| JsValue::from_str(&e.to_string()))?;

        let mut rng = phase_rng(config.seed);
        let camera = Camera::new(&config.camera);
        let context = SimulationContext::new(catalog, camera, &mut rng);
        let starfield = mesh::starfield(config.star_count, config.starfield_extent, &mut rng);

        let gl = webgl_context(&config.canvas_id)?;
        let renderer = WebGlRenderer::new(gl, context.catalog(), &starfield, config.clear_color)?;
        let mut simulation = Simulation::new(context, renderer, config.step_policy);

        let outbox: Rc<RefCell<Vec<Notification>>> = Rc::default();
        let sink = outbox.clone();
        simulation.on_body_selected(Box::new(move |body, kind| {
            let info = match body.map(SelectionInfo::from_descriptor) {
                Some(info) => match serde_wasm_bindgen::to_value(&info) {
                    Ok(value) => value,
                    Err(err) => {
                        log::error!("Failed to serialize selection: {err}");
                        return;
                    }
                },
                None => JsValue::NULL,
            };
            let kind = kind.map_or(JsValue::NULL, |k| JsValue::from_str(k.label()));
            sink.borrow_mut().push((info, kind));
        }));

        Ok(Explorer {
            frame_loop: None,
            listeners: Vec::new(),
            simulation,
            outbox,
            selection_callback: None,
        })
    }

    /// Attach click/wheel on the canvas and resize on the window, size the
    /// viewport, and start presenting frames.
    pub fn start(&mut self, window: &Window) -> Result<(), JsValue> {
        let canvas = self
            .simulation
            .renderer()
            .canvas()
            .ok_or("Renderer has no canvas")?;

        let (width, height) = window_size(window);
        self.simulation.viewport_resize(width, height);

        let click_canvas = canvas.clone();
        let on_click = EventListener::new(&canvas, "click", move |event: Event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let (w, h) = client_size(&click_canvas);
            crate::with_explorer(|explorer| {
                explorer.simulation.pointer_click(event.offset_x() as f32, event.offset_y() as f32, w, h)
            });
            schedule_notifications();
        })?;

        let on_wheel = EventListener::new(&canvas, "wheel", move |event: Event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            event.prevent_default();
            crate::with_explorer(|explorer| explorer.simulation.zoom(event.delta_y() as f32));
        })?;

        let resize_window = window.clone();
        let on_resize = EventListener::new(window, "resize", move |_event: Event| {
            let (w, h) = window_size(&resize_window);
            crate::with_explorer(|explorer| explorer.simulation.viewport_resize(w, h));
        })?;

        self.listeners = vec![on_click, on_wheel, on_resize];
        self.frame_loop = Some(FrameLoop::start(|timestamp| {
            crate::with_explorer(|explorer| explorer.simulation.frame(timestamp));
        })?);

        log::info!("Explorer started ({}x{})", width, height);
        Ok(())
    }

    pub fn set_selection_callback(&mut self, callback: Option<js_sys::Function>) {
        self.selection_callback = callback;
    }

    /// Pending notifications plus the callback that should receive them.
    pub fn take_notifications(&mut self) -> (Option<js_sys::Function>, Vec<Notification>) {
        let pending = std::mem::take(&mut *self.outbox.borrow_mut());
        (self.selection_callback.clone(), pending)
    }
}

impl Drop for Explorer {
    fn drop(&mut self) {
        log::info!("Explorer shutting down");
    }
}

/// Deliver selection notifications on a later microtask, once the current
/// command has released the explorer. Callbacks may call back into any export.
pub fn schedule_notifications() {
    wasm_bindgen_futures::spawn_local(async {
        let Some((callback, pending)) = crate::with_explorer(|explorer| explorer.take_notifications()) else {
            return;
        };
        let Some(callback) = callback else {
            return;
        };
        for (info, kind) in pending {
            if let Err(err) = callback.call2(&JsValue::NULL, &info, &kind) {
                log::warn!("onBodySelected callback threw: {err:?}");
            }
        }
    });
}

/// Fetch and validate `/assets/config.json`. A missing file means defaults;
/// a malformed one is an error.
pub async fn load_config(window: &Window) -> Result<ExplorerConfig, JsValue> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(CONFIG_URL, &opts)?;
    let response = match JsFuture::from(window.fetch_with_request(&request)).await {
        Ok(value) => value.dyn_into::<Response>()?,
        Err(err) => {
            log::warn!("Could not fetch {CONFIG_URL} ({err:?}), using defaults");
            return Ok(ExplorerConfig::default());
        }
    };
    if !response.ok() {
        log::warn!("{CONFIG_URL} returned {}, using defaults", response.status());
        return Ok(ExplorerConfig::default());
    }

    let text = JsFuture::from(response.text()?).await?;
    let text = text.as_string().ok_or("Config body is not text")?;
    ExplorerConfig::from_json(&text).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn window_size(window: &Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0).max(0.0) as u32
    };
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

fn client_size(canvas: &HtmlCanvasElement) -> (f32, f32) {
    (canvas.client_width() as f32, canvas.client_height() as f32)
}
