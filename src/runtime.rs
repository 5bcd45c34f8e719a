//! Host scheduling primitives: a cancellable `requestAnimationFrame` loop and
//! DOM listeners that detach themselves when dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget};

/// Shared flag checked by the frame loop before doing any work.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Calls `on_frame` once per display refresh until dropped.
///
/// Dropping the loop cancels its token, cancels the pending frame request and
/// frees the callback. It must not be dropped from inside its own callback.
pub struct FrameLoop {
    token: CancellationToken,
    pending: Rc<Cell<Option<i32>>>,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl FrameLoop {
    pub fn start<F>(mut on_frame: F) -> Result<Self, JsValue>
    where
        F: FnMut(f64) + 'static,
    {
        let token = CancellationToken::new();
        let pending = Rc::new(Cell::new(None));
        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));

        let frame_token = token.clone();
        let frame_pending = pending.clone();
        let slot: Weak<RefCell<Option<FrameCallback>>> = Rc::downgrade(&callback);

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            frame_pending.set(None);
            if frame_token.is_cancelled() {
                return;
            }
            on_frame(timestamp);
            if frame_token.is_cancelled() {
                return;
            }
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let slot = slot.borrow();
            if let Some(next) = slot.as_ref() {
                match request_animation_frame(next) {
                    Ok(id) => frame_pending.set(Some(id)),
                    Err(err) => {
                        log::error!("requestAnimationFrame failed, stopping frame loop: {err:?}");
                        frame_token.cancel();
                    }
                }
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(first) = callback.borrow().as_ref() {
            pending.set(Some(request_animation_frame(first)?));
        }

        Ok(FrameLoop { token, pending, callback })
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(id) = self.pending.take() {
            if let Some(window) = web_sys::window() {
                if let Err(err) = window.cancel_animation_frame(id) {
                    log::warn!("cancelAnimationFrame failed: {err:?}");
                }
            }
        }
        self.callback.borrow_mut().take();
        log::debug!("Frame loop stopped");
    }
}

fn request_animation_frame(f: &FrameCallback) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or("No window")?
        .request_animation_frame(f.as_ref().unchecked_ref())
}

/// A DOM event listener that is removed from its target on drop.
pub struct EventListener {
    target: EventTarget,
    event_type: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub fn new<F>(target: &EventTarget, event_type: &'static str, handler: F) -> Result<Self, JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event_type, callback.as_ref().unchecked_ref())?;
        Ok(EventListener { target: target.clone(), event_type, callback })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event_type, self.callback.as_ref().unchecked_ref())
        {
            log::warn!("Failed to detach '{}' listener: {err:?}", self.event_type);
        }
    }
}
