//! Backend dispatcher: one descriptor in, exactly one backend call out.
//!
//! Delivery is fire-and-forget. There is no retry, queue or buffer, and a
//! failing or missing backend is logged and dropped here so it can never
//! reach the interaction that triggered it.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use ga_events_core::{BackendKind, EventDescriptor, TrackingError, TrackingResult};

use crate::adaptors::{convention_for, BackendCall, CallConvention};

/// The capability of receiving analytics calls. Injected once at
/// configuration time.
pub trait BackendHandle {
    fn call(&self, call: &BackendCall) -> TrackingResult<()>;
}

pub struct BackendDispatcher {
    convention: Box<dyn CallConvention>,
    handle: Rc<dyn BackendHandle>,
}

impl BackendDispatcher {
    /// Select the active convention and bind the backend handle.
    pub fn configure(kind: BackendKind, handle: Rc<dyn BackendHandle>) -> Self {
        Self {
            convention: convention_for(kind),
            handle,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.convention.kind()
    }

    pub fn translate(&self, descriptor: &EventDescriptor) -> BackendCall {
        self.convention.translate(descriptor)
    }

    /// Send `descriptor` through the backend. Returns whether the backend
    /// accepted the call; failures are never propagated.
    pub fn dispatch(&self, descriptor: &EventDescriptor) -> bool {
        let call = self.translate(descriptor);
        match self.handle.call(&call) {
            Ok(()) => {
                debug!(
                    backend = ?self.kind(),
                    category = %descriptor.category,
                    action = %descriptor.action,
                    value = %descriptor.value,
                    "analytics event dispatched"
                );
                true
            }
            Err(e) => {
                warn!(backend = ?self.kind(), error = %e, "analytics event dropped");
                false
            }
        }
    }
}

/// Handle that keeps every call in memory. Used for previews and tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: RefCell<Vec<BackendCall>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn take(&self) -> Vec<BackendCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

impl BackendHandle for RecordingBackend {
    fn call(&self, call: &BackendCall) -> TrackingResult<()> {
        self.calls.borrow_mut().push(call.clone());
        Ok(())
    }
}

/// Stand-in for a backend that never loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbsentBackend;

impl BackendHandle for AbsentBackend {
    fn call(&self, _call: &BackendCall) -> TrackingResult<()> {
        Err(TrackingError::Backend("analytics backend is not loaded".into()))
    }
}
