//! Cross-thread access to a binder
//!
//! The binder and its text buffer belong to one thread. Anything else (a
//! playback callback, a file watcher, a widget thread) holds a
//! [`BinderHandle`] and sends requests; the owning thread applies them in
//! [`LiveParameterBinder::process_requests`](super::LiveParameterBinder::process_requests).

use super::binding::BindingId;
use crossbeam_channel::Sender;

#[derive(Debug, Clone, PartialEq)]
pub enum BinderRequest {
    UpdateParameter { id: BindingId, value: f64 },
    UpdateAtOffset { offset: usize, value: f64 },
    /// Re-scan the buffer's current text
    Refresh,
    Start,
    Stop,
}

/// Cloneable, `Send` sender of [`BinderRequest`]s
#[derive(Debug, Clone)]
pub struct BinderHandle {
    tx: Sender<BinderRequest>,
}

impl BinderHandle {
    pub(crate) fn new(tx: Sender<BinderRequest>) -> Self {
        BinderHandle { tx }
    }

    /// Queue a request. Returns false once the binder is gone.
    pub fn send(&self, request: BinderRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    pub fn update_parameter(&self, id: BindingId, value: f64) -> bool {
        self.send(BinderRequest::UpdateParameter { id, value })
    }

    pub fn update_parameter_at_offset(&self, offset: usize, value: f64) -> bool {
        self.send(BinderRequest::UpdateAtOffset { offset, value })
    }

    pub fn refresh(&self) -> bool {
        self.send(BinderRequest::Refresh)
    }
}
