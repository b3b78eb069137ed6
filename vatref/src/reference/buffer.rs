//! Deferred sends held by an unresolved promise.

use crate::reference::Resolver;
use crate::selector::Selector;
use crate::value::Value;
use crate::vat::{Vat, WeakVat};
use std::collections::VecDeque;

/// An eventual send that reached an unresolved promise.
///
/// Consumed exactly once, when the promise it waits on is settled.
pub(crate) struct BufferedMessage {
    selector: Selector,
    args: Vec<Value>,
    /// Vat the send originated on; replay is scheduled there.
    vat: WeakVat,
    /// Settles the placeholder promise the sender got back.
    resolver: Resolver,
}

impl BufferedMessage {
    pub(crate) fn new(selector: Selector, args: Vec<Value>, vat: WeakVat, resolver: Resolver) -> Self {
        Self {
            selector,
            args,
            vat,
            resolver,
        }
    }

    /// Re-issue this send against the now-known target.
    pub(crate) fn replay(self, resolving_vat: &Vat, target: &Value) {
        let vat = match self.vat.upgrade() {
            Some(vat) => vat,
            None => {
                tracing::warn!(
                    "Originating vat gone, replaying {} on {}",
                    self.selector,
                    resolving_vat.name()
                );
                resolving_vat.clone()
            }
        };
        vat.send_with_reply(target.clone(), self.selector, self.args, self.resolver);
    }
}

/// FIFO of buffered messages.
#[derive(Default)]
pub(crate) struct MessageQueue {
    messages: VecDeque<BufferedMessage>,
}

impl MessageQueue {
    pub(crate) fn push(&mut self, message: BufferedMessage) {
        self.messages.push_back(message);
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    /// Empty the queue, yielding messages in arrival order.
    pub(crate) fn take(&mut self) -> VecDeque<BufferedMessage> {
        std::mem::take(&mut self.messages)
    }
}
