//! Exclusive handle on the LoRaWAN stack.

use super::stack::RadioStack;
use log::debug;

/// Owns the stack for the lifetime of the process.
///
/// Not `Clone`: the activation controller holds it until the join succeeds,
/// then it is moved into the uplink scheduler. Whoever owns the session is
/// the only caller of the stack.
pub struct RadioSession<S: RadioStack> {
    stack: S,
}

impl<S: RadioStack> RadioSession<S> {
    /// Take ownership of the stack and initialize it.
    pub fn new(mut stack: S) -> Self {
        debug!("Initializing LoRaWAN stack");
        stack.initialize();
        Self { stack }
    }

    pub(crate) fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }
}
