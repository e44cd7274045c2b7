//! Global key listeners.
//!
//! Anything that needs keys regardless of focus (the open search session's
//! Esc, for one) registers a handler here and keeps the returned guard.
//! Dropping the guard unregisters the handler.  The newest listener sees a
//! key first; the first handler to return an action consumes the key.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ratatui::crossterm::event::KeyEvent;
use tracing::trace;

use crate::action::Action;

type Handler = Box<dyn Fn(&KeyEvent) -> Option<Action>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

#[derive(Clone, Default)]
pub struct KeyListeners {
    inner: Rc<RefCell<Registry>>,
}

impl KeyListeners {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "the listener is removed as soon as the guard is dropped"]
    pub fn register(&self, handler: impl Fn(&KeyEvent) -> Option<Action> + 'static) -> ListenerGuard {
        let mut registry = self.inner.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.push((id, Box::new(handler)));
        trace!("key listener {} registered", id);
        ListenerGuard {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    pub fn dispatch(&self, key: &KeyEvent) -> Option<Action> {
        let registry = self.inner.borrow();
        registry
            .handlers
            .iter()
            .rev()
            .find_map(|(_, handler)| handler(key))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ListenerGuard {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().handlers.retain(|(id, _)| *id != self.id);
            trace!("key listener {} removed", self.id);
        }
    }
}
