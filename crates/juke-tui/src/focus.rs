//! FocusRing — keyboard focus cycling between the visible panels.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + self.items.len() - 1) % self.items.len();
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Replace the ring when panels come and go (search opens, the device
    /// picker appears).  Keeps the focused panel if it is still there.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        if items == self.items {
            return;
        }
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_and_keep_focus() {
        let mut ring = FocusRing::new(vec![ComponentId::Playback, ComponentId::Upcoming]);
        assert_eq!(ring.next(), Some(ComponentId::Upcoming));
        assert_eq!(ring.next(), Some(ComponentId::Playback));
        assert_eq!(ring.prev(), Some(ComponentId::Upcoming));

        ring.set_items(vec![
            ComponentId::Search,
            ComponentId::Playback,
            ComponentId::Upcoming,
        ]);
        assert!(ring.is_focused(ComponentId::Upcoming));

        ring.set_items(vec![ComponentId::Playback]);
        assert!(ring.is_focused(ComponentId::Playback));
    }
}
