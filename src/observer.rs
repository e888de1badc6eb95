//! Callbacks the engine delivers to whoever displays it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::entities::EntityId;

/// All methods default to no-ops so observers implement only what they use.
pub trait GameObserver {
    fn time_changed(&mut self, _elapsed: Duration) {}
    fn score_changed(&mut self, _score: u32) {}
    /// Entities dropped by a snapshot restore; views should forget them.
    fn renderables_removed(&mut self, _removed: &[EntityId]) {}
}

/// Lets the front-end keep a handle on an observer it gave to the engine.
impl<T: GameObserver> GameObserver for Rc<RefCell<T>> {
    fn time_changed(&mut self, elapsed: Duration) {
        self.borrow_mut().time_changed(elapsed);
    }

    fn score_changed(&mut self, score: u32) {
        self.borrow_mut().score_changed(score);
    }

    fn renderables_removed(&mut self, removed: &[EntityId]) {
        self.borrow_mut().renderables_removed(removed);
    }
}
