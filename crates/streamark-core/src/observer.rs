//! One-shot viewport observation.
//!
//! A [`ViewportObserver`] lets a consumer ask "tell me once when this region comes near the
//! viewport". Subscriptions are single-shot: the callback is an `FnOnce` and the observer drops
//! the subscription before invoking it, so a region can never be reported twice.
//!
//! [`ScrollObserver`] is the implementation used by terminal hosts: the host pushes its current
//! scroll window with [`ScrollObserver::set_window`] and pending subscriptions fire from inside
//! that call. Everything is single-threaded; share the observer with `Rc`.

use crate::viewport::Region;
use crate::viewport::covers_padded;
use crate::viewport::intersection_ratio;
use crate::viewport::intersects_padded;
use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObserveOptions {
    /// Rows added above and below the viewport before testing intersection.
    pub margin_rows: u32,
    /// Minimal visible fraction of the region's area that counts as "visible".
    pub threshold: f64,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            margin_rows: 4,
            threshold: 0.01,
        }
    }
}

impl ObserveOptions {
    /// Synchronous pre-check used before registering a subscription.
    pub fn is_near(&self, region: Region, window: Region) -> bool {
        intersects_padded(region, window, self.margin_rows)
    }

    fn qualifies(&self, region: Region, window: Region) -> bool {
        if covers_padded(region, window, self.margin_rows) {
            return true;
        }
        let ratio = intersection_ratio(region, window, self.margin_rows);
        ratio > 0.0 && ratio >= self.threshold
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationId(u64);

pub type VisibleCallback = Box<dyn FnOnce()>;

pub trait ViewportObserver {
    /// Current viewport window, or `None` when the host cannot observe visibility at all.
    fn window(&self) -> Option<Region>;

    fn observe(
        &self,
        region: Region,
        options: ObserveOptions,
        on_visible: VisibleCallback,
    ) -> ObservationId;

    /// Releases a pending subscription. Unknown or already-fired ids are ignored.
    fn disconnect(&self, id: ObservationId);
}

struct Pending {
    region: Region,
    options: ObserveOptions,
    on_visible: VisibleCallback,
}

#[derive(Default)]
pub struct ScrollObserver {
    window: Cell<Option<Region>>,
    next_id: Cell<u64>,
    pending: RefCell<BTreeMap<ObservationId, Pending>>,
}

impl ScrollObserver {
    pub fn new(window: Region) -> Self {
        let this = Self::default();
        this.window.set(Some(window));
        this
    }

    /// Moves the viewport and fires every subscription that now qualifies.
    ///
    /// Returns how many subscriptions fired.
    pub fn set_window(&self, window: Region) -> usize {
        self.window.set(Some(window));

        let fired: Vec<(ObservationId, VisibleCallback)> = {
            let mut pending = self.pending.borrow_mut();
            let ready: Vec<ObservationId> = pending
                .iter()
                .filter(|(_, p)| p.options.qualifies(p.region, window))
                .map(|(id, _)| *id)
                .collect();
            ready
                .into_iter()
                .filter_map(|id| pending.remove(&id).map(|p| (id, p.on_visible)))
                .collect()
        };

        let count = fired.len();
        for (id, on_visible) in fired {
            tracing::trace!(?id, "viewport observation fired");
            on_visible();
        }
        count
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl ViewportObserver for ScrollObserver {
    fn window(&self) -> Option<Region> {
        self.window.get()
    }

    fn observe(
        &self,
        region: Region,
        options: ObserveOptions,
        on_visible: VisibleCallback,
    ) -> ObservationId {
        let id = ObservationId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.pending.borrow_mut().insert(
            id,
            Pending {
                region,
                options,
                on_visible,
            },
        );
        id
    }

    fn disconnect(&self, id: ObservationId) {
        if self.pending.borrow_mut().remove(&id).is_some() {
            tracing::trace!(?id, "viewport observation disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, VisibleCallback) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, Box::new(move || h.set(h.get() + 1)))
    }

    #[test]
    fn fires_once_when_region_scrolls_into_view() {
        let obs = ScrollObserver::new(Region::new(0, 0, 80, 10));
        let (hits, cb) = counter();
        obs.observe(Region::new(0, 50, 80, 5), ObserveOptions::default(), cb);

        assert_eq!(obs.set_window(Region::new(0, 20, 80, 10)), 0);
        assert_eq!(obs.set_window(Region::new(0, 40, 80, 10)), 1);
        assert_eq!(obs.set_window(Region::new(0, 45, 80, 10)), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(obs.pending_len(), 0);
    }

    #[test]
    fn margin_triggers_before_region_is_on_screen() {
        let obs = ScrollObserver::new(Region::new(0, 0, 80, 10));
        let (hits, cb) = counter();
        let options = ObserveOptions {
            margin_rows: 4,
            ..ObserveOptions::default()
        };
        obs.observe(Region::new(0, 22, 80, 3), options, cb);
        obs.set_window(Region::new(0, 9, 80, 10));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn region_taller_than_the_viewport_fires_once_it_fills_it() {
        let obs = ScrollObserver::new(Region::new(0, 0, 80, 20));
        let (hits, cb) = counter();
        obs.observe(Region::new(0, 100, 80, 3000), ObserveOptions::default(), cb);

        assert_eq!(obs.set_window(Region::new(0, 1500, 80, 20)), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn disconnected_subscription_never_fires() {
        let obs = ScrollObserver::new(Region::new(0, 0, 80, 10));
        let (hits, cb) = counter();
        let id = obs.observe(Region::new(0, 50, 80, 5), ObserveOptions::default(), cb);
        obs.disconnect(id);
        obs.disconnect(id);
        obs.set_window(Region::new(0, 50, 80, 10));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn callback_may_register_new_subscriptions() {
        let obs = Rc::new(ScrollObserver::new(Region::new(0, 0, 80, 10)));
        let inner = obs.clone();
        obs.observe(
            Region::new(0, 30, 80, 2),
            ObserveOptions::default(),
            Box::new(move || {
                inner.observe(
                    Region::new(0, 90, 80, 2),
                    ObserveOptions::default(),
                    Box::new(|| {}),
                );
            }),
        );
        obs.set_window(Region::new(0, 28, 80, 10));
        assert_eq!(obs.pending_len(), 1);
    }
}
