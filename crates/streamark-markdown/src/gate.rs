//! Visibility gating for code highlighting.
//!
//! Each code block owns a [`VisibilityGate`]. Until the gate opens the block is shown as plain
//! text; once it opens it stays open and the block is highlighted. Off-screen blocks therefore
//! never reach the highlighter, which caps highlighting work by viewport size rather than
//! document size.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::rc::Weak;
use streamark_core::observer::ObservationId;
use streamark_core::observer::ObserveOptions;
use streamark_core::observer::ViewportObserver;
use streamark_core::viewport::Region;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    NotObserved,
    Observing,
    Visible,
}

pub struct VisibilityGate {
    observer: Option<Rc<dyn ViewportObserver>>,
    options: ObserveOptions,
    visible: Rc<Cell<bool>>,
    subscription: Option<(ObservationId, Region)>,
}

impl VisibilityGate {
    /// Without an observer, or with one that cannot report a viewport, the gate starts open.
    pub fn new(observer: Option<Rc<dyn ViewportObserver>>, options: ObserveOptions) -> Self {
        let can_observe = observer.as_ref().is_some_and(|o| o.window().is_some());
        Self {
            observer,
            options,
            visible: Rc::new(Cell::new(!can_observe)),
            subscription: None,
        }
    }

    pub fn state(&self) -> GateState {
        if self.visible.get() {
            GateState::Visible
        } else if self.subscription.is_some() {
            GateState::Observing
        } else {
            GateState::NotObserved
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Tells the gate where its block currently sits.
    ///
    /// Opens immediately when the region is already near the viewport; otherwise registers a
    /// one-shot observation, replacing any earlier one for a different region.
    pub fn attach(&mut self, region: Region) -> GateState {
        if self.visible.get() {
            self.release();
            return GateState::Visible;
        }
        let Some(observer) = self.observer.clone() else {
            self.visible.set(true);
            return GateState::Visible;
        };
        let Some(window) = observer.window() else {
            self.visible.set(true);
            return GateState::Visible;
        };

        if self.options.is_near(region, window) {
            tracing::trace!(?region, "code block near viewport, opening gate");
            self.visible.set(true);
            self.release();
            return GateState::Visible;
        }

        if let Some((id, observed)) = self.subscription {
            if observed == region {
                return GateState::Observing;
            }
            observer.disconnect(id);
            self.subscription = None;
        }

        let flag: Weak<Cell<bool>> = Rc::downgrade(&self.visible);
        let id = observer.observe(
            region,
            self.options,
            Box::new(move || {
                if let Some(flag) = flag.upgrade() {
                    flag.set(true);
                }
            }),
        );
        self.subscription = Some((id, region));
        GateState::Observing
    }

    /// Releases a pending observation. The gate keeps its current visibility.
    pub fn release(&mut self) {
        if let Some((id, _)) = self.subscription.take()
            && let Some(observer) = &self.observer
        {
            observer.disconnect(id);
        }
    }
}

impl Drop for VisibilityGate {
    fn drop(&mut self) {
        self.release();
    }
}

/// Identifies a code block across render passes: segment position, then the block's ordinal
/// within that segment in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateKey {
    pub segment: usize,
    pub ordinal: usize,
}

/// The gates of every code block currently on screen, owned by a render session.
pub struct GateRegistry {
    observer: Option<Rc<dyn ViewportObserver>>,
    options: ObserveOptions,
    gates: BTreeMap<GateKey, VisibilityGate>,
}

impl GateRegistry {
    pub fn new(observer: Option<Rc<dyn ViewportObserver>>, options: ObserveOptions) -> Self {
        Self {
            observer,
            options,
            gates: BTreeMap::new(),
        }
    }

    pub fn gate(&mut self, key: GateKey) -> &mut VisibilityGate {
        let observer = self.observer.clone();
        let options = self.options;
        self.gates
            .entry(key)
            .or_insert_with(|| VisibilityGate::new(observer, options))
    }

    pub fn get(&self, key: GateKey) -> Option<&VisibilityGate> {
        self.gates.get(&key)
    }

    pub fn attach(&mut self, key: GateKey, region: Region) -> GateState {
        self.gate(key).attach(region)
    }

    /// Tears down every gate whose key fails `live`.
    pub fn retain(&mut self, mut live: impl FnMut(&GateKey) -> bool) {
        self.gates.retain(|key, _| live(key));
    }

    pub fn clear(&mut self) {
        self.gates.clear();
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamark_core::observer::ScrollObserver;
    use streamark_core::observer::VisibleCallback;

    fn scroll_observer() -> Rc<ScrollObserver> {
        Rc::new(ScrollObserver::new(Region::new(0, 0, 80, 20)))
    }

    fn gate_on(obs: &Rc<ScrollObserver>) -> VisibilityGate {
        let dyn_obs: Rc<dyn ViewportObserver> = obs.clone();
        VisibilityGate::new(Some(dyn_obs), ObserveOptions::default())
    }

    #[test]
    fn without_observer_gate_starts_open() {
        let gate = VisibilityGate::new(None, ObserveOptions::default());
        assert_eq!(gate.state(), GateState::Visible);
    }

    struct Headless;

    impl ViewportObserver for Headless {
        fn window(&self) -> Option<Region> {
            None
        }

        fn observe(&self, _: Region, _: ObserveOptions, _: VisibleCallback) -> ObservationId {
            unreachable!("headless hosts never observe")
        }

        fn disconnect(&self, _: ObservationId) {}
    }

    #[test]
    fn host_without_viewport_opens_gate() {
        let headless: Rc<dyn ViewportObserver> = Rc::new(Headless);
        let mut gate = VisibilityGate::new(Some(headless), ObserveOptions::default());
        assert!(gate.is_visible());
        assert_eq!(gate.attach(Region::rows(500, 3)), GateState::Visible);
    }

    #[test]
    fn precheck_opens_gate_without_subscription() {
        let obs = scroll_observer();
        let mut gate = gate_on(&obs);
        assert_eq!(gate.state(), GateState::NotObserved);
        assert_eq!(gate.attach(Region::new(0, 5, 80, 4)), GateState::Visible);
        assert_eq!(obs.pending_len(), 0);
    }

    #[test]
    fn off_screen_block_opens_on_scroll_and_never_closes() {
        let obs = scroll_observer();
        let mut gate = gate_on(&obs);
        assert_eq!(gate.attach(Region::new(0, 100, 80, 4)), GateState::Observing);
        assert_eq!(obs.pending_len(), 1);

        obs.set_window(Region::new(0, 90, 80, 20));
        assert_eq!(gate.state(), GateState::Visible);
        assert_eq!(obs.pending_len(), 0);

        obs.set_window(Region::new(0, 0, 80, 20));
        assert_eq!(gate.attach(Region::new(0, 100, 80, 4)), GateState::Visible);
    }

    #[test]
    fn reattaching_moves_the_subscription() {
        let obs = scroll_observer();
        let mut gate = gate_on(&obs);
        gate.attach(Region::new(0, 100, 80, 4));
        gate.attach(Region::new(0, 100, 80, 4));
        assert_eq!(obs.pending_len(), 1);
        gate.attach(Region::new(0, 200, 80, 4));
        assert_eq!(obs.pending_len(), 1);

        obs.set_window(Region::new(0, 95, 80, 20));
        assert!(!gate.is_visible());
        obs.set_window(Region::new(0, 195, 80, 20));
        assert!(gate.is_visible());
    }

    #[test]
    fn tall_block_opens_when_it_fills_the_viewport() {
        let obs = scroll_observer();
        let mut gate = gate_on(&obs);
        let tall = Region::new(0, 100, 80, 3000);
        assert_eq!(gate.attach(tall), GateState::Observing);

        obs.set_window(Region::new(0, 1500, 80, 20));
        assert_eq!(gate.attach(tall), GateState::Visible);
        assert_eq!(obs.pending_len(), 0);
    }

    /// Reports a movable window but never fires subscriptions on its own.
    #[derive(Default)]
    struct Silent {
        window: Cell<Region>,
        live: Cell<u32>,
    }

    impl ViewportObserver for Silent {
        fn window(&self) -> Option<Region> {
            Some(self.window.get())
        }

        fn observe(&self, _: Region, _: ObserveOptions, _: VisibleCallback) -> ObservationId {
            self.live.set(self.live.get() + 1);
            ScrollObserver::default().observe(
                Region::default(),
                ObserveOptions::default(),
                Box::new(|| {}),
            )
        }

        fn disconnect(&self, _: ObservationId) {
            self.live.set(self.live.get().saturating_sub(1));
        }
    }

    #[test]
    fn reattaching_the_same_region_rechecks_the_viewport() {
        let silent = Rc::new(Silent::default());
        silent.window.set(Region::new(0, 0, 80, 20));
        let dyn_silent: Rc<dyn ViewportObserver> = silent.clone();
        let mut gate = VisibilityGate::new(Some(dyn_silent), ObserveOptions::default());

        let tall = Region::new(0, 100, 80, 3000);
        assert_eq!(gate.attach(tall), GateState::Observing);
        assert_eq!(silent.live.get(), 1);

        silent.window.set(Region::new(0, 1500, 80, 20));
        assert_eq!(gate.attach(tall), GateState::Visible);
        assert_eq!(silent.live.get(), 0);
    }

    #[test]
    fn teardown_before_visible_disconnects() {
        let obs = scroll_observer();
        let mut gate = gate_on(&obs);
        gate.attach(Region::new(0, 100, 80, 4));
        drop(gate);
        assert_eq!(obs.pending_len(), 0);
        assert_eq!(obs.set_window(Region::new(0, 95, 80, 20)), 0);
    }

    #[test]
    fn registry_keeps_gates_per_key_and_tears_down_the_rest() {
        let obs = scroll_observer();
        let dyn_obs: Rc<dyn ViewportObserver> = obs.clone();
        let mut gates = GateRegistry::new(Some(dyn_obs), ObserveOptions::default());
        let a = GateKey {
            segment: 0,
            ordinal: 0,
        };
        let b = GateKey {
            segment: 1,
            ordinal: 0,
        };
        gates.attach(a, Region::new(0, 100, 80, 4));
        gates.attach(b, Region::new(0, 300, 80, 4));
        assert_eq!(obs.pending_len(), 2);

        gates.retain(|k| *k == a);
        assert_eq!(gates.len(), 1);
        assert_eq!(obs.pending_len(), 1);

        gates.clear();
        assert!(gates.is_empty());
        assert_eq!(obs.pending_len(), 0);
    }
}
