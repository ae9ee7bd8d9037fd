//! Change notification.
//!
//! Listeners are plain callbacks registered on a [`ChangeBus`]; each
//! registration returns a [`SubscriptionId`] used to remove it again.
//! Delivery is synchronous and never nested: [`ChangeBus::publish`] takes
//! `&mut self` and a listener only sees `&DateChange`, so nothing can publish
//! while a delivery round is running.

use serde::Serialize;

use crate::date_key::DateKey;

/// What a write did to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "dates", rename_all = "snake_case")]
pub enum DateChange {
    /// Only these dates changed.
    Dates(Vec<DateKey>),
    /// Anything may have changed (lanes, recurrence caches, carry-forward).
    Global,
}

impl DateChange {
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Whether the change can affect `date`.
    pub fn touches(&self, date: DateKey) -> bool {
        match self {
            Self::Global => true,
            Self::Dates(dates) => dates.binary_search(&date).is_ok(),
        }
    }
}

/// Token returned by [`ChangeBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&DateChange)>;

#[derive(Default)]
pub struct ChangeBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DateChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if the token was already used.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Deliver `change` to every listener in subscription order. An empty
    /// date list is dropped.
    pub fn publish(&mut self, change: DateChange) {
        if let DateChange::Dates(dates) = &change {
            if dates.is_empty() {
                return;
            }
        }
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ChangeBus::new();

        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |c| sink.borrow_mut().push(c.clone()));
        bus.publish(DateChange::Global);
        bus.publish(DateChange::Dates(vec![key("2024-01-01")]));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(DateChange::Global);

        assert_eq!(
            *seen.borrow(),
            vec![DateChange::Global, DateChange::Dates(vec![key("2024-01-01")])]
        );
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ChangeBus::new();
        for name in ["first", "second"] {
            let sink = Rc::clone(&seen);
            bus.subscribe(move |_| sink.borrow_mut().push(name));
        }
        bus.publish(DateChange::Global);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_empty_date_lists_are_dropped() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = ChangeBus::new();
        let sink = Rc::clone(&count);
        bus.subscribe(move |_| *sink.borrow_mut() += 1);

        bus.publish(DateChange::Dates(Vec::new()));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_touches() {
        let change = DateChange::Dates(vec![key("2024-01-01"), key("2024-01-03")]);
        assert!(change.touches(key("2024-01-03")));
        assert!(!change.touches(key("2024-01-02")));
        assert!(DateChange::Global.touches(key("1900-01-01")));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&DateChange::Dates(vec![key("2024-01-01")])).unwrap();
        assert_eq!(json, r#"{"scope":"dates","dates":["2024-01-01"]}"#);
        let json = serde_json::to_string(&DateChange::Global).unwrap();
        assert_eq!(json, r#"{"scope":"global"}"#);
    }
}
