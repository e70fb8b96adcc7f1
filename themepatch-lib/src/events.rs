//! Change/reset notifications for collaborators that mirror editor state.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub selector: String,
    pub property: String,
    /// `None` when the property went back to its stylesheet default.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeEvent {
    Changed(PropertyChange),
    Reset(PropertyChange),
}

/// Fan-out of [`ThemeEvent`]s to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ThemeEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ThemeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every subscriber; dropped receivers are pruned.
    pub fn emit(&mut self, event: ThemeEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(value: Option<&str>) -> PropertyChange {
        PropertyChange {
            selector: ".a".into(),
            property: "color".into(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn every_subscriber_sees_events_in_order() {
        let mut bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.emit(ThemeEvent::Changed(change(Some("#ffffff"))));
        bus.emit(ThemeEvent::Reset(change(None)));

        for rx in [first, second] {
            let events: Vec<ThemeEvent> = rx.try_iter().collect();
            assert_eq!(
                events,
                vec![
                    ThemeEvent::Changed(change(Some("#ffffff"))),
                    ThemeEvent::Reset(change(None)),
                ]
            );
        }
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.emit(ThemeEvent::Reset(change(None)));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_iter().count(), 1);
    }
}
