//! Selection and highlight broadcast between sibling widgets.
//!
//! Each annotation page owns one [`EventBus`]. Widgets register once, then
//! publish events tagged with their widget id; subscribers are called
//! synchronously, and never for their own events.

use std::cell::RefCell;
use std::rc::Rc;

use callico_geometry::{Element, Polygon};
use serde::{Deserialize, Serialize};

use crate::gesture::Mode;
use crate::model::{Region, RegionId};

/// Events shared between the annotator and its sibling widgets.
///
/// Serializes as `{"event": "select-element", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    CreateElement {
        region: Region,
    },
    UpdateElement {
        id: RegionId,
        polygon: Polygon,
    },
    DeleteElement {
        id: RegionId,
    },
    /// `force` applies the change outside of select mode
    SelectElement {
        id: RegionId,
        #[serde(default)]
        force: bool,
    },
    UnselectElement {
        id: RegionId,
        #[serde(default)]
        force: bool,
    },
    UpdateSelectedElements {
        ids: Vec<RegionId>,
        #[serde(default)]
        force: bool,
    },
    /// `hover` marks pointer hover rather than an explicit highlight
    UpdateHighlightedElements {
        ids: Vec<RegionId>,
        #[serde(default)]
        hover: bool,
    },
    UpdateProps {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<Element>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        children: Option<Vec<Option<Region>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<Mode>,
    },
    CarouselSelectElement {
        id: RegionId,
    },
}

impl BroadcastEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateElement { .. } => "create-element",
            Self::UpdateElement { .. } => "update-element",
            Self::DeleteElement { .. } => "delete-element",
            Self::SelectElement { .. } => "select-element",
            Self::UnselectElement { .. } => "unselect-element",
            Self::UpdateSelectedElements { .. } => "update-selected-elements",
            Self::UpdateHighlightedElements { .. } => "update-highlighted-elements",
            Self::UpdateProps { .. } => "update-props",
            Self::CarouselSelectElement { .. } => "carousel-select-element",
        }
    }
}

/// Identifies the widget publishing or subscribing.
pub type WidgetId = u64;

/// Handle used to unsubscribe.
pub type SubscriptionId = u64;

type Handler = Rc<RefCell<dyn FnMut(&BroadcastEvent)>>;

struct Subscription {
    id: SubscriptionId,
    owner: WidgetId,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    subscriptions: Vec<Subscription>,
    next_widget: WidgetId,
    next_subscription: SubscriptionId,
}

/// Synchronous publish/subscribe channel for one page.
#[derive(Default)]
pub struct EventBus {
    state: RefCell<BusState>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventBus")
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Allocate a widget id.
    pub fn register_widget(&self) -> WidgetId {
        let mut state = self.state.borrow_mut();
        state.next_widget += 1;
        state.next_widget
    }

    pub fn subscribe(
        &self,
        owner: WidgetId,
        handler: impl FnMut(&BroadcastEvent) + 'static,
    ) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_subscription += 1;
        let id = state.next_subscription;
        state.subscriptions.push(Subscription {
            id,
            owner,
            handler: Rc::new(RefCell::new(handler)),
        });
        log::trace!("Widget {} subscribed ({})", owner, id);
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.id != id);
        before != state.subscriptions.len()
    }

    /// Deliver an event to every other widget.
    ///
    /// Handlers may publish or subscribe themselves. A handler that is
    /// already running further up the stack is skipped. Returns how many
    /// handlers ran.
    pub fn publish(&self, origin: WidgetId, event: &BroadcastEvent) -> usize {
        let handlers: Vec<(SubscriptionId, Handler)> = self
            .state
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.owner != origin)
            .map(|s| (s.id, Rc::clone(&s.handler)))
            .collect();

        log::debug!(
            "Widget {} publishes {} to {} handler(s)",
            origin,
            event.name(),
            handlers.len()
        );

        let mut delivered = 0;
        for (id, handler) in handlers {
            match handler.try_borrow_mut() {
                Ok(mut handler) => {
                    (*handler)(event);
                    delivered += 1;
                }
                Err(_) => log::warn!(
                    "Skipping re-entrant delivery of {} to subscription {}",
                    event.name(),
                    id
                ),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, owner: WidgetId) -> Rc<RefCell<Vec<BroadcastEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(owner, move |event| sink.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn test_publisher_does_not_receive_own_events() {
        let bus = EventBus::new();
        let a = bus.register_widget();
        let b = bus.register_widget();
        let seen_a = recorder(&bus, a);
        let seen_b = recorder(&bus, b);

        let event = BroadcastEvent::SelectElement { id: 1, force: false };
        assert_eq!(bus.publish(a, &event), 1);
        assert!(seen_a.borrow().is_empty());
        assert_eq!(seen_b.borrow().as_slice(), &[event]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let a = bus.register_widget();
        let b = bus.register_widget();
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        let id = bus.subscribe(b, move |_| *counter.borrow_mut() += 1);

        bus.publish(a, &BroadcastEvent::DeleteElement { id: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(a, &BroadcastEvent::DeleteElement { id: 2 });
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_reentrant_publish_is_bounded() {
        let bus = EventBus::new();
        let a = bus.register_widget();
        let b = bus.register_widget();
        let calls = Rc::new(RefCell::new(0));

        let echo_bus = Rc::clone(&bus);
        let echo_calls = Rc::clone(&calls);
        bus.subscribe(b, move |event| {
            *echo_calls.borrow_mut() += 1;
            // Echo under another widget id, which would reach this handler again
            echo_bus.publish(a, event);
        });

        bus.publish(a, &BroadcastEvent::CarouselSelectElement { id: 4 });
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_wire_format() {
        let event = BroadcastEvent::UpdateHighlightedElements {
            ids: vec![2, 5],
            hover: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "update-highlighted-elements");
        assert_eq!(json["payload"]["ids"], serde_json::json!([2, 5]));
        assert_eq!(event.name(), "update-highlighted-elements");

        let parsed: BroadcastEvent =
            serde_json::from_str(r#"{"event": "select-element", "payload": {"id": 3}}"#).unwrap();
        assert_eq!(parsed, BroadcastEvent::SelectElement { id: 3, force: false });
    }
}
