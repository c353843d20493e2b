use crate::dashboard::Dashboard;
use crate::metrics::{clock_label, DashboardEvent};
use crate::storage::ViewStore;
use crate::view::DashboardView;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// An inbound event stamped with the local time it arrived at.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub event: DashboardEvent,
    pub label: String,
}

/// Owner of the session's dashboard state. Lives inside the nuts activity so
/// that nothing else can reach the rolling buffers.
pub struct DashboardActivity {
    dashboard: Dashboard,
    store: Arc<ViewStore>,
    view_tx: broadcast::Sender<DashboardView>,
}

impl DashboardActivity {
    pub fn new(
        dashboard: Dashboard,
        store: Arc<ViewStore>,
        view_tx: broadcast::Sender<DashboardView>,
    ) -> Self {
        Self {
            dashboard,
            store,
            view_tx,
        }
    }

    fn on_event(&mut self, evt: &InboundEvent) {
        self.dashboard.handle(&evt.event, &evt.label);
        let view = self.dashboard.view();
        self.store.publish(view.clone());

        if self.view_tx.receiver_count() == 0 {
            debug!("No stream subscribers for {}", evt.event.name());
            return;
        }
        if let Err(e) = self.view_tx.send(view) {
            // Subscribers went away between the check and the send; the store stays authoritative.
            warn!("Failed to broadcast view: {}", e);
        }
    }
}

pub fn register_dashboard(activity: DashboardActivity) -> nuts::ActivityId<DashboardActivity> {
    let id = nuts::new_activity(activity);
    id.subscribe(|act: &mut DashboardActivity, evt: &InboundEvent| {
        act.on_event(evt);
    });
    id
}

pub fn publish_event(event: DashboardEvent) {
    nuts::publish(InboundEvent {
        event,
        label: clock_label(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TimeUpdate;

    #[test]
    fn published_events_reach_store_in_order() {
        let store = Arc::new(ViewStore::new());
        let (view_tx, mut view_rx) = broadcast::channel(8);
        let _activity = register_dashboard(DashboardActivity::new(
            Dashboard::new(300),
            store.clone(),
            view_tx,
        ));

        publish_event(DashboardEvent::SystemData(
            serde_json::from_str(r#"{"cpu": {"percent": 20}}"#).unwrap(),
        ));
        publish_event(DashboardEvent::TimeUpdate(TimeUpdate {
            duration: "0:00:01".into(),
            remaining: "04:59".into(),
        }));

        let latest = store.latest().unwrap();
        assert_eq!(latest.tick, 1);
        assert_eq!(latest.cpu.current, "20.0%");
        assert_eq!(latest.clock.unwrap().remaining, "04:59");

        assert_eq!(view_rx.try_recv().unwrap().tick, 1);
        assert!(view_rx.try_recv().unwrap().clock.is_some());
    }
}
