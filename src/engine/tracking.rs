use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::location::{DeliveryLocation, GeoPoint, LocationEvent};
use crate::observability::metrics::Metrics;

/// Latest driver positions plus one broadcast channel per tracked order.
pub struct TrackingHub {
    locations: DashMap<(Uuid, Uuid), DeliveryLocation>,
    channels: DashMap<Uuid, broadcast::Sender<LocationEvent>>,
    buffer_size: usize,
    metrics: Metrics,
}

impl TrackingHub {
    pub fn new(buffer_size: usize, metrics: Metrics) -> Self {
        Self {
            locations: DashMap::new(),
            channels: DashMap::new(),
            buffer_size: buffer_size.max(1),
            metrics,
        }
    }

    /// Insert-or-replace keyed on `(order_id, delivery_user_id)`.
    pub fn upsert(
        &self,
        order_id: Uuid,
        delivery_user_id: Uuid,
        point: GeoPoint,
        at: DateTime<Utc>,
    ) -> LocationEvent {
        let location = DeliveryLocation {
            order_id,
            delivery_user_id,
            lat: point.lat,
            lng: point.lng,
            updated_at: at,
        };

        let previous = self
            .locations
            .insert((order_id, delivery_user_id), location.clone());

        let event = match previous {
            Some(_) => LocationEvent::Updated { location },
            None => LocationEvent::Inserted { location },
        };

        self.publish(order_id, event.clone());
        event
    }

    /// Deletes one driver's row. Returns whether a row existed.
    pub fn remove(&self, order_id: Uuid, delivery_user_id: Uuid) -> bool {
        let removed = self
            .locations
            .remove(&(order_id, delivery_user_id))
            .is_some();

        if removed {
            self.publish(
                order_id,
                LocationEvent::Deleted {
                    order_id,
                    delivery_user_id,
                },
            );
        }
        removed
    }

    /// Deletes every row for the order. Returns how many were dropped.
    pub fn teardown(&self, order_id: Uuid) -> usize {
        let drivers: Vec<Uuid> = self
            .locations
            .iter()
            .filter(|entry| entry.key().0 == order_id)
            .map(|entry| entry.key().1)
            .collect();

        drivers
            .into_iter()
            .filter(|driver| self.remove(order_id, *driver))
            .count()
    }

    /// Most recent sample across the order's drivers.
    pub fn latest(&self, order_id: Uuid) -> Option<DeliveryLocation> {
        self.locations
            .iter()
            .filter(|entry| entry.key().0 == order_id)
            .map(|entry| entry.value().clone())
            .max_by_key(|location| location.updated_at)
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn subscribe(self: &Arc<Self>, order_id: Uuid) -> Subscription {
        let receiver = self
            .channels
            .entry(order_id)
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe();

        self.metrics.tracking_subscribers.inc();
        debug!(order_id = %order_id, "tracking subscription opened");

        Subscription {
            order_id,
            receiver: Some(receiver),
            hub: Arc::clone(self),
        }
    }

    pub fn subscriber_count(&self, order_id: Uuid) -> usize {
        self.channels
            .get(&order_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    fn publish(&self, order_id: Uuid, event: LocationEvent) {
        self.metrics
            .location_updates_total
            .with_label_values(&[event.kind()])
            .inc();

        if let Some(sender) = self.channels.get(&order_id) {
            // No receivers is fine: nobody is watching this order right now.
            let _ = sender.send(event);
        }
    }

    fn release(&self, order_id: Uuid) {
        self.metrics.tracking_subscribers.dec();
        self.channels
            .remove_if(&order_id, |_, sender| sender.receiver_count() == 0);
        debug!(order_id = %order_id, "tracking subscription closed");
    }
}

/// One subscriber's view of an order's location feed. Dropping it
/// unsubscribes.
pub struct Subscription {
    order_id: Uuid,
    receiver: Option<broadcast::Receiver<LocationEvent>>,
    hub: Arc<TrackingHub>,
}

impl Subscription {
    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// Next event, or `None` once unsubscribed or the channel closes. Events
    /// missed by a lagging subscriber are skipped: only the newest position
    /// matters.
    pub async fn recv(&mut self) -> Option<LocationEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(order_id = %self.order_id, skipped, "tracking subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Consumes the subscription as a stream; the subscription is released
    /// when the stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = LocationEvent> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Receiver must go first so the channel sees the lower count.
        self.receiver.take();
        self.hub.release(self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::TrackingHub;
    use crate::models::location::{GeoPoint, LocationEvent};
    use crate::observability::metrics::Metrics;

    fn hub() -> Arc<TrackingHub> {
        Arc::new(TrackingHub::new(16, Metrics::new()))
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn repeated_upserts_keep_one_row_with_latest_values() {
        let hub = hub();
        let order = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let start = Utc::now();

        let first = hub.upsert(order, driver, point(-34.60, -58.38), start);
        let second = hub.upsert(
            order,
            driver,
            point(-34.61, -58.39),
            start + Duration::seconds(5),
        );

        assert!(matches!(first, LocationEvent::Inserted { .. }));
        assert!(matches!(second, LocationEvent::Updated { .. }));
        assert_eq!(hub.location_count(), 1);

        let latest = hub.latest(order).unwrap();
        assert_eq!(latest.lat, -34.61);
        assert_eq!(latest.lng, -58.39);
    }

    #[tokio::test]
    async fn subscribers_receive_updates_and_deletes() {
        let hub = hub();
        let order = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let mut first = hub.subscribe(order);
        let mut second = hub.subscribe(order);
        assert_eq!(hub.subscriber_count(order), 2);

        hub.upsert(order, driver, point(1.0, 1.0), Utc::now());
        assert_eq!(hub.teardown(order), 1);

        for subscription in [&mut first, &mut second] {
            let inserted = subscription.recv().await.unwrap();
            assert_eq!(inserted.location().unwrap().lat, 1.0);

            let deleted = subscription.recv().await.unwrap();
            assert!(matches!(deleted, LocationEvent::Deleted { .. }));
        }
        assert!(hub.latest(order).is_none());
    }

    #[tokio::test]
    async fn events_for_other_orders_are_not_delivered() {
        let hub = hub();
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let mut subscription = hub.subscribe(watched);
        hub.upsert(other, driver, point(2.0, 2.0), Utc::now());
        hub.upsert(watched, driver, point(3.0, 3.0), Utc::now());

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.location().unwrap().order_id, watched);
    }

    #[test]
    fn unsubscribing_releases_the_channel() {
        let hub = hub();
        let order = Uuid::new_v4();

        let first = hub.subscribe(order);
        let second = hub.subscribe(order);
        first.unsubscribe();
        assert_eq!(hub.subscriber_count(order), 1);

        drop(second);
        assert_eq!(hub.subscriber_count(order), 0);
        assert_eq!(hub.metrics.tracking_subscribers.get(), 0);
    }

    #[test]
    fn removing_a_missing_row_is_a_no_op() {
        let hub = hub();
        assert!(!hub.remove(Uuid::new_v4(), Uuid::new_v4()));
        assert_eq!(hub.teardown(Uuid::new_v4()), 0);
    }
}
