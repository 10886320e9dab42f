//! The market data distributor (spec.md §4.2).
//!
//! A single-producer ring buffer feeds one consumer thread, which is the sole
//! writer of every [`OrderBook`]/[`BestOrderBook`] it owns and the sole driver of
//! every registered subscriber callback. Subscription bookkeeping
//! (`subscribe_order_book`/`unsubscribe_order_book`) is callable from any thread —
//! it only touches a `parking_lot::Mutex`-guarded map, never the books themselves.

use crate::book::OrderBook;
use crate::event::MarketDataEvent;
use oms_instrument::instrument::InstrumentId;
use oms_integration::collection::FnvIndexMap;
use oms_integration::ring::SpscRing;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A callback invoked on the distributor thread every time the book for its
/// instrument changes. Must not block — spec.md §4.2: "Callbacks run on the
/// distributor thread and must not block." Anything wanting to issue an RPC
/// (e.g. algo re-pricing) hands off via `tokio::spawn` from inside the callback.
pub type BookCallback = Arc<dyn Fn(&OrderBook) + Send + Sync>;

/// Key identifying one subscription: which instrument, and which subscriber (the
/// spec's `"AlgoOrder_{clientOrderId}"` convention lives in `oms-execution`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubscriptionKey {
    instrument_id: InstrumentId,
    subscriber_key: SmolStr,
}

/// End-to-end latency + drop accounting for one (exchange, instrument) topic.
#[derive(Debug, Default)]
pub struct TopicStats {
    dropped: AtomicU64,
    delivered: AtomicU64,
    /// Sum of end-to-end micros across delivered events, for a cheap running
    /// average — a full histogram/Prometheus exporter is out of scope per
    /// spec.md §1.
    latency_us_total: AtomicU64,
}

impl TopicStats {
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn mean_latency_us(&self) -> f64 {
        let delivered = self.delivered();
        if delivered == 0 {
            return 0.0;
        }
        self.latency_us_total.load(Ordering::Relaxed) as f64 / delivered as f64
    }
}

/// Single-producer multi-consumer market data fan-out.
///
/// Owns every [`OrderBook`] it is responsible for and dispatches each drained
/// event to: (1) that instrument's book, then (2) every registered subscriber
/// callback for that instrument, in registration order.
#[derive(Debug)]
pub struct MarketDataDistributor {
    ring: SpscRing<MarketDataEvent>,
    books: FnvIndexMap<InstrumentId, Arc<RwLock<OrderBook>>>,
    subscribers: Mutex<FnvIndexMap<InstrumentId, Vec<(SmolStr, BookCallback)>>>,
    stats: Mutex<FnvIndexMap<InstrumentId, Arc<TopicStats>>>,
}

impl MarketDataDistributor {
    pub fn new(ring_capacity: usize) -> Result<Self, oms_integration::SocketError> {
        Ok(Self {
            ring: SpscRing::new(ring_capacity)?,
            books: FnvIndexMap::default(),
            subscribers: Mutex::new(FnvIndexMap::default()),
            stats: Mutex::new(FnvIndexMap::default()),
        })
    }

    /// Producer-side handle; clone and hand to feed adapter tasks.
    pub fn producer(&self) -> SpscRing<MarketDataEvent> {
        self.ring.clone()
    }

    /// Register the book a given instrument's events should be routed to. Call
    /// once per instrument before the consumer loop starts.
    pub fn register_book(&mut self, instrument_id: InstrumentId, book: Arc<RwLock<OrderBook>>) {
        self.books.insert(instrument_id, book);
        self.stats
            .lock()
            .entry(instrument_id)
            .or_insert_with(|| Arc::new(TopicStats::default()));
    }

    pub fn book(&self, instrument_id: InstrumentId) -> Option<Arc<RwLock<OrderBook>>> {
        self.books.get(&instrument_id).cloned()
    }

    pub fn topic_stats(&self, instrument_id: InstrumentId) -> Option<Arc<TopicStats>> {
        self.stats.lock().get(&instrument_id).cloned()
    }

    /// Subscribe a named callback to updates for `instrument_id`. Callable from
    /// any thread; only mutates the subscriber map, never a book.
    pub fn subscribe_order_book(
        &self,
        instrument_id: InstrumentId,
        subscriber_key: impl Into<SmolStr>,
        callback: BookCallback,
    ) {
        let key = subscriber_key.into();
        self.subscribers
            .lock()
            .entry(instrument_id)
            .or_default()
            .push((key, callback));
    }

    pub fn unsubscribe_order_book(&self, instrument_id: InstrumentId, subscriber_key: &str) {
        if let Some(subs) = self.subscribers.lock().get_mut(&instrument_id) {
            subs.retain(|(key, _)| key.as_str() != subscriber_key);
        }
    }

    /// Drain and dispatch one event, blocking up to `timeout` for one to arrive.
    /// Returns `false` if nothing arrived within `timeout`.
    pub fn run_once(&self, timeout: Duration) -> bool {
        let Some(event) = self.ring.poll_timeout(timeout) else {
            return false;
        };
        self.dispatch(&event);
        true
    }

    /// Drain and dispatch every event currently queued, without blocking.
    pub fn drain_available(&self) -> usize {
        let mut n = 0;
        while let Some(event) = self.ring.try_poll() {
            self.dispatch(&event);
            n += 1;
        }
        n
    }

    fn dispatch(&self, event: &MarketDataEvent) {
        let instrument_id = event.instrument_id;
        let stats = {
            let mut guard = self.stats.lock();
            guard
                .entry(instrument_id)
                .or_insert_with(|| Arc::new(TopicStats::default()))
                .clone()
        };

        if let Some(book) = self.books.get(&instrument_id) {
            let mut guard = book.write();
            guard.apply_event(event);
        }

        let subscribers = {
            let guard = self.subscribers.lock();
            guard.get(&instrument_id).cloned().unwrap_or_default()
        };

        if let Some(book) = self.books.get(&instrument_id) {
            let guard = book.read();
            for (_, callback) in &subscribers {
                callback(&guard);
            }
        }

        stats.delivered.fetch_add(1, Ordering::Relaxed);
        let now_us = now_micros();
        if now_us > event.timestamp_us {
            stats
                .latency_us_total
                .fetch_add((now_us - event.timestamp_us) as u64, Ordering::Relaxed);
        }
    }
}

fn now_micros() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MarketDataEventKind, PriceLevelUpdate};
    use oms_instrument::{exchange::ExchangeId, num::Price, num::Quantity, side::Side};
    use std::sync::atomic::AtomicUsize;

    fn event(seq: u64, instrument_id: InstrumentId) -> MarketDataEvent {
        MarketDataEvent {
            sequence: seq,
            timestamp_us: 0,
            kind: MarketDataEventKind::Add,
            instrument_id,
            source_exchange: ExchangeId::Binance,
            updates: vec![PriceLevelUpdate {
                side: Side::Buy,
                price_ticks: 100,
                qty_ticks: 1,
            }],
        }
    }

    #[test]
    fn dispatch_updates_book_and_calls_subscribers_in_order() {
        let instrument_id = InstrumentId(0);
        let mut distributor = MarketDataDistributor::new(16).unwrap();
        let book = Arc::new(RwLock::new(OrderBook::new(
            instrument_id,
            "BTC-PERP",
            ExchangeId::Binance,
            Price::from_ticks(1),
            Quantity::from_ticks(1),
        )));
        distributor.register_book(instrument_id, book.clone());

        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let order_a = order.clone();
        let order_b = order.clone();
        distributor.subscribe_order_book(
            instrument_id,
            "first",
            Arc::new(move |_| order_a.lock().push("first")),
        );
        distributor.subscribe_order_book(
            instrument_id,
            "second",
            Arc::new(move |_| order_b.lock().push("second")),
        );

        let producer = distributor.producer();
        producer.publish(event(1, instrument_id));
        assert_eq!(distributor.drain_available(), 1);

        assert_eq!(book.read().best_bid().0, Price::from_ticks(100));
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_stops_future_callbacks() {
        let instrument_id = InstrumentId(0);
        let mut distributor = MarketDataDistributor::new(16).unwrap();
        let book = Arc::new(RwLock::new(OrderBook::new(
            instrument_id,
            "BTC-PERP",
            ExchangeId::Binance,
            Price::from_ticks(1),
            Quantity::from_ticks(1),
        )));
        distributor.register_book(instrument_id, book);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        distributor.subscribe_order_book(
            instrument_id,
            "sub",
            Arc::new(move |_| {
                calls_clone.fetch_add(1, Ordering::Relaxed);
            }),
        );

        let producer = distributor.producer();
        producer.publish(event(1, instrument_id));
        distributor.drain_available();
        distributor.unsubscribe_order_book(instrument_id, "sub");
        producer.publish(event(2, instrument_id));
        distributor.drain_available();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn ring_full_increments_dropped_stat() {
        let ring: SpscRing<u32> = SpscRing::new(2).unwrap();
        ring.publish(1);
        ring.publish(2);
        assert!(!ring.publish(3));
        assert_eq!(ring.stats().dropped(), 1);
    }
}
