use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static! {
    pub static ref ACTIVE_ROOMS: IntGauge =
        register_int_gauge!("core_active_rooms", "Number of currently active rooms").unwrap();
    pub static ref ACTIVE_PARTICIPANTS: IntGauge = register_int_gauge!(
        "core_active_participants",
        "Number of currently connected participants"
    )
    .unwrap();
    pub static ref ACTIVE_PRODUCERS: IntGauge = register_int_gauge!(
        "core_active_producers",
        "Number of currently open producers"
    )
    .unwrap();
    pub static ref ACTIVE_CONSUMERS: IntGauge = register_int_gauge!(
        "core_active_consumers",
        "Number of currently open consumers"
    )
    .unwrap();
    pub static ref WS_MESSAGES_SENT_TOTAL: IntCounter = register_int_counter!(
        "core_ws_messages_sent_total",
        "Total number of signaling frames written to sessions"
    )
    .unwrap();
    pub static ref WS_MESSAGES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        "core_ws_messages_dropped_total",
        "Total number of signaling frames dropped because the session was not writable"
    )
    .unwrap();
    pub static ref LIVENESS_TERMINATIONS_TOTAL: IntCounter = register_int_counter!(
        "core_liveness_terminations_total",
        "Total number of sessions force-terminated for missing two consecutive liveness ticks"
    )
    .unwrap();
    pub static ref WORKER_DEATHS_TOTAL: IntCounter = register_int_counter!(
        "core_sfu_worker_deaths_total",
        "Total number of SFU worker process deaths observed"
    )
    .unwrap();
}

pub fn register_metrics() {
    // Force initialization of the lazy statics so the first scrape after
    // startup already lists every series, even at zero.
    let _ = ACTIVE_ROOMS.get();
    let _ = ACTIVE_PARTICIPANTS.get();
    let _ = ACTIVE_PRODUCERS.get();
    let _ = ACTIVE_CONSUMERS.get();
    let _ = WS_MESSAGES_SENT_TOTAL.get();
    let _ = WS_MESSAGES_DROPPED_TOTAL.get();
    let _ = LIVENESS_TERMINATIONS_TOTAL.get();
    let _ = WORKER_DEATHS_TOTAL.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        register_metrics();
        let before = ACTIVE_ROOMS.get();
        ACTIVE_ROOMS.inc();
        assert_eq!(ACTIVE_ROOMS.get(), before + 1);
        ACTIVE_ROOMS.dec();
    }
}
