//! Ping/pong liveness sweep
//!
//! A session that has not answered the previous probe by the time the next
//! sweep runs is evicted; its connection task then tears the session down
//! through the normal leave path.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::room::RoomHandle;

/// Sweep results
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub probed: usize,
    /// Probes postponed because the session's queue was full
    pub deferred: usize,
    pub evicted: usize,
}

/// Probe every live session and evict the ones that missed the last probe
/// or could not be probed on two sweeps in a row
pub fn sweep(room: &RoomHandle) -> SweepStats {
    let mut stats = SweepStats::default();

    for session in room.sessions() {
        if session.is_evicted() {
            continue;
        }

        let responded = session.begin_probe();
        if responded && session.send_ping() {
            stats.probed += 1;
        } else if responded && session.defer_probe() {
            // Behind but not yet proven dead; retry next sweep
            debug!(room = %room.name(), session_id = session.id(), "Ping not queued, probe deferred");
            session.mark_alive();
            stats.deferred += 1;
        } else {
            info!(
                room = %room.name(),
                session_id = session.id(),
                conn_id = %session.conn_id(),
                "Evicting unresponsive connection"
            );
            session.evict();
            stats.evicted += 1;
        }
    }

    stats
}

/// Sweep on a fixed period until shutdown; the first sweep runs one period after start
pub async fn run(room: Arc<RoomHandle>, mut shutdown: watch::Receiver<bool>) {
    let period = room.settings().heartbeat_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !room.is_running() {
                    break;
                }
                let stats = sweep(&room);
                debug!(room = %room.name(), probed = stats.probed, evicted = stats.evicted, "Liveness sweep");
            }
            _ = shutdown.changed() => break,
        }
    }
}
