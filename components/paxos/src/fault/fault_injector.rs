use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use slog::{info, o, Logger};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::conf::FaultConf;

/// FaultInjector decides whether an accept call on this node pretends the acceptor is down.
///
/// Failures come from two sources: an independent draw with the configured probability on
/// every call, and outage windows during which every call fails. Windows are opened either
/// explicitly with `force_outage` or by the background task started with `spawn_outages`.
pub struct FaultInjector {
    conf: FaultConf,
    outage_until: Mutex<Option<Instant>>,
    logger: Logger,
}

impl FaultInjector {
    pub fn new(conf: FaultConf, logger: Logger) -> FaultInjector {
        FaultInjector {
            conf,
            outage_until: Mutex::new(None),
            logger,
        }
    }

    /// disabled builds an injector that never fails.
    pub fn disabled() -> FaultInjector {
        FaultInjector::new(FaultConf::default(), Logger::root(slog::Discard, o!()))
    }

    pub fn conf(&self) -> &FaultConf {
        &self.conf
    }

    pub fn should_simulate_failure(&self) -> bool {
        if !self.conf.enabled {
            return false;
        }

        if self.in_outage() {
            return true;
        }

        rand::thread_rng().gen_bool(self.conf.probability)
    }

    pub fn in_outage(&self) -> bool {
        let until = self.outage_until.lock().unwrap_or_else(|e| e.into_inner());
        match *until {
            Some(t) => Instant::now() < t,
            None => false,
        }
    }

    /// force_outage makes every accept fail for `d`, if fault injection is enabled.
    pub fn force_outage(&self, d: Duration) {
        let mut until = self.outage_until.lock().unwrap_or_else(|e| e.into_inner());
        *until = Some(Instant::now() + d);
    }

    /// spawn_outages starts a task that periodically takes the acceptor offline for a while.
    /// It returns when `cancel` is cancelled.
    pub fn spawn_outages(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let pause = self.random_ms(0, self.conf.outage_interval_ms);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }

                let outage = self.random_ms(self.conf.outage_min_ms, self.conf.outage_max_ms);
                info!(self.logger, "acceptor offline"; "outage_ms" => outage.as_millis() as u64);
                self.force_outage(outage);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(outage) => {}
                }

                info!(self.logger, "acceptor back online");
            }

            info!(self.logger, "outage simulation stopped");
        })
    }

    fn random_ms(&self, low: u64, high: u64) -> Duration {
        let ms = if high > low {
            rand::thread_rng().gen_range(low..high)
        } else {
            low
        };
        Duration::from_millis(ms)
    }
}
