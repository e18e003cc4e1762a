use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use models::KlineData;
use serde::Serialize;
use tracing::{error, info};

use crate::{backfill::BackfillService, error::Error};

pub const BATCH_SIZE: usize = 3;
pub const BATCH_PAUSE: Duration = Duration::from_millis(500);
pub const LOG_CAPACITY: usize = 20;

#[async_trait]
pub trait TradeBackfill: Send + Sync {
    async fn backfill_trade(&self, trade_id: &str, force: bool) -> Result<KlineData, Error>;
}

#[async_trait]
impl TradeBackfill for BackfillService {
    async fn backfill_trade(&self, trade_id: &str, force: bool) -> Result<KlineData, Error> {
        return self.klines(trade_id, force).await;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub trade_id: String,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: Vec<usize>,
    /// Most recent outcomes, oldest first.
    pub log: VecDeque<Outcome>,
}

impl BatchReport {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        if outcome.ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(outcome);
    }
}

/// Emitted after every trade.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillProgress {
    pub processed: usize,
    pub total: usize,
    pub failed: usize,
    pub last: Outcome,
}

pub struct BatchBackfill {
    backfill: Arc<dyn TradeBackfill>,
    batch_size: usize,
    pause: Duration,
    force: bool,
}

impl BatchBackfill {
    pub fn new(backfill: Arc<dyn TradeBackfill>) -> Self {
        return Self {
            backfill,
            batch_size: BATCH_SIZE,
            pause: BATCH_PAUSE,
            force: false,
        };
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        return self;
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        return self;
    }

    /// Attempts every id exactly once. Failures are recorded and never stop
    /// the run.
    pub async fn run<F>(&self, trade_ids: &[String], mut on_progress: F) -> BatchReport
    where
        F: FnMut(BackfillProgress) + Send,
    {
        let mut report = BatchReport {
            total: trade_ids.len(),
            ..Default::default()
        };
        let batch_count = trade_ids.len().div_ceil(self.batch_size);
        info!(
            "Backfilling {} trades in {batch_count} batches of {}",
            trade_ids.len(),
            self.batch_size
        );

        for (index, chunk) in trade_ids.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pause).await;
            }
            report.batches.push(chunk.len());

            let tasks = chunk
                .iter()
                .map(|trade_id| self.backfill.backfill_trade(trade_id, self.force));
            let results = futures::future::join_all(tasks).await;

            for (trade_id, result) in chunk.iter().zip(results) {
                let outcome = match result {
                    Ok(x) => Outcome {
                        trade_id: trade_id.clone(),
                        ok: true,
                        message: format!("{} candles at {}", x.candles().len(), x.interval()),
                    },
                    Err(err) => {
                        error!("Backfill failed for {trade_id}: {err:#}");
                        Outcome {
                            trade_id: trade_id.clone(),
                            ok: false,
                            message: format!("{err:#}"),
                        }
                    }
                };
                report.record(outcome.clone());
                on_progress(BackfillProgress {
                    processed: report.processed,
                    total: report.total,
                    failed: report.failed,
                    last: outcome,
                });
            }
        }

        info!(
            "Backfill done: {}/{} succeeded, {} failed",
            report.succeeded, report.total, report.failed
        );
        return report;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use models::KlineData;
    use types::Interval;

    use tokio::time::Instant;

    use super::{BatchBackfill, TradeBackfill, BATCH_PAUSE, LOG_CAPACITY};
    use crate::error::Error;

    /// Fails every id ending in an odd digit and tracks peak concurrency.
    #[derive(Default)]
    struct Recorder {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
        started: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl TradeBackfill for Recorder {
        async fn backfill_trade(&self, trade_id: &str, _force: bool) -> Result<KlineData, Error> {
            self.started.lock().unwrap().push(Instant::now());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(trade_id.to_owned());

            let odd = trade_id
                .chars()
                .last()
                .and_then(|x| x.to_digit(10))
                .is_some_and(|x| x % 2 == 1);
            if odd {
                return Err(Error::NotFound(trade_id.to_owned()));
            }
            return Ok(KlineData::new("ES=F", Interval::OneDay, vec![]));
        }
    }

    fn ids(count: usize) -> Vec<String> {
        return (0..count).map(|x| format!("t{x}")).collect();
    }

    #[tokio::test]
    async fn seven_ids_run_in_three_batches() {
        let recorder = Arc::new(Recorder::default());
        let driver = BatchBackfill::new(recorder.clone()).with_pause(Duration::from_millis(1));
        let mut events = Vec::new();

        let report = driver.run(&ids(7), |x| events.push(x)).await;

        assert_eq!(report.batches, vec![3, 3, 1]);
        assert_eq!(report.total, 7);
        assert_eq!(report.processed, 7);
        assert_eq!(report.failed, 3);
        assert_eq!(report.succeeded, 4);
        assert_eq!(events.len(), 7);
        assert_eq!(events.last().map(|x| x.processed), Some(7));

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, ids(7), "every id attempted exactly once");
        assert!(recorder.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_are_separated_by_the_pause() {
        let recorder = Arc::new(Recorder::default());
        let driver = BatchBackfill::new(recorder.clone());
        let start = Instant::now();

        let report = driver.run(&ids(7), |_| {}).await;

        assert_eq!(report.batches, vec![3, 3, 1]);
        assert!(Instant::now() - start >= 2 * BATCH_PAUSE);

        let started = recorder.started.lock().unwrap().clone();
        assert_eq!(started.len(), 7);
        assert!(
            started[..3].iter().all(|x| *x - start < BATCH_PAUSE),
            "first batch waits for nothing"
        );
        assert!(started[3] - started[0] >= BATCH_PAUSE);
        assert!(started[6] - started[3] >= BATCH_PAUSE);
    }

    #[tokio::test]
    async fn log_keeps_latest_outcomes() {
        let driver =
            BatchBackfill::new(Arc::new(Recorder::default())).with_pause(Duration::ZERO);
        let report = driver.run(&ids(25), |_| {}).await;

        assert_eq!(report.log.len(), LOG_CAPACITY);
        assert_eq!(report.log.front().map(|x| x.trade_id.as_str()), Some("t5"));
        assert_eq!(report.log.back().map(|x| x.trade_id.as_str()), Some("t24"));
    }

    #[tokio::test]
    async fn empty_input() {
        let driver = BatchBackfill::new(Arc::new(Recorder::default()));
        let report = driver.run(&[], |_| {}).await;
        assert_eq!(report.processed, 0);
        assert!(report.batches.is_empty());
    }
}
