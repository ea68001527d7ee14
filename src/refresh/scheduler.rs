//! Refresh Scheduler
//!
//! Fires a "re-run the whole query cycle" signal on a fixed interval. The
//! timer task is owned by the scheduler: replacing the interval, calling
//! [`RefreshScheduler::stop`] or dropping the scheduler aborts it.

use crate::table::DataMask;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Auto-refresh period; disabled when absent, non-numeric or not positive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshInterval(Option<Duration>);

impl RefreshInterval {
    /// No periodic refresh
    pub fn disabled() -> Self {
        Self(None)
    }

    /// Interval in (possibly fractional) seconds
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self(None);
        }
        // sub-nanosecond values round down to a zero period
        Self(Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero()))
    }

    /// Interval from a configuration value: a number or a numeric string
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n.as_f64().map(Self::from_secs_f64).unwrap_or_default(),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Self::from_secs_f64)
                .unwrap_or_default(),
            _ => Self(None),
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        self.0
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }
}

/// Receives the data mask of every refresh tick
pub type RefreshCallback = Arc<dyn Fn(DataMask) + Send + Sync>;

/// Owns the periodic refresh task of one table view
pub struct RefreshScheduler {
    interval: RefreshInterval,
    page_size: usize,
    callback: Option<RefreshCallback>,
    task: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        Self {
            interval: RefreshInterval::disabled(),
            page_size: crate::form_data::DEFAULT_PAGE_LENGTH,
            callback: None,
            task: None,
        }
    }

    /// (Re)start the scheduler with a new callback.
    ///
    /// Any running task is cancelled first. Nothing is scheduled when the
    /// interval is disabled. Must be called from within a Tokio runtime.
    pub fn start<F>(&mut self, interval: RefreshInterval, page_size: usize, callback: F) -> bool
    where
        F: Fn(DataMask) + Send + Sync + 'static,
    {
        self.interval = interval;
        self.page_size = page_size;
        self.callback = Some(Arc::new(callback));
        self.respawn()
    }

    /// Change the interval, keeping the callback.
    ///
    /// An unchanged interval leaves the running task alone.
    pub fn set_interval(&mut self, interval: RefreshInterval) -> bool {
        if interval == self.interval {
            return self.is_running();
        }
        self.interval = interval;
        self.respawn()
    }

    /// Cancel the running task, if any
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Refresh scheduler stopped");
        }
    }

    /// Whether a periodic task is currently scheduled
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn interval(&self) -> RefreshInterval {
        self.interval
    }

    fn respawn(&mut self) -> bool {
        self.stop();

        let (Some(period), Some(callback)) = (self.interval.as_duration(), self.callback.clone())
        else {
            tracing::debug!("Refresh disabled");
            return false;
        };

        let page_size = self.page_size;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tracing::debug!("Refresh tick");
                callback(DataMask::refresh_tick(page_size));
            }
        }));

        tracing::info!(interval_ms = period.as_millis() as u64, "Refresh scheduler started");
        true
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting() -> (Arc<AtomicUsize>, impl Fn(DataMask) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_mask: DataMask| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!(
            RefreshInterval::from_value(Some(&json!(5))).as_duration(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            RefreshInterval::from_value(Some(&json!(" 10 "))).as_duration(),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            RefreshInterval::from_value(Some(&json!(0.5))).as_duration(),
            Some(Duration::from_millis(500))
        );

        for disabled in [json!(0), json!(-5), json!("abc"), json!(""), json!("0"), json!(null), json!(true), json!("inf"), json!("0.0000000001")] {
            assert!(
                !RefreshInterval::from_value(Some(&disabled)).is_enabled(),
                "{} should disable refresh",
                disabled
            );
        }
        assert!(!RefreshInterval::from_value(None).is_enabled());
        assert!(!RefreshInterval::from_secs_f64(f64::MAX).is_enabled());
        assert!(!RefreshInterval::from_secs_f64(1e-10).is_enabled());
        assert_eq!(
            RefreshInterval::from_secs_f64(1e-9).as_duration(),
            Some(Duration::from_nanos(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_interval_schedules_nothing() {
        for value in [json!(0), json!(-5), json!("abc")] {
            let (count, callback) = counting();
            let mut scheduler = RefreshScheduler::new();

            let started = scheduler.start(RefreshInterval::from_value(Some(&value)), 50, callback);
            assert!(!started);
            assert!(!scheduler.is_running());

            sleep_secs(600.0).await;
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_interval() {
        let (count, callback) = counting();
        let mut scheduler = RefreshScheduler::new();
        assert!(scheduler.start(RefreshInterval::from_secs_f64(10.0), 50, callback));

        sleep_secs(9.5).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep_secs(1.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep_secs(20.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_mask_resets_paging() {
        let masks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&masks);
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(RefreshInterval::from_secs_f64(1.0), 25, move |mask| {
            sink.lock().unwrap().push(mask);
        });

        sleep_secs(1.5).await;

        let masks = masks.lock().unwrap();
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].own_state.current_page, Some(0));
        assert_eq!(masks[0].own_state.page_size, Some(25));
        assert!(masks[0].is_refresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (count, callback) = counting();
        {
            let mut scheduler = RefreshScheduler::new();
            scheduler.start(RefreshInterval::from_secs_f64(1.0), 50, callback);
            sleep_secs(1.5).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep_secs(10.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_replaces_timer() {
        let (count, callback) = counting();
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(RefreshInterval::from_secs_f64(10.0), 50, callback);

        sleep_secs(5.0).await;

        // same interval: the running timer keeps its phase
        assert!(scheduler.set_interval(RefreshInterval::from_secs_f64(10.0)));
        sleep_secs(5.5).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // new interval: the old timer is gone, the new one starts from now
        assert!(scheduler.set_interval(RefreshInterval::from_secs_f64(2.0)));
        sleep_secs(4.5).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        // disabling stops it
        assert!(!scheduler.set_interval(RefreshInterval::disabled()));
        assert!(!scheduler.is_running());
        sleep_secs(60.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
