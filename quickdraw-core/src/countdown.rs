use async_trait::async_trait;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Identifies one run of a countdown. Every `start` issues a new one, so a
/// tick carrying an older generation is stale and must be ignored.
pub type Generation = u64;

/// Receives ticks from a running [`Countdown`].
#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    /// Returns false once the countdown should stop ticking.
    async fn on_tick(&self, generation: Generation) -> bool;
}

/// Cancellable repeating tick. At most one run is active at a time.
#[derive(Debug)]
pub struct Countdown {
    generation: Generation,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            generation: 0,
            period,
            handle: None,
        }
    }

    /// Cancel any previous run and start ticking. The task only holds a weak
    /// reference, so it stops on its own once the handler is dropped.
    pub fn start<H: TickHandler>(&mut self, handler: Weak<H>) -> Generation {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        debug!("Starting countdown generation {}", generation);

        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;

                let Some(handler) = handler.upgrade() else {
                    break;
                };
                if !handler.on_tick(generation).await {
                    break;
                }
            }
        }));

        generation
    }

    /// Stop the current run. Cancelling a stopped countdown does nothing.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Invalidate ticks that were already in flight
            self.generation += 1;
            debug!("Cancelled countdown, generation now {}", self.generation);
        }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
