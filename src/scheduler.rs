use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};

use crate::coordinator::Refresh;

/// Drives every coordinator on its own fixed-interval timer.
///
/// Each coordinator gets an independent task, so a slow tick on one device
/// never delays another. Missed ticks are skipped rather than bunched up.
pub struct PollScheduler {
    tasks: JoinSet<()>,
}

impl PollScheduler {
    /// Start polling. The first scheduled tick fires one `period` from now,
    /// since setup has already run the initial refresh.
    #[must_use]
    pub fn start(coordinators: impl IntoIterator<Item = Arc<dyn Refresh>>, period: Duration) -> Self {
        let mut tasks = JoinSet::new();
        for coord in coordinators {
            tasks.spawn(Self::run(coord, period));
        }
        log::info!("Polling {} coordinators every {period:?}", tasks.len());
        Self { tasks }
    }

    async fn run(coord: Arc<dyn Refresh>, period: Duration) {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            log::trace!("[{}] Scheduled refresh", coord.name());
            coord.request_refresh().await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn stop(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        log::debug!("Poll scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Duration;

    use crate::coordinator::{DeviceCoordinator, Refresh};
    use crate::mock::{MockApi, Op};
    use crate::scheduler::PollScheduler;

    fn coordinator(api: &Arc<MockApi>, id: &str) -> Arc<dyn Refresh> {
        api.add_device(id, &format!("SN-{id}"));
        Arc::new(DeviceCoordinator::new(api.clone(), id.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period() {
        let api = Arc::new(MockApi::new());
        let coords = vec![coordinator(&api, "dev1"), coordinator(&api, "dev2")];
        let sched = PollScheduler::start(coords, Duration::from_secs(60));
        assert_eq!(sched.len(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.count(Op::DeviceDetails), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(api.count(Op::DeviceDetails), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.count(Op::DeviceDetails), 4);

        sched.stop().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.count(Op::DeviceDetails), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_coordinator_keeps_polling() {
        let api = Arc::new(MockApi::new());
        let coords = vec![coordinator(&api, "dev1")];
        api.fail(Op::DeviceDetails);
        let sched = PollScheduler::start(coords, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(api.count(Op::DeviceDetails), 3);

        sched.stop().await;
    }
}
