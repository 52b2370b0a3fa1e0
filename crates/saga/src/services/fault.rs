use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use resilience::TransportError;

#[derive(Debug, Default)]
struct FaultState {
    fail_next: u32,
    unavailable: bool,
    latency: Duration,
    calls: u32,
}

/// Failure knobs shared by the in-memory service fakes.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    state: Arc<Mutex<FaultState>>,
}

impl FaultInjector {
    /// Makes the next `n` calls fail with a connection error.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    /// Makes every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Delays every call by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Number of calls that reached the service, failed ones included.
    pub fn calls(&self) -> u32 {
        self.lock().calls
    }

    /// Entered at the start of every fake call.
    pub(crate) async fn enter(&self, service: &str) -> Result<(), TransportError> {
        let (latency, fail) = {
            let mut state = self.lock();
            state.calls += 1;
            let fail = if state.unavailable {
                true
            } else if state.fail_next > 0 {
                state.fail_next -= 1;
                true
            } else {
                false
            };
            (state.latency, fail)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(TransportError::Connect(format!("{service} unreachable")));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_next_is_consumed() {
        let faults = FaultInjector::default();
        faults.fail_next(2);
        assert!(faults.enter("svc").await.is_err());
        assert!(faults.enter("svc").await.is_err());
        assert!(faults.enter("svc").await.is_ok());
        assert_eq!(faults.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let faults = FaultInjector::default();
        faults.set_latency(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        faults.enter("svc").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
