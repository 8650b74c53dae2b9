use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long a project sits untouched before its preview is regenerated.
pub const PREVIEW_DELAY: Duration = Duration::from_secs(30);

/// Debounces preview regeneration per project. Every history append re-arms
/// the project's deadline; [`poll`](PreviewScheduler::poll) reports which
/// deadlines have elapsed. Poll-based rather than timer-thread based so the
/// frame loop stays in control and tests can drive time explicitly.
#[derive(Debug, Default)]
pub struct PreviewScheduler {
    deadlines: Mutex<HashMap<Uuid, Instant>>,
    suspended: Mutex<bool>,
}

impl PreviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arm the preview deadline for a project. While suspended (e.g. a
    /// bulk import is running) arming is ignored entirely.
    pub fn arm(&self, project: Uuid, now: Instant) {
        if *self.suspended.lock() {
            return;
        }
        self.deadlines.lock().insert(project, now + PREVIEW_DELAY);
    }

    /// Drop any pending deadline, e.g. when the project is deleted.
    pub fn cancel(&self, project: Uuid) {
        self.deadlines.lock().remove(&project);
    }

    /// Suspending clears all pending deadlines and ignores arming until
    /// resumed.
    pub fn set_suspended(&self, suspended: bool) {
        *self.suspended.lock() = suspended;
        if suspended {
            self.deadlines.lock().clear();
        }
    }

    pub fn is_suspended(&self) -> bool {
        *self.suspended.lock()
    }

    pub fn is_armed(&self, project: Uuid) -> bool {
        self.deadlines.lock().contains_key(&project)
    }

    /// Take every project whose deadline has elapsed. Returned projects are
    /// disarmed; the caller regenerates their previews.
    pub fn poll(&self, now: Instant) -> Vec<Uuid> {
        let mut deadlines = self.deadlines.lock();
        let due: Vec<Uuid> = deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            deadlines.remove(id);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_then_poll_after_delay() {
        let scheduler = PreviewScheduler::new();
        let id = Uuid::new_v4();
        let start = Instant::now();
        scheduler.arm(id, start);
        assert!(scheduler.poll(start).is_empty());
        let due = scheduler.poll(start + PREVIEW_DELAY);
        assert_eq!(due, vec![id]);
        // Disarmed after firing.
        assert!(scheduler.poll(start + PREVIEW_DELAY).is_empty());
    }

    #[test]
    fn rearming_pushes_the_deadline_back() {
        let scheduler = PreviewScheduler::new();
        let id = Uuid::new_v4();
        let start = Instant::now();
        scheduler.arm(id, start);
        scheduler.arm(id, start + Duration::from_secs(10));
        assert!(scheduler.poll(start + PREVIEW_DELAY).is_empty());
        assert_eq!(
            scheduler.poll(start + Duration::from_secs(10) + PREVIEW_DELAY),
            vec![id]
        );
    }

    #[test]
    fn suspension_clears_and_blocks() {
        let scheduler = PreviewScheduler::new();
        let id = Uuid::new_v4();
        let start = Instant::now();
        scheduler.arm(id, start);
        scheduler.set_suspended(true);
        assert!(!scheduler.is_armed(id));
        scheduler.arm(id, start);
        assert!(!scheduler.is_armed(id));
        scheduler.set_suspended(false);
        scheduler.arm(id, start);
        assert!(scheduler.is_armed(id));
    }
}
