//! Scheduled work for a session: lockout countdown, notice auto-dismiss, debounced
//! height measurement, the settle-then-print trigger and the typewriter reveal.
//!
//! Every timer is a [`ScheduledTask`] owned by [`Timers`]; dropping the handle aborts
//! the task. Tasks hold only a `Weak` reference to the session, so a dropped session
//! takes its timers with it. [`Timers::sync`] runs after every action and starts or
//! drops tasks to match the controller state.

use std::future::Future;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::controller::{EnhanceRequest, EnhanceTarget, Mode, ViewController};
use super::Session;
use crate::enhance::reveal::RevealPlan;
use crate::lockout::LockoutTick;

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const NOTICE_TTL: Duration = Duration::from_secs(3);
pub const MEASURE_SETTLE: Duration = Duration::from_millis(100);
pub const PRINT_SETTLE: Duration = Duration::from_millis(1500);

/// A spawned task that is aborted when the handle is dropped.
#[derive(Debug)]
pub struct ScheduledTask(JoinHandle<()>);

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }

    /// Runs `action` on the controller after `delay`, unless the session is gone.
    fn after<F>(delay: Duration, session: Weak<Session>, action: F) -> Self
    where
        F: FnOnce(&mut ViewController) + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = session.upgrade() {
                let mut guard = session.lock().await;
                action(&mut guard);
            }
        })
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Live timers of one session. Keys next to a task record what it was scheduled
/// for, so a change in the controller replaces it.
#[derive(Debug, Default)]
pub(super) struct Timers {
    countdown: Option<ScheduledTask>,
    notice: Option<(u64, ScheduledTask)>,
    measure: Option<(u64, ScheduledTask)>,
    print: Option<ScheduledTask>,
    reveal: Option<(u64, ScheduledTask)>,
}

impl Timers {
    pub(super) fn sync(&mut self, controller: &ViewController, session: &Weak<Session>) {
        if controller.lockout_running() {
            if self.countdown.as_ref().map_or(true, ScheduledTask::is_finished) {
                self.countdown = Some(ScheduledTask::spawn(run_countdown(session.clone())));
            }
        } else {
            self.countdown = None;
        }

        match controller.notice().map(|n| n.id) {
            Some(id) if self.notice.as_ref().map(|(k, _)| *k) != Some(id) => {
                let task = ScheduledTask::after(NOTICE_TTL, session.clone(), move |c| {
                    c.notice_due(id);
                });
                self.notice = Some((id, task));
            }
            Some(_) => {}
            None => self.notice = None,
        }

        // Restarting on every new report is the debounce: only the last one settles.
        match controller.pending_height_seq() {
            Some(seq) if self.measure.as_ref().map(|(k, _)| *k) != Some(seq) => {
                let task = ScheduledTask::after(MEASURE_SETTLE, session.clone(), |c| {
                    c.measurement_due();
                });
                self.measure = Some((seq, task));
            }
            Some(_) => {}
            None => self.measure = None,
        }

        if controller.print_pending() && controller.mode() == Mode::Previewing {
            if self.print.is_none() {
                self.print = Some(ScheduledTask::after(PRINT_SETTLE, session.clone(), |c| {
                    c.print_due();
                }));
            }
        } else {
            self.print = None;
        }

        if self.reveal.as_ref().map(|(k, _)| *k) != controller.reveal_in_progress() {
            self.reveal = None;
        }
    }

    pub(super) fn start_reveal(
        &mut self,
        session: Weak<Session>,
        request: &EnhanceRequest,
        plan: RevealPlan,
    ) {
        let task = ScheduledTask::spawn(run_reveal(
            session,
            request.target,
            request.generation,
            plan,
        ));
        self.reveal = Some((request.generation, task));
    }
}

async fn run_countdown(session: Weak<Session>) {
    let mut interval = tokio::time::interval(COUNTDOWN_TICK);
    interval.tick().await; // the first tick is immediate

    loop {
        interval.tick().await;
        let Some(session) = session.upgrade() else {
            return;
        };
        let mut guard = session.lock().await;
        let now = guard.now();
        match guard.tick_lockout(now) {
            LockoutTick::Counting(_) => {}
            LockoutTick::NotLocked | LockoutTick::Expired => return,
        }
    }
}

async fn run_reveal(session: Weak<Session>, target: EnhanceTarget, generation: u64, plan: RevealPlan) {
    let steps = plan.len().max(1);
    for step in 1..=steps {
        tokio::time::sleep(plan.step).await;
        let Some(session) = session.upgrade() else {
            return;
        };
        let mut guard = session.lock().await;
        if !guard.reveal_frame(target, generation, plan.frame(step), step == steps) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;
    use tokio::time::sleep;

    use super::*;
    use crate::enhance::EnhancementOption;
    use crate::lockout::{LockoutConfig, LockoutMachine, LockoutState, PinCode};
    use crate::models::document::Document;
    use crate::session::controller::tests::{controller_with, FakeEnhancer};
    use crate::session::controller::{AdminSettings, SessionEvent};
    use crate::store::MemoryResumeStore;

    fn session() -> Arc<Session> {
        Session::new(controller_with(Arc::new(MemoryResumeStore::new())))
    }

    fn sample_document() -> Document {
        let mut doc = Document::default();
        doc.personal_info.first_name = "Ada".to_string();
        doc.summary = "led teams".to_string();
        doc
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_auto_dismisses() {
        let session = session();
        assert!(session.lock().await.request_preview().is_err());

        sleep(Duration::from_millis(2900)).await;
        assert!(session.lock().await.notice().is_some());
        sleep(Duration::from_millis(200)).await;
        assert!(session.lock().await.notice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_fires_after_settle() {
        let session = session();
        let mut events = {
            let mut guard = session.lock().await;
            guard.replace_document(sample_document());
            let events = guard.subscribe();
            guard.finish_and_commit().await.unwrap();
            events
        };

        sleep(Duration::from_millis(1400)).await;
        assert_eq!(session.lock().await.print_requests(), 0);
        sleep(Duration::from_millis(200)).await;
        let guard = session.lock().await;
        assert_eq!(guard.print_requests(), 1);
        assert!(!guard.print_pending());
        assert!(drain(&mut events).contains(&SessionEvent::PrintRequested));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_preview_cancels_print() {
        let session = session();
        {
            let mut guard = session.lock().await;
            guard.replace_document(sample_document());
            guard.finish_and_commit().await.unwrap();
        }
        sleep(Duration::from_millis(1000)).await;
        session.lock().await.back_from_preview();

        sleep(Duration::from_secs(2)).await;
        let guard = session.lock().await;
        assert_eq!(guard.mode(), Mode::Editing);
        assert_eq!(guard.print_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_height_measurement_is_debounced() {
        let session = session();
        session.lock().await.report_height(5000.0);
        sleep(Duration::from_millis(50)).await;
        session.lock().await.report_height(2300.0);

        sleep(Duration::from_millis(70)).await;
        assert_eq!(session.lock().await.pagination().total_pages, 1);
        sleep(Duration::from_millis(80)).await;
        assert_eq!(session.lock().await.pagination().total_pages, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_unlocks_when_lockout_expires() {
        let session = session();
        let now = session.now();
        let mut events = {
            let mut guard = session.lock().await;
            let events = guard.subscribe();
            for _ in 0..3 {
                guard.submit_pin("0000", now).await.unwrap();
            }
            events
        };

        sleep(Duration::from_millis(59_500)).await;
        assert!(matches!(
            session.lock().await.lockout().state(),
            LockoutState::Locked { .. }
        ));

        sleep(Duration::from_secs(1)).await;
        assert!(matches!(
            session.lock().await.lockout().state(),
            LockoutState::Unlocked { .. }
        ));
        let events = drain(&mut events);
        assert!(events.contains(&SessionEvent::LockoutExpired));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::LockoutCountdown { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enhancement_is_revealed_gradually() {
        let session = session();
        session.lock().await.replace_document(sample_document());

        session
            .enhance(EnhanceTarget::Summary, EnhancementOption::Professional)
            .await
            .unwrap();
        assert_eq!(session.lock().await.document().summary, "");

        sleep(Duration::from_millis(300)).await;
        let partial = session.lock().await.document().summary.clone();
        assert!(!partial.is_empty() && partial.len() < "LED TEAMS".len());
        assert!("LED TEAMS".starts_with(&partial));

        sleep(Duration::from_secs(2)).await;
        let guard = session.lock().await;
        assert_eq!(guard.document().summary, "LED TEAMS");
        assert!(guard.reveal_in_progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_editing_during_reveal_stops_it() {
        let session = session();
        session.lock().await.replace_document(sample_document());
        session
            .enhance(EnhanceTarget::Summary, EnhancementOption::Concise)
            .await
            .unwrap();

        sleep(Duration::from_millis(300)).await;
        session.lock().await.set_summary("mine".to_string());
        sleep(Duration::from_secs(2)).await;
        assert_eq!(session.lock().await.document().summary, "mine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_enhancement_leaves_text() {
        let controller = ViewController::new(
            Arc::new(MemoryResumeStore::new()),
            Arc::new(FakeEnhancer { fail: true }),
            LockoutMachine::new(LockoutConfig::default(), PinCode::parse("1984").unwrap()),
            AdminSettings::default(),
        );
        let session = Session::new(controller);
        session.lock().await.replace_document(sample_document());

        assert!(session
            .enhance(EnhanceTarget::Summary, EnhancementOption::Grammar)
            .await
            .is_err());
        sleep(Duration::from_secs(2)).await;
        let guard = session.lock().await;
        assert_eq!(guard.document().summary, "led teams");
        assert!(guard.reveal_in_progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_session_stops_timers() {
        let session = session();
        assert!(session.lock().await.request_preview().is_err());
        let weak = Arc::downgrade(&session);
        drop(session);
        sleep(Duration::from_secs(5)).await;
        assert!(weak.upgrade().is_none());
    }
}
