//! The editor session: one [`ViewController`] behind a tokio mutex, plus its timers.
//!
//! Every action goes through [`Session::lock`], so actions, countdown ticks and
//! timer callbacks are serialized. When the returned guard is dropped the timers
//! are brought in line with whatever the action changed.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::enhance::reveal::RevealPlan;
use crate::enhance::EnhancementOption;
use crate::errors::AppError;

pub mod controller;
pub mod timers;

use controller::{EnhanceRequest, EnhanceTarget, ViewController};
use timers::Timers;

pub struct Session {
    inner: Mutex<SessionInner>,
    clock: SessionClock,
}

struct SessionInner {
    controller: ViewController,
    timers: Timers,
}

/// Wall-clock time advanced by tokio's monotonic clock, so lockout expiry follows
/// the same time source as the timers.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl SessionClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_at + elapsed
    }
}

impl Session {
    pub fn new(controller: ViewController) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(SessionInner {
                controller,
                timers: Timers::default(),
            }),
            clock: SessionClock {
                started: Instant::now(),
                started_at: Utc::now(),
            },
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn lock(self: &Arc<Self>) -> SessionGuard<'_> {
        SessionGuard {
            session: self,
            inner: self.inner.lock().await,
        }
    }

    /// Rewrites a field through the enhancer and starts revealing the result.
    ///
    /// The session is not held while the provider works; edits made in the meantime
    /// win over the late result.
    pub async fn enhance(
        self: &Arc<Self>,
        target: EnhanceTarget,
        option: EnhancementOption,
    ) -> Result<(), AppError> {
        let (request, enhancer) = {
            let mut guard = self.lock().await;
            (guard.begin_enhancement(target, option)?, guard.enhancer())
        };

        let result = enhancer
            .enhance(&request.text, request.kind, request.option)
            .await;

        let mut guard = self.lock().await;
        if let Some(plan) = guard.complete_enhancement(&request, result)? {
            guard.start_reveal(&request, plan);
        }
        Ok(())
    }
}

/// Exclusive access to the controller. Timers are re-synced on drop.
pub struct SessionGuard<'a> {
    session: &'a Arc<Session>,
    inner: MutexGuard<'a, SessionInner>,
}

impl SessionGuard<'_> {
    /// Session time read under the lock, so a caller that waited for the lock is
    /// judged at the moment it actually runs.
    pub fn now(&self) -> DateTime<Utc> {
        self.session.now()
    }

    fn start_reveal(&mut self, request: &EnhanceRequest, plan: RevealPlan) {
        let weak = Arc::downgrade(self.session);
        self.inner.timers.start_reveal(weak, request, plan);
    }
}

impl Deref for SessionGuard<'_> {
    type Target = ViewController;

    fn deref(&self) -> &ViewController {
        &self.inner.controller
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut ViewController {
        &mut self.inner.controller
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let weak = Arc::downgrade(self.session);
        let SessionInner { controller, timers } = &mut *self.inner;
        timers.sync(controller, &weak);
    }
}
