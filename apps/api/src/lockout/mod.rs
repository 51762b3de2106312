//! PIN login with progressive, cyclic lockout.
//!
//! # Stages
//! The configuration is an ordered table of stages, each allowing `max_attempts`
//! wrong codes before a lockout of `lockout_minutes`. Every lockout advances the
//! stage cursor; after the last stage it wraps back to the first. A correct code
//! resets both the failure counter and the stage cursor.
//!
//! # Layout
//! - [`transition`] is the pure `(state, now, outcome) -> (state, result)` core.
//! - [`LockoutMachine`] owns the stage table, the secret and the runtime state,
//!   and is the only place a submitted code is compared.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PIN_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockoutError {
    #[error("lockout configuration needs at least one stage")]
    EmptyConfig,

    #[error("stage {stage}: attempts and minutes must both be at least 1")]
    InvalidStage { stage: usize },

    #[error("stage {index} does not exist (configured stages: {len})")]
    StageOutOfRange { index: usize, len: usize },

    #[error("malformed stage list '{0}', expected e.g. 3:1,2:10,1:20")]
    MalformedStages(String),

    #[error("PIN must be exactly {PIN_LENGTH} digits")]
    MalformedPin,
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStage {
    pub max_attempts: u32,
    pub lockout_minutes: u32,
}

impl LockoutStage {
    pub const fn new(max_attempts: u32, lockout_minutes: u32) -> Self {
        Self {
            max_attempts,
            lockout_minutes,
        }
    }

    pub fn lockout_duration(self) -> Duration {
        Duration::minutes(i64::from(self.lockout_minutes))
    }
}

/// Non-empty stage table. Every stage has `max_attempts >= 1` and `lockout_minutes >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockoutConfig {
    stages: Vec<LockoutStage>,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                LockoutStage::new(3, 1),
                LockoutStage::new(2, 10),
                LockoutStage::new(1, 20),
            ],
        }
    }
}

impl LockoutConfig {
    pub fn new(stages: Vec<LockoutStage>) -> Result<Self, LockoutError> {
        if stages.is_empty() {
            return Err(LockoutError::EmptyConfig);
        }
        for (stage, s) in stages.iter().enumerate() {
            validate_stage(stage, *s)?;
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[LockoutStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Normalizes a cursor into the table; a cursor left over from a longer table wraps.
    pub fn normalize(&self, index: usize) -> usize {
        index % self.stages.len()
    }

    pub fn stage(&self, index: usize) -> LockoutStage {
        self.stages[self.normalize(index)]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (self.normalize(index) + 1) % self.stages.len()
    }

    /// Replaces one stage. Takes effect the next time that stage is evaluated; an
    /// already computed lockout expiry is not touched.
    pub fn update_stage(&mut self, index: usize, stage: LockoutStage) -> Result<(), LockoutError> {
        let len = self.stages.len();
        validate_stage(index, stage)?;
        let slot = self
            .stages
            .get_mut(index)
            .ok_or(LockoutError::StageOutOfRange { index, len })?;
        *slot = stage;
        Ok(())
    }
}

fn validate_stage(stage: usize, s: LockoutStage) -> Result<(), LockoutError> {
    if s.max_attempts == 0 || s.lockout_minutes == 0 {
        return Err(LockoutError::InvalidStage { stage });
    }
    Ok(())
}

/// Parses `attempts:minutes` pairs separated by commas, e.g. `3:1,2:10,1:20`.
impl FromStr for LockoutConfig {
    type Err = LockoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || LockoutError::MalformedStages(s.to_string());
        let stages = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (attempts, minutes) = part.split_once(':').ok_or_else(malformed)?;
                let attempts = attempts.trim().parse().map_err(|_| malformed())?;
                let minutes = minutes.trim().parse().map_err(|_| malformed())?;
                Ok(LockoutStage::new(attempts, minutes))
            })
            .collect::<Result<Vec<_>, LockoutError>>()?;
        LockoutConfig::new(stages)
    }
}

impl<'de> Deserialize<'de> for LockoutConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            stages: Vec<LockoutStage>,
        }
        let raw = Raw::deserialize(deserializer)?;
        LockoutConfig::new(raw.stages).map_err(serde::de::Error::custom)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PIN
// ────────────────────────────────────────────────────────────────────────────

/// A syntactically valid PIN: exactly [`PIN_LENGTH`] ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct PinCode([u8; PIN_LENGTH]);

impl PinCode {
    pub fn parse(raw: &str) -> Result<Self, LockoutError> {
        let bytes = raw.trim().as_bytes();
        if bytes.len() != PIN_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(LockoutError::MalformedPin);
        }
        let mut digits = [0u8; PIN_LENGTH];
        digits.copy_from_slice(bytes);
        Ok(PinCode(digits))
    }

    /// Compares every digit; the loop never exits early.
    fn matches(&self, other: &PinCode) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl FromStr for PinCode {
    type Err = LockoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PinCode::parse(s)
    }
}

impl fmt::Debug for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinCode(****)")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockoutState {
    Unlocked {
        failed_attempts: u32,
        stage_index: usize,
    },
    /// `stage_index` already points at the stage that applies after expiry.
    Locked {
        stage_index: usize,
        expires_at: DateTime<Utc>,
    },
}

impl Default for LockoutState {
    fn default() -> Self {
        LockoutState::Unlocked {
            failed_attempts: 0,
            stage_index: 0,
        }
    }
}

impl LockoutState {
    pub fn stage_index(&self) -> usize {
        match self {
            LockoutState::Unlocked { stage_index, .. } | LockoutState::Locked { stage_index, .. } => {
                *stage_index
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    Success,
    Failure { attempts_remaining: u32 },
    /// `stage_index` is the stage whose limit was hit.
    LockedOut { stage_index: usize, duration_minutes: u32 },
    /// Rejected without evaluating the code.
    StillLocked { seconds_remaining: i64 },
}

/// Whole seconds left until `expires_at`, rounded up; 0 once expired.
pub fn seconds_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 999) / 1000
    }
}

/// Applies natural expiry: a lock whose expiry has passed becomes `Unlocked(0, stage)`.
pub fn expire(state: LockoutState, now: DateTime<Utc>) -> LockoutState {
    match state {
        LockoutState::Locked {
            stage_index,
            expires_at,
        } if now >= expires_at => LockoutState::Unlocked {
            failed_attempts: 0,
            stage_index,
        },
        other => other,
    }
}

/// Evaluates one attempt.
///
/// The caller supplies the already computed outcome so this stays free of secrets.
/// The outcome is ignored while a lock is still active.
pub fn transition(
    state: LockoutState,
    config: &LockoutConfig,
    now: DateTime<Utc>,
    outcome: AttemptOutcome,
) -> (LockoutState, AttemptResult) {
    let (failed_attempts, stage_index) = match expire(state, now) {
        LockoutState::Locked {
            stage_index,
            expires_at,
        } => {
            let locked = LockoutState::Locked {
                stage_index,
                expires_at,
            };
            let result = AttemptResult::StillLocked {
                seconds_remaining: seconds_remaining(expires_at, now),
            };
            return (locked, result);
        }
        LockoutState::Unlocked {
            failed_attempts,
            stage_index,
        } => (failed_attempts, config.normalize(stage_index)),
    };

    if outcome == AttemptOutcome::Correct {
        return (LockoutState::default(), AttemptResult::Success);
    }

    let failed_attempts = failed_attempts.saturating_add(1);
    let stage = config.stage(stage_index);

    if failed_attempts < stage.max_attempts {
        let state = LockoutState::Unlocked {
            failed_attempts,
            stage_index,
        };
        let result = AttemptResult::Failure {
            attempts_remaining: stage.max_attempts - failed_attempts,
        };
        return (state, result);
    }

    let state = LockoutState::Locked {
        stage_index: config.next_index(stage_index),
        expires_at: now + stage.lockout_duration(),
    };
    let result = AttemptResult::LockedOut {
        stage_index,
        duration_minutes: stage.lockout_minutes,
    };
    (state, result)
}

// ────────────────────────────────────────────────────────────────────────────
// Stateful wrapper
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub seconds_remaining: i64,
    /// `m:ss`
    pub display: String,
}

impl Countdown {
    fn new(seconds_remaining: i64) -> Self {
        let secs = seconds_remaining.max(0);
        Self {
            seconds_remaining: secs,
            display: format!("{}:{:02}", secs / 60, secs % 60),
        }
    }
}

/// What a countdown tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockoutTick {
    NotLocked,
    Counting(Countdown),
    /// The lock ran out on this tick; dependents should clear any entered code.
    Expired,
}

#[derive(Debug, Clone)]
pub struct LockoutMachine {
    config: LockoutConfig,
    secret: PinCode,
    state: LockoutState,
}

impl LockoutMachine {
    pub fn new(config: LockoutConfig, secret: PinCode) -> Self {
        Self {
            config,
            secret,
            state: LockoutState::default(),
        }
    }

    pub fn state(&self) -> &LockoutState {
        &self.state
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn update_stage(&mut self, index: usize, stage: LockoutStage) -> Result<(), LockoutError> {
        self.config.update_stage(index, stage)
    }

    /// Submits a code. While locked the code is never compared.
    pub fn submit(&mut self, code: &PinCode, now: DateTime<Utc>) -> AttemptResult {
        let state = expire(self.state.clone(), now);
        let outcome = match state {
            LockoutState::Locked { .. } => AttemptOutcome::Incorrect,
            LockoutState::Unlocked { .. } if self.secret.matches(code) => AttemptOutcome::Correct,
            LockoutState::Unlocked { .. } => AttemptOutcome::Incorrect,
        };
        let (next, result) = transition(state, &self.config, now, outcome);
        self.state = next;
        result
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(expire(self.state.clone(), now), LockoutState::Locked { .. })
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Option<Countdown> {
        match &self.state {
            LockoutState::Locked { expires_at, .. } if now < *expires_at => {
                Some(Countdown::new(seconds_remaining(*expires_at, now)))
            }
            _ => None,
        }
    }

    /// Periodic observer step. Applies expiry when the lock has run out.
    pub fn tick(&mut self, now: DateTime<Utc>) -> LockoutTick {
        match &self.state {
            LockoutState::Unlocked { .. } => LockoutTick::NotLocked,
            LockoutState::Locked { expires_at, .. } => {
                if now < *expires_at {
                    LockoutTick::Counting(Countdown::new(seconds_remaining(*expires_at, now)))
                } else {
                    self.state = expire(self.state.clone(), now);
                    LockoutTick::Expired
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn machine() -> LockoutMachine {
        LockoutMachine::new(LockoutConfig::default(), PinCode::parse("1984").unwrap())
    }

    fn wrong() -> PinCode {
        PinCode::parse("0000").unwrap()
    }

    fn right() -> PinCode {
        PinCode::parse("1984").unwrap()
    }

    // ── configuration ───────────────────────────────────────────────────────

    #[test]
    fn test_config_rejects_empty_and_zero_stages() {
        assert_eq!(LockoutConfig::new(vec![]), Err(LockoutError::EmptyConfig));
        assert_eq!(
            LockoutConfig::new(vec![LockoutStage::new(3, 1), LockoutStage::new(0, 5)]),
            Err(LockoutError::InvalidStage { stage: 1 })
        );
        assert!(LockoutConfig::new(vec![LockoutStage::new(1, 0)]).is_err());
    }

    #[test]
    fn test_config_parse() {
        let config: LockoutConfig = "3:1, 2:10 ,1:20".parse().unwrap();
        assert_eq!(config, LockoutConfig::default());
        assert!("3-1".parse::<LockoutConfig>().is_err());
        assert!("".parse::<LockoutConfig>().is_err());
        assert!("3:x".parse::<LockoutConfig>().is_err());
    }

    #[test]
    fn test_config_deserialize_validates() {
        let ok: LockoutConfig =
            serde_json::from_str(r#"{"stages":[{"max_attempts":2,"lockout_minutes":5}]}"#)
                .unwrap();
        assert_eq!(ok.len(), 1);
        assert!(serde_json::from_str::<LockoutConfig>(r#"{"stages":[]}"#).is_err());
    }

    #[test]
    fn test_update_stage_bounds() {
        let mut config = LockoutConfig::default();
        assert_eq!(
            config.update_stage(3, LockoutStage::new(1, 1)),
            Err(LockoutError::StageOutOfRange { index: 3, len: 3 })
        );
        assert!(config.update_stage(0, LockoutStage::new(0, 1)).is_err());
        config.update_stage(0, LockoutStage::new(5, 2)).unwrap();
        assert_eq!(config.stage(0), LockoutStage::new(5, 2));
    }

    // ── PIN ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_pin_format() {
        assert!(PinCode::parse("1234").is_ok());
        assert!(PinCode::parse(" 1234 ").is_ok());
        assert_eq!(PinCode::parse("123"), Err(LockoutError::MalformedPin));
        assert!(PinCode::parse("12345").is_err());
        assert!(PinCode::parse("12a4").is_err());
        assert!(PinCode::parse("١٢٣٤").is_err());
        assert_eq!(format!("{:?}", right()), "PinCode(****)");
    }

    // ── pure transition ─────────────────────────────────────────────────────

    #[test]
    fn test_seconds_remaining_rounds_up() {
        let now = t0();
        assert_eq!(seconds_remaining(now + Duration::milliseconds(1), now), 1);
        assert_eq!(seconds_remaining(now + Duration::milliseconds(1000), now), 1);
        assert_eq!(seconds_remaining(now + Duration::milliseconds(1001), now), 2);
        assert_eq!(seconds_remaining(now, now), 0);
        assert_eq!(seconds_remaining(now - Duration::seconds(5), now), 0);
    }

    #[test]
    fn test_still_locked_ignores_outcome_and_keeps_state() {
        let config = LockoutConfig::default();
        let locked = LockoutState::Locked {
            stage_index: 1,
            expires_at: t0() + Duration::seconds(30),
        };
        let (state, result) = transition(locked.clone(), &config, t0(), AttemptOutcome::Correct);
        assert_eq!(state, locked);
        assert_eq!(result, AttemptResult::StillLocked { seconds_remaining: 30 });
    }

    #[test]
    fn test_expired_lock_evaluates_the_code() {
        let config = LockoutConfig::default();
        let locked = LockoutState::Locked {
            stage_index: 1,
            expires_at: t0(),
        };
        let (state, result) = transition(locked, &config, t0(), AttemptOutcome::Incorrect);
        assert_eq!(result, AttemptResult::Failure { attempts_remaining: 1 });
        assert_eq!(
            state,
            LockoutState::Unlocked {
                failed_attempts: 1,
                stage_index: 1
            }
        );
    }

    #[test]
    fn test_lockout_at_last_stage_wraps_to_zero() {
        let config = LockoutConfig::default();
        let state = LockoutState::Unlocked {
            failed_attempts: 0,
            stage_index: 2,
        };
        let (state, result) = transition(state, &config, t0(), AttemptOutcome::Incorrect);
        assert_eq!(
            result,
            AttemptResult::LockedOut {
                stage_index: 2,
                duration_minutes: 20
            }
        );
        assert_eq!(state.stage_index(), 0);
    }

    #[test]
    fn test_success_resets_from_any_stage() {
        let config = LockoutConfig::default();
        for stage_index in 0..3 {
            for failed_attempts in 0..2 {
                let state = LockoutState::Unlocked {
                    failed_attempts,
                    stage_index,
                };
                let (state, result) = transition(state, &config, t0(), AttemptOutcome::Correct);
                assert_eq!(result, AttemptResult::Success);
                assert_eq!(state, LockoutState::default());
            }
        }
    }

    #[test]
    fn test_stale_cursor_after_config_shrink_wraps() {
        let config = LockoutConfig::new(vec![LockoutStage::new(1, 1)]).unwrap();
        let state = LockoutState::Unlocked {
            failed_attempts: 0,
            stage_index: 2,
        };
        let (state, result) = transition(state, &config, t0(), AttemptOutcome::Incorrect);
        assert_eq!(
            result,
            AttemptResult::LockedOut {
                stage_index: 0,
                duration_minutes: 1
            }
        );
        assert_eq!(state.stage_index(), 0);
    }

    // ── machine scenarios ───────────────────────────────────────────────────

    #[test]
    fn test_escalation_scenario() {
        let mut m = machine();
        let now = t0();

        assert_eq!(
            m.submit(&wrong(), now),
            AttemptResult::Failure { attempts_remaining: 2 }
        );
        assert_eq!(
            m.submit(&wrong(), now),
            AttemptResult::Failure { attempts_remaining: 1 }
        );
        assert_eq!(
            m.submit(&wrong(), now),
            AttemptResult::LockedOut {
                stage_index: 0,
                duration_minutes: 1
            }
        );
        assert_eq!(m.state().stage_index(), 1);

        // Even the right code is refused during the lock.
        let mid = now + Duration::seconds(30);
        assert_eq!(
            m.submit(&right(), mid),
            AttemptResult::StillLocked { seconds_remaining: 30 }
        );
        assert!(m.is_locked(mid));

        let after = now + Duration::minutes(1);
        assert!(!m.is_locked(after));
        assert_eq!(
            m.submit(&wrong(), after),
            AttemptResult::Failure { attempts_remaining: 1 }
        );
        assert_eq!(
            m.submit(&wrong(), after),
            AttemptResult::LockedOut {
                stage_index: 1,
                duration_minutes: 10
            }
        );
        assert_eq!(m.state().stage_index(), 2);
        match m.state() {
            LockoutState::Locked { expires_at, .. } => {
                assert_eq!(*expires_at, after + Duration::minutes(10));
            }
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn test_success_after_escalation_resets_everything() {
        let mut m = machine();
        let mut now = t0();
        for _ in 0..3 {
            m.submit(&wrong(), now);
        }
        now += Duration::minutes(2);
        m.submit(&wrong(), now);
        assert_eq!(m.submit(&right(), now), AttemptResult::Success);
        assert_eq!(m.state(), &LockoutState::default());
    }

    #[test]
    fn test_stage_update_does_not_move_existing_expiry() {
        let mut m = machine();
        let now = t0();
        for _ in 0..3 {
            m.submit(&wrong(), now);
        }
        let before = m.state().clone();
        m.update_stage(0, LockoutStage::new(3, 60)).unwrap();
        m.update_stage(1, LockoutStage::new(4, 60)).unwrap();
        assert_eq!(m.state(), &before);

        // The new stage-1 limit applies after expiry.
        let after = now + Duration::minutes(1);
        assert_eq!(
            m.submit(&wrong(), after),
            AttemptResult::Failure { attempts_remaining: 3 }
        );
    }

    #[test]
    fn test_tick_counts_down_then_expires() {
        let mut m = machine();
        let now = t0();
        assert_eq!(m.tick(now), LockoutTick::NotLocked);
        for _ in 0..3 {
            m.submit(&wrong(), now);
        }
        match m.tick(now + Duration::milliseconds(500)) {
            LockoutTick::Counting(c) => {
                assert_eq!(c.seconds_remaining, 60);
                assert_eq!(c.display, "1:00");
            }
            other => panic!("expected Counting, got {other:?}"),
        }
        let c = m.countdown(now + Duration::seconds(51)).unwrap();
        assert_eq!(c.display, "0:09");

        assert_eq!(m.tick(now + Duration::seconds(60)), LockoutTick::Expired);
        assert_eq!(
            m.state(),
            &LockoutState::Unlocked {
                failed_attempts: 0,
                stage_index: 1
            }
        );
        assert_eq!(m.tick(now + Duration::seconds(61)), LockoutTick::NotLocked);
        assert!(m.countdown(now + Duration::seconds(61)).is_none());
    }
}
