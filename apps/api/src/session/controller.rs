//! ViewController — owns one editor session and routes every user action.
//!
//! The controller holds the mode (editing, previewing, administrating), the document
//! and template being edited, pagination, the PIN lockout machine and the admin
//! record cache. Methods are plain state transitions plus awaited calls into the
//! store; anything time-based is driven from `session::timers`, which only reads
//! the state exposed here and calls back into the `*_due` / `tick_*` entry points.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::enhance::reveal::RevealPlan;
use crate::enhance::{ContentKind, EnhancementError, EnhancementOption, TextEnhancer};
use crate::errors::AppError;
use crate::lockout::{
    AttemptResult, Countdown, LockoutMachine, LockoutStage, LockoutState, LockoutTick, PinCode,
};
use crate::models::document::{Document, EducationPatch, ExperiencePatch, TemplateKind};
use crate::models::record::{filter_records, record_stats, RecordFilter, RecordStats, RecordStatus, ResumeRecord};
use crate::pagination::PaginationState;
use crate::store::ResumeStore;
use crate::visibility::{Field, Section};

pub const MIN_RETENTION_LIMIT: usize = 2;
pub const DEFAULT_RETENTION_LIMIT: usize = 50;
const EVENT_CAPACITY: usize = 256;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Editing,
    Previewing,
    Administrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Error,
    Success,
    Info,
}

/// A transient message for the user. `id` lets a late auto-dismiss leave a newer
/// notice alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSettings {
    pub auto_cleanup_enabled: bool,
    /// Always at least [`MIN_RETENTION_LIMIT`].
    pub retention_limit: usize,
}

impl AdminSettings {
    pub fn new(auto_cleanup_enabled: bool, retention_limit: usize) -> Self {
        Self {
            auto_cleanup_enabled,
            retention_limit: retention_limit.max(MIN_RETENTION_LIMIT),
        }
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self::new(false, DEFAULT_RETENTION_LIMIT)
    }
}

/// Which free-text field an enhancement rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "field", content = "id", rename_all = "camelCase")]
pub enum EnhanceTarget {
    Summary,
    Experience(Uuid),
}

impl EnhanceTarget {
    fn content_kind(self) -> ContentKind {
        match self {
            EnhanceTarget::Summary => ContentKind::Summary,
            EnhanceTarget::Experience(_) => ContentKind::Experience,
        }
    }
}

/// Everything needed to run one enhancer call outside the session lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceRequest {
    pub target: EnhanceTarget,
    pub text: String,
    pub kind: ContentKind,
    pub option: EnhancementOption,
    /// Reveal generation at the time of the request; stale once it moves on.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    ModeChanged { mode: Mode },
    NoticeRaised { notice: Notice },
    NoticeDismissed { id: u64 },
    PaginationChanged { pagination: PaginationState },
    /// Layout has settled in preview; the render surface should print now.
    PrintRequested,
    LockoutCountdown { countdown: Countdown },
    LockoutExpired,
    FieldRevealed { target: EnhanceTarget, text: String, done: bool },
    RecordsChanged { total: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockoutStatus {
    pub state: LockoutState,
    pub countdown: Option<Countdown>,
    pub stages: Vec<LockoutStage>,
}

/// Point-in-time copy of the session for the render surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub document: Document,
    pub template: TemplateKind,
    pub pagination: PaginationState,
    pub is_admin: bool,
    pub editing_record_id: Option<Uuid>,
    pub notice: Option<Notice>,
    pub print_pending: bool,
    pub print_requests: u64,
    pub revealing: Option<EnhanceTarget>,
    pub undoable: Vec<EnhanceTarget>,
    pub lockout: LockoutStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct ViewController {
    mode: Mode,
    document: Document,
    template: TemplateKind,
    pagination: PaginationState,
    /// Latest unapplied height report and its sequence number.
    pending_height: Option<(u64, f64)>,
    height_reports: u64,
    lockout: LockoutMachine,
    is_admin: bool,
    editing_record_id: Option<Uuid>,
    records: Vec<ResumeRecord>,
    settings: AdminSettings,
    notice: Option<Notice>,
    next_notice_id: u64,
    print_pending: bool,
    print_requests: u64,
    /// Pre-enhancement values, restored by `undo_enhancement`.
    snapshots: HashMap<EnhanceTarget, String>,
    /// Target of the enhancement currently in flight or being revealed.
    active_enhancement: Option<EnhanceTarget>,
    /// Full enhanced text while it is being revealed.
    reveal_text: Option<String>,
    reveal_generation: u64,
    store: Arc<dyn ResumeStore>,
    enhancer: Arc<dyn TextEnhancer>,
    events: broadcast::Sender<SessionEvent>,
}

impl ViewController {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        enhancer: Arc<dyn TextEnhancer>,
        lockout: LockoutMachine,
        settings: AdminSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            mode: Mode::Editing,
            document: Document::default(),
            template: TemplateKind::default(),
            pagination: PaginationState::default(),
            pending_height: None,
            height_reports: 0,
            lockout,
            is_admin: false,
            editing_record_id: None,
            records: Vec::new(),
            settings,
            notice: None,
            next_notice_id: 1,
            print_pending: false,
            print_requests: 0,
            snapshots: HashMap::new(),
            active_enhancement: None,
            reveal_text: None,
            reveal_generation: 0,
            store,
            enhancer,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let mut undoable: Vec<EnhanceTarget> = self.snapshots.keys().copied().collect();
        undoable.sort_by_key(|t| match t {
            EnhanceTarget::Summary => (0, Uuid::nil()),
            EnhanceTarget::Experience(id) => (1, *id),
        });
        SessionSnapshot {
            mode: self.mode,
            document: self.document.clone(),
            template: self.template,
            pagination: self.pagination.clone(),
            is_admin: self.is_admin,
            editing_record_id: self.editing_record_id,
            notice: self.notice.clone(),
            print_pending: self.print_pending,
            print_requests: self.print_requests,
            revealing: self.active_enhancement,
            undoable,
            lockout: self.lockout_status(now),
        }
    }

    pub fn lockout_status(&self, now: DateTime<Utc>) -> LockoutStatus {
        LockoutStatus {
            state: self.lockout.state().clone(),
            countdown: self.lockout.countdown(now),
            stages: self.lockout.config().stages().to_vec(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn template(&self) -> TemplateKind {
        self.template
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn editing_record_id(&self) -> Option<Uuid> {
        self.editing_record_id
    }

    pub fn settings(&self) -> AdminSettings {
        self.settings
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn print_pending(&self) -> bool {
        self.print_pending
    }

    pub fn print_requests(&self) -> u64 {
        self.print_requests
    }

    pub fn lockout(&self) -> &LockoutMachine {
        &self.lockout
    }

    pub fn enhancer(&self) -> Arc<dyn TextEnhancer> {
        Arc::clone(&self.enhancer)
    }

    pub(crate) fn pending_height_seq(&self) -> Option<u64> {
        self.pending_height.map(|(seq, _)| seq)
    }

    /// Generation of the reveal that may currently write, if any.
    pub(crate) fn reveal_in_progress(&self) -> Option<u64> {
        self.active_enhancement.map(|_| self.reveal_generation)
    }

    // ── Mode ─────────────────────────────────────────────────────────────────

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        if self.mode == Mode::Previewing {
            self.print_pending = false;
            self.pending_height = None;
        }
        self.flush_reveal();
        debug!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.emit(SessionEvent::ModeChanged { mode });
    }

    fn enter_preview(&mut self, print: bool) {
        self.pagination.reset();
        self.pending_height = None;
        self.set_mode(Mode::Previewing);
        self.print_pending = print;
        self.emit(SessionEvent::PaginationChanged {
            pagination: self.pagination.clone(),
        });
    }

    fn ensure_content(&mut self, message: &str) -> Result<(), AppError> {
        if self.document.has_entered_data() {
            return Ok(());
        }
        self.raise_notice(NoticeKind::Error, message);
        Err(AppError::Validation(message.to_string()))
    }

    /// Switches to the preview without printing.
    pub fn request_preview(&mut self) -> Result<(), AppError> {
        self.ensure_content("Please enter some information to generate a preview.")?;
        self.enter_preview(false);
        Ok(())
    }

    /// Saves the document and moves on.
    ///
    /// An admin editing a stored record updates it and returns to the dashboard; a
    /// failed update stays put. Everyone else gets a new record followed by the print
    /// preview, whether or not the save worked.
    pub async fn finish_and_commit(&mut self) -> Result<(), AppError> {
        self.ensure_content("Please fill in some information to generate your resume.")?;

        if let (true, Some(id)) = (self.is_admin, self.editing_record_id) {
            if let Err(e) = self
                .store
                .update(id, &self.document, self.template, RecordStatus::Completed)
                .await
            {
                warn!("Updating resume {id} failed: {e}");
                self.raise_notice(NoticeKind::Error, "Failed to update resume.");
                return Err(e.into());
            }
            info!("Resume {id} updated");
            self.raise_notice(NoticeKind::Success, "Resume updated successfully!");
            self.editing_record_id = None;
            self.document = Document::default();
            self.set_mode(Mode::Administrating);
            self.refresh_records().await;
            return Ok(());
        }

        match self
            .store
            .create(&self.document, self.template, RecordStatus::Completed)
            .await
        {
            Ok(record) => info!("Resume {} saved", record.id),
            Err(e) => {
                warn!("Saving resume failed, continuing to print: {e}");
                self.raise_notice(
                    NoticeKind::Info,
                    "Could not save to database, but proceeding to print.",
                );
            }
        }
        self.enter_preview(true);
        Ok(())
    }

    pub fn back_from_preview(&mut self) {
        if self.is_admin {
            self.editing_record_id = None;
            self.set_mode(Mode::Administrating);
        } else {
            self.set_mode(Mode::Editing);
        }
    }

    // ── Notices ──────────────────────────────────────────────────────────────

    pub fn raise_notice(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let notice = Notice {
            id: self.next_notice_id,
            kind,
            message: message.into(),
        };
        self.next_notice_id += 1;
        let id = notice.id;
        self.notice = Some(notice.clone());
        self.emit(SessionEvent::NoticeRaised { notice });
        id
    }

    pub fn dismiss_notice(&mut self) -> bool {
        match self.notice.take() {
            Some(notice) => {
                self.emit(SessionEvent::NoticeDismissed { id: notice.id });
                true
            }
            None => false,
        }
    }

    /// Auto-dismiss entry point. Only removes the notice it was scheduled for.
    pub fn notice_due(&mut self, id: u64) -> bool {
        if self.notice.as_ref().map(|n| n.id) == Some(id) {
            self.dismiss_notice()
        } else {
            false
        }
    }

    // ── Lockout and admin ────────────────────────────────────────────────────

    /// Submits a PIN. A malformed code is rejected before the lockout sees it.
    pub async fn submit_pin(
        &mut self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptResult, AppError> {
        let code = PinCode::parse(raw)?;
        let result = self.lockout.submit(&code, now);
        match &result {
            AttemptResult::Success => {
                info!("Admin login succeeded");
                self.enter_admin_mode().await;
            }
            AttemptResult::Failure { attempts_remaining } => {
                debug!("Wrong PIN, {attempts_remaining} attempts left in this stage");
                self.raise_notice(
                    NoticeKind::Error,
                    format!("Incorrect PIN. {attempts_remaining} attempts remaining."),
                );
            }
            AttemptResult::LockedOut {
                stage_index,
                duration_minutes,
            } => {
                warn!("Admin login locked for {duration_minutes} min after stage {stage_index}");
                self.raise_notice(
                    NoticeKind::Error,
                    format!("Too many failed attempts. Locked for {duration_minutes} minutes."),
                );
            }
            AttemptResult::StillLocked { seconds_remaining } => {
                return Err(AppError::StillLocked {
                    seconds_remaining: *seconds_remaining,
                });
            }
        }
        Ok(result)
    }

    /// Countdown entry point, called once per second while locked.
    pub fn tick_lockout(&mut self, now: DateTime<Utc>) -> LockoutTick {
        let tick = self.lockout.tick(now);
        match &tick {
            LockoutTick::Counting(countdown) => self.emit(SessionEvent::LockoutCountdown {
                countdown: countdown.clone(),
            }),
            LockoutTick::Expired => {
                info!("Admin login lockout expired");
                self.emit(SessionEvent::LockoutExpired);
            }
            LockoutTick::NotLocked => {}
        }
        tick
    }

    pub(crate) fn lockout_running(&self) -> bool {
        matches!(self.lockout.state(), LockoutState::Locked { .. })
    }

    /// Auto-cleanup (when enabled) completes before the record list is fetched.
    async fn enter_admin_mode(&mut self) {
        self.is_admin = true;
        self.set_mode(Mode::Administrating);

        if self.settings.auto_cleanup_enabled {
            match self.store.auto_cleanup(self.settings.retention_limit).await {
                Ok(0) => {}
                Ok(deleted) => {
                    info!("Auto-cleanup removed {deleted} records");
                    self.raise_notice(
                        NoticeKind::Info,
                        format!("Auto-cleanup removed {deleted} old records."),
                    );
                }
                Err(e) => warn!("Auto-cleanup failed: {e}"),
            }
        }
        self.refresh_records().await;
    }

    async fn refresh_records(&mut self) {
        self.records = self.store.list_all().await;
        self.emit(SessionEvent::RecordsChanged {
            total: self.records.len(),
        });
    }

    pub fn logout(&mut self) {
        if self.is_admin {
            info!("Admin logged out");
        }
        self.is_admin = false;
        self.editing_record_id = None;
        self.document = Document::default();
        self.records.clear();
        self.snapshots.clear();
        self.set_mode(Mode::Editing);
    }

    fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    fn cached_record(&self, id: Uuid) -> Result<&ResumeRecord, AppError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
    }

    pub fn edit_record(&mut self, id: Uuid) -> Result<(), AppError> {
        self.require_admin()?;
        let record = self.cached_record(id)?.clone();
        self.document = record.data;
        self.template = record.template;
        self.snapshots.clear();
        self.editing_record_id = Some(id);
        self.set_mode(Mode::Editing);
        Ok(())
    }

    pub fn download_record(&mut self, id: Uuid) -> Result<(), AppError> {
        self.require_admin()?;
        let record = self.cached_record(id)?.clone();
        self.document = record.data;
        self.template = record.template;
        self.snapshots.clear();
        self.enter_preview(true);
        Ok(())
    }

    /// Deletes one record and drops it from the cache without a refetch.
    pub async fn delete_record(&mut self, id: Uuid) -> Result<(), AppError> {
        self.require_admin()?;
        if let Err(e) = self.store.delete_one(id).await {
            warn!("Deleting resume {id} failed: {e}");
            self.raise_notice(NoticeKind::Error, "Error deleting record.");
            return Err(e.into());
        }
        self.records.retain(|r| r.id != id);
        self.emit(SessionEvent::RecordsChanged {
            total: self.records.len(),
        });
        Ok(())
    }

    pub async fn clear_all_records(&mut self) -> Result<(), AppError> {
        self.require_admin()?;
        if let Err(e) = self.store.delete_all().await {
            warn!("Deleting all resumes failed: {e}");
            self.raise_notice(NoticeKind::Error, "Failed to delete records.");
            return Err(e.into());
        }
        info!("All resumes deleted");
        self.refresh_records().await;
        Ok(())
    }

    pub async fn reload_records(&mut self) -> Result<(), AppError> {
        self.require_admin()?;
        self.refresh_records().await;
        Ok(())
    }

    pub fn filtered_records(
        &self,
        query: &str,
        filter: RecordFilter,
    ) -> Result<Vec<&ResumeRecord>, AppError> {
        self.require_admin()?;
        Ok(filter_records(&self.records, query, filter))
    }

    pub fn record_stats(&self) -> Result<RecordStats, AppError> {
        self.require_admin()?;
        Ok(record_stats(&self.records))
    }

    pub fn set_auto_cleanup(
        &mut self,
        enabled: bool,
        retention_limit: usize,
    ) -> Result<AdminSettings, AppError> {
        self.require_admin()?;
        self.settings = AdminSettings::new(enabled, retention_limit);
        Ok(self.settings)
    }

    /// Takes effect on the next evaluation; a running lockout keeps its expiry.
    pub fn update_lockout_stage(
        &mut self,
        index: usize,
        max_attempts: u32,
        lockout_minutes: u32,
    ) -> Result<(), AppError> {
        self.require_admin()?;
        self.lockout
            .update_stage(index, LockoutStage::new(max_attempts, lockout_minutes))?;
        Ok(())
    }

    // ── Document editing ─────────────────────────────────────────────────────

    pub fn replace_document(&mut self, document: Document) {
        self.cancel_reveal();
        self.snapshots.clear();
        self.document = document;
    }

    pub fn set_template(&mut self, template: TemplateKind) {
        self.template = template;
    }

    pub fn set_summary(&mut self, summary: String) {
        self.supersede_enhancement_of(EnhanceTarget::Summary);
        self.document.summary = summary;
    }

    pub fn add_experience(&mut self) -> Uuid {
        self.document.add_experience()
    }

    pub fn update_experience(&mut self, id: Uuid, patch: ExperiencePatch) -> Result<(), AppError> {
        if patch.description.is_some() {
            self.supersede_enhancement_of(EnhanceTarget::Experience(id));
        }
        if !self.document.update_experience(id, patch) {
            return Err(AppError::NotFound(format!("Experience {id} not found")));
        }
        Ok(())
    }

    pub fn remove_experience(&mut self, id: Uuid) -> Result<(), AppError> {
        self.cancel_reveal_of(EnhanceTarget::Experience(id));
        self.snapshots.remove(&EnhanceTarget::Experience(id));
        if !self.document.remove_experience(id) {
            return Err(AppError::NotFound(format!("Experience {id} not found")));
        }
        Ok(())
    }

    pub fn add_education(&mut self) -> Uuid {
        self.document.add_education()
    }

    pub fn update_education(&mut self, id: Uuid, patch: EducationPatch) -> Result<(), AppError> {
        if !self.document.update_education(id, patch) {
            return Err(AppError::NotFound(format!("Education {id} not found")));
        }
        Ok(())
    }

    pub fn remove_education(&mut self, id: Uuid) -> Result<(), AppError> {
        if !self.document.remove_education(id) {
            return Err(AppError::NotFound(format!("Education {id} not found")));
        }
        Ok(())
    }

    pub fn set_skills_text(&mut self, text: &str) {
        self.document.set_skills_from_text(text);
    }

    pub fn set_photo(&mut self, photo: Option<String>) {
        self.document.theme_config.photo = photo.filter(|p| !p.trim().is_empty());
    }

    pub fn set_section_visibility(&mut self, section: Section, visible: bool) {
        self.document
            .theme_config
            .visibility
            .section_visibility
            .set(section, visible);
    }

    pub fn set_field_visibility(&mut self, field: Field, visible: bool) {
        self.document
            .theme_config
            .visibility
            .field_visibility
            .set(field, visible);
    }

    // ── Pagination ───────────────────────────────────────────────────────────

    fn pagination_changed(&self) {
        self.emit(SessionEvent::PaginationChanged {
            pagination: self.pagination.clone(),
        });
    }

    pub fn zoom_in(&mut self) {
        self.pagination.zoom_in();
        self.pagination_changed();
    }

    pub fn zoom_out(&mut self) {
        self.pagination.zoom_out();
        self.pagination_changed();
    }

    pub fn reset_zoom(&mut self) {
        self.pagination.reset_zoom();
        self.pagination_changed();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.pagination.set_zoom(zoom);
        self.pagination_changed();
    }

    /// Scroll is applied immediately.
    pub fn on_scroll(&mut self, scroll_offset_px: f64) {
        self.pagination.on_scroll(scroll_offset_px);
        self.pagination_changed();
    }

    /// Records a height report. It is applied by [`Self::measurement_due`] once the
    /// layout has settled; a newer report replaces an unapplied one.
    pub fn report_height(&mut self, height_px: f64) -> u64 {
        self.height_reports += 1;
        self.pending_height = Some((self.height_reports, height_px));
        self.height_reports
    }

    pub fn measurement_due(&mut self) -> bool {
        match self.pending_height.take() {
            Some((_, height_px)) => {
                self.pagination.on_height_measured(height_px);
                debug!(
                    "Measured {height_px}px, {} pages",
                    self.pagination.total_pages
                );
                self.pagination_changed();
                true
            }
            None => false,
        }
    }

    // ── Print ────────────────────────────────────────────────────────────────

    /// Settle-delay entry point. Fires only if the preview is still showing.
    pub fn print_due(&mut self) -> bool {
        if self.mode != Mode::Previewing || !self.print_pending {
            return false;
        }
        self.print_pending = false;
        self.print_requests += 1;
        info!("Print requested");
        self.emit(SessionEvent::PrintRequested);
        true
    }

    // ── Enhancement ──────────────────────────────────────────────────────────

    fn target_text(&self, target: EnhanceTarget) -> Option<&str> {
        match target {
            EnhanceTarget::Summary => Some(&self.document.summary),
            EnhanceTarget::Experience(id) => self
                .document
                .experience
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.description.as_str()),
        }
    }

    fn set_target_text(&mut self, target: EnhanceTarget, text: &str) -> bool {
        match target {
            EnhanceTarget::Summary => {
                self.document.summary = text.to_string();
                true
            }
            EnhanceTarget::Experience(id) => match self.document.experience_mut(id) {
                Some(entry) => {
                    entry.description = text.to_string();
                    true
                }
                None => false,
            },
        }
    }

    fn cancel_reveal(&mut self) {
        self.reveal_text = None;
        if self.active_enhancement.take().is_some() {
            self.reveal_generation += 1;
        }
    }

    /// Writes the rest of a running reveal at once, then stops it.
    fn flush_reveal(&mut self) {
        if let (Some(target), Some(text)) = (self.active_enhancement, self.reveal_text.take()) {
            if self.set_target_text(target, &text) {
                self.emit(SessionEvent::FieldRevealed {
                    target,
                    text,
                    done: true,
                });
            }
        }
        self.cancel_reveal();
    }

    /// A hand edit of a field that is still being enhanced wins: the enhancement
    /// stops and there is nothing left to undo.
    fn supersede_enhancement_of(&mut self, target: EnhanceTarget) {
        if self.active_enhancement == Some(target) {
            self.cancel_reveal();
            self.snapshots.remove(&target);
        }
    }

    fn cancel_reveal_of(&mut self, target: EnhanceTarget) {
        if self.active_enhancement == Some(target) {
            self.cancel_reveal();
        }
    }

    /// Snapshots the target and hands back what the enhancer needs. Any earlier
    /// enhancement still in flight or revealing is superseded.
    pub fn begin_enhancement(
        &mut self,
        target: EnhanceTarget,
        option: EnhancementOption,
    ) -> Result<EnhanceRequest, AppError> {
        let text = self
            .target_text(target)
            .ok_or_else(|| AppError::NotFound(format!("{target:?} not found")))?
            .to_string();
        if text.trim().is_empty() {
            return Err(AppError::Validation("Nothing to enhance".to_string()));
        }

        self.cancel_reveal();
        self.snapshots.insert(target, text.clone());
        self.active_enhancement = Some(target);
        Ok(EnhanceRequest {
            target,
            text,
            kind: target.content_kind(),
            option,
            generation: self.reveal_generation,
        })
    }

    /// Applies the enhancer's answer. On success the field is cleared and a reveal
    /// plan returned; on failure the field is restored and a notice raised. A
    /// superseded request changes nothing.
    pub fn complete_enhancement(
        &mut self,
        request: &EnhanceRequest,
        result: Result<String, EnhancementError>,
    ) -> Result<Option<RevealPlan>, AppError> {
        if request.generation != self.reveal_generation
            || self.active_enhancement != Some(request.target)
        {
            debug!("Dropping stale enhancement result for {:?}", request.target);
            return Ok(None);
        }

        match result {
            Ok(text) => {
                self.set_target_text(request.target, "");
                let plan = RevealPlan::new(&text);
                self.reveal_text = Some(text);
                Ok(Some(plan))
            }
            Err(e) => {
                warn!("Enhancing {:?} failed: {e}", request.target);
                self.active_enhancement = None;
                if let Some(previous) = self.snapshots.remove(&request.target) {
                    self.set_target_text(request.target, &previous);
                }
                self.raise_notice(NoticeKind::Error, "Enhancement failed. Please try again.");
                Err(e.into())
            }
        }
    }

    /// Writes one typewriter frame. Returns false once the reveal is no longer
    /// current, which tells the caller to stop.
    pub fn reveal_frame(
        &mut self,
        target: EnhanceTarget,
        generation: u64,
        text: &str,
        done: bool,
    ) -> bool {
        if generation != self.reveal_generation || self.active_enhancement != Some(target) {
            return false;
        }
        if !self.set_target_text(target, text) {
            self.active_enhancement = None;
            self.reveal_text = None;
            return false;
        }
        if done {
            self.active_enhancement = None;
            self.reveal_text = None;
        }
        self.emit(SessionEvent::FieldRevealed {
            target,
            text: text.to_string(),
            done,
        });
        true
    }

    /// Restores the value the target had before its last enhancement.
    pub fn undo_enhancement(&mut self, target: EnhanceTarget) -> Result<(), AppError> {
        let previous = self
            .snapshots
            .remove(&target)
            .ok_or_else(|| AppError::NotFound("No enhancement to undo".to_string()))?;
        self.cancel_reveal_of(target);
        if !self.set_target_text(target, &previous) {
            return Err(AppError::NotFound(format!("{target:?} not found")));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;

    use crate::lockout::LockoutConfig;
    use crate::store::MemoryResumeStore;

    /// Uppercases its input; fails when asked to.
    pub(crate) struct FakeEnhancer {
        pub fail: bool,
    }

    #[async_trait]
    impl TextEnhancer for FakeEnhancer {
        async fn enhance(
            &self,
            text: &str,
            _kind: ContentKind,
            _option: EnhancementOption,
        ) -> Result<String, EnhancementError> {
            if self.fail {
                return Err(EnhancementError::Api {
                    status: 400,
                    message: "bad request".to_string(),
                });
            }
            Ok(text.to_uppercase())
        }
    }

    pub(crate) fn controller_with(store: Arc<MemoryResumeStore>) -> ViewController {
        ViewController::new(
            store,
            Arc::new(FakeEnhancer { fail: false }),
            LockoutMachine::new(LockoutConfig::default(), PinCode::parse("1984").unwrap()),
            AdminSettings::default(),
        )
    }

    fn filled(ctrl: &mut ViewController) {
        let mut doc = Document::default();
        doc.personal_info.first_name = "Ada".to_string();
        doc.personal_info.email = "ada@example.com".to_string();
        doc.summary = "Wrote programs".to_string();
        ctrl.replace_document(doc);
    }

    async fn login(ctrl: &mut ViewController) {
        let result = ctrl.submit_pin("1984", Utc::now()).await.unwrap();
        assert_eq!(result, AttemptResult::Success);
    }

    #[test]
    fn test_preview_requires_content() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        let err = ctrl.request_preview().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(ctrl.mode(), Mode::Editing);
        assert_eq!(ctrl.notice().unwrap().kind, NoticeKind::Error);

        filled(&mut ctrl);
        ctrl.zoom_in();
        ctrl.request_preview().unwrap();
        assert_eq!(ctrl.mode(), Mode::Previewing);
        assert_eq!(ctrl.pagination().zoom.factor(), 1.0);
        assert!(!ctrl.print_pending());
    }

    #[test]
    fn test_photo_alone_counts_as_content() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        ctrl.set_photo(Some("data:image/png;base64,AAAA".to_string()));
        assert!(ctrl.request_preview().is_ok());
    }

    #[tokio::test]
    async fn test_finish_creates_record_and_queues_print() {
        let store = Arc::new(MemoryResumeStore::new());
        let mut ctrl = controller_with(store.clone());
        filled(&mut ctrl);

        ctrl.finish_and_commit().await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(ctrl.mode(), Mode::Previewing);
        assert!(ctrl.print_pending());
    }

    #[tokio::test]
    async fn test_finish_with_failing_store_still_prints() {
        let store = Arc::new(MemoryResumeStore::new());
        store.set_failing(true);
        let mut ctrl = controller_with(store.clone());
        filled(&mut ctrl);

        ctrl.finish_and_commit().await.unwrap();
        assert_eq!(ctrl.mode(), Mode::Previewing);
        assert!(ctrl.print_pending());
        assert_eq!(ctrl.notice().unwrap().kind, NoticeKind::Info);
    }

    #[tokio::test]
    async fn test_finish_without_content_does_nothing() {
        let store = Arc::new(MemoryResumeStore::new());
        let mut ctrl = controller_with(store.clone());
        assert!(ctrl.finish_and_commit().await.is_err());
        assert_eq!(store.len(), 0);
        assert_eq!(ctrl.mode(), Mode::Editing);
    }

    #[tokio::test]
    async fn test_admin_edit_flow_updates_record() {
        let store = Arc::new(MemoryResumeStore::new());
        let mut doc = Document::default();
        doc.personal_info.first_name = "Grace".to_string();
        let record = ResumeRecord::new(doc, TemplateKind::Bold, RecordStatus::Draft);
        let id = record.id;
        store.insert(record);

        let mut ctrl = controller_with(store.clone());
        login(&mut ctrl).await;
        assert_eq!(ctrl.mode(), Mode::Administrating);
        assert_eq!(ctrl.record_stats().unwrap().drafts, 1);

        ctrl.edit_record(id).unwrap();
        assert_eq!(ctrl.mode(), Mode::Editing);
        assert_eq!(ctrl.template(), TemplateKind::Bold);
        assert_eq!(ctrl.editing_record_id(), Some(id));

        ctrl.finish_and_commit().await.unwrap();
        assert_eq!(ctrl.mode(), Mode::Administrating);
        assert_eq!(ctrl.editing_record_id(), None);
        assert!(!ctrl.document().has_entered_data());
        let stats = ctrl.record_stats().unwrap();
        assert_eq!((stats.total, stats.completed), (1, 1));
    }

    #[tokio::test]
    async fn test_failed_admin_update_stays_in_editor() {
        let store = Arc::new(MemoryResumeStore::new());
        let mut doc = Document::default();
        doc.personal_info.first_name = "Grace".to_string();
        let record = ResumeRecord::new(doc, TemplateKind::Bold, RecordStatus::Draft);
        let id = record.id;
        store.insert(record);

        let mut ctrl = controller_with(store.clone());
        login(&mut ctrl).await;
        ctrl.edit_record(id).unwrap();
        store.set_failing(true);

        assert!(ctrl.finish_and_commit().await.is_err());
        assert_eq!(ctrl.mode(), Mode::Editing);
        assert_eq!(ctrl.editing_record_id(), Some(id));
        assert_eq!(ctrl.notice().unwrap().message, "Failed to update resume.");
    }

    #[tokio::test]
    async fn test_admin_operations_require_login() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        assert!(matches!(ctrl.record_stats(), Err(AppError::Unauthorized)));
        assert!(matches!(
            ctrl.delete_record(Uuid::new_v4()).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            ctrl.update_lockout_stage(0, 1, 1),
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_auto_cleanup_runs_before_listing() {
        let store = Arc::new(MemoryResumeStore::new());
        let base = Utc::now();
        for i in 0..3 {
            let mut record = ResumeRecord::new(
                Document::default(),
                TemplateKind::default(),
                RecordStatus::Completed,
            );
            record.created_at = base + Duration::seconds(i);
            store.insert(record);
        }
        let mut ctrl = ViewController::new(
            store.clone(),
            Arc::new(FakeEnhancer { fail: false }),
            LockoutMachine::new(LockoutConfig::default(), PinCode::parse("1984").unwrap()),
            AdminSettings::new(true, 3),
        );
        login(&mut ctrl).await;
        assert_eq!(store.len(), 1);
        assert_eq!(ctrl.record_stats().unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_locally_and_failure_raises_notice() {
        let store = Arc::new(MemoryResumeStore::new());
        let a = ResumeRecord::new(Document::default(), TemplateKind::Tech, RecordStatus::Review);
        let b = ResumeRecord::new(Document::default(), TemplateKind::Tech, RecordStatus::Draft);
        let (a_id, b_id) = (a.id, b.id);
        store.insert(a);
        store.insert(b);

        let mut ctrl = controller_with(store.clone());
        login(&mut ctrl).await;
        ctrl.delete_record(a_id).await.unwrap();
        assert_eq!(ctrl.record_stats().unwrap().total, 1);

        store.set_failing(true);
        assert!(ctrl.delete_record(b_id).await.is_err());
        assert_eq!(ctrl.record_stats().unwrap().total, 1);
        assert_eq!(ctrl.notice().unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_download_then_back_returns_to_dashboard() {
        let store = Arc::new(MemoryResumeStore::new());
        let mut doc = Document::default();
        doc.personal_info.last_name = "Hopper".to_string();
        let record = ResumeRecord::new(doc, TemplateKind::Classic, RecordStatus::Completed);
        let id = record.id;
        store.insert(record);

        let mut ctrl = controller_with(store);
        login(&mut ctrl).await;
        ctrl.download_record(id).unwrap();
        assert_eq!(ctrl.mode(), Mode::Previewing);
        assert!(ctrl.print_pending());
        assert_eq!(ctrl.document().personal_info.last_name, "Hopper");

        ctrl.back_from_preview();
        assert_eq!(ctrl.mode(), Mode::Administrating);
        assert!(!ctrl.print_pending());

        ctrl.logout();
        assert_eq!(ctrl.mode(), Mode::Editing);
        assert!(!ctrl.is_admin());
        assert!(!ctrl.document().has_entered_data());
    }

    #[tokio::test]
    async fn test_pin_lockout_flow() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        let t0 = Utc::now();

        assert!(matches!(
            ctrl.submit_pin("12a4", t0).await,
            Err(AppError::Lockout(_))
        ));
        assert_eq!(
            ctrl.submit_pin("0000", t0).await.unwrap(),
            AttemptResult::Failure {
                attempts_remaining: 2
            }
        );
        ctrl.submit_pin("0000", t0).await.unwrap();
        assert_eq!(
            ctrl.submit_pin("0000", t0).await.unwrap(),
            AttemptResult::LockedOut {
                stage_index: 0,
                duration_minutes: 1
            }
        );

        // The right code is not even compared while locked.
        let err = ctrl
            .submit_pin("1984", t0 + Duration::seconds(30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::StillLocked {
                seconds_remaining: 30
            }
        ));
        assert!(!ctrl.is_admin());

        assert_eq!(
            ctrl.tick_lockout(t0 + Duration::seconds(60)),
            LockoutTick::Expired
        );
        ctrl.submit_pin("1984", t0 + Duration::seconds(61))
            .await
            .unwrap();
        assert!(ctrl.is_admin());
    }

    #[tokio::test]
    async fn test_settings_clamp_retention_limit() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        login(&mut ctrl).await;
        let settings = ctrl.set_auto_cleanup(true, 0).unwrap();
        assert_eq!(settings.retention_limit, MIN_RETENTION_LIMIT);
        assert!(matches!(
            ctrl.update_lockout_stage(7, 1, 1),
            Err(AppError::Lockout(_))
        ));
        ctrl.update_lockout_stage(0, 5, 2).unwrap();
        assert_eq!(ctrl.lockout().config().stage(0), LockoutStage::new(5, 2));
    }

    #[test]
    fn test_height_reports_latest_wins() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        ctrl.report_height(5000.0);
        ctrl.report_height(2300.0);
        assert_eq!(ctrl.pagination().total_pages, 1);
        assert!(ctrl.measurement_due());
        assert_eq!(ctrl.pagination().total_pages, 3);
        assert!(!ctrl.measurement_due());
    }

    #[test]
    fn test_notice_due_ignores_replaced_notice() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        let first = ctrl.raise_notice(NoticeKind::Info, "one");
        let second = ctrl.raise_notice(NoticeKind::Info, "two");
        assert!(!ctrl.notice_due(first));
        assert!(ctrl.notice_due(second));
        assert!(ctrl.notice().is_none());
    }

    #[test]
    fn test_enhancement_reveal_and_undo() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        filled(&mut ctrl);

        let request = ctrl
            .begin_enhancement(EnhanceTarget::Summary, EnhancementOption::Professional)
            .unwrap();
        assert_eq!(request.kind, ContentKind::Summary);
        let plan = ctrl
            .complete_enhancement(&request, Ok("Built engines".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(ctrl.document().summary, "");

        assert!(ctrl.reveal_frame(request.target, request.generation, plan.frame(5), false));
        assert_eq!(ctrl.document().summary, "Built");
        assert!(ctrl.reveal_frame(request.target, request.generation, plan.full_text(), true));
        assert_eq!(ctrl.document().summary, "Built engines");

        ctrl.undo_enhancement(EnhanceTarget::Summary).unwrap();
        assert_eq!(ctrl.document().summary, "Wrote programs");
        assert!(ctrl.undo_enhancement(EnhanceTarget::Summary).is_err());
    }

    #[test]
    fn test_enhancement_error_reverts_field() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        filled(&mut ctrl);
        let id = ctrl.add_experience();
        ctrl.update_experience(
            id,
            ExperiencePatch {
                description: Some("- did stuff".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let target = EnhanceTarget::Experience(id);
        let request = ctrl
            .begin_enhancement(target, EnhancementOption::Grammar)
            .unwrap();
        assert_eq!(request.kind, ContentKind::Experience);
        let err = ctrl
            .complete_enhancement(&request, Err(EnhancementError::NotConfigured))
            .unwrap_err();
        assert!(matches!(err, AppError::Enhancement(_)));
        assert_eq!(ctrl.document().experience[0].description, "- did stuff");
        assert_eq!(ctrl.notice().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn test_editing_target_cancels_reveal() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        filled(&mut ctrl);

        let request = ctrl
            .begin_enhancement(EnhanceTarget::Summary, EnhancementOption::Concise)
            .unwrap();
        ctrl.complete_enhancement(&request, Ok("Short".to_string()))
            .unwrap();
        ctrl.set_summary("Typed by hand".to_string());

        assert!(!ctrl.reveal_frame(request.target, request.generation, "Sh", false));
        assert_eq!(ctrl.document().summary, "Typed by hand");
        assert!(ctrl.reveal_in_progress().is_none());
    }

    #[test]
    fn test_stale_enhancement_result_is_dropped() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        filled(&mut ctrl);

        let request = ctrl
            .begin_enhancement(EnhanceTarget::Summary, EnhancementOption::Expand)
            .unwrap();
        ctrl.set_summary("Changed meanwhile".to_string());
        let plan = ctrl
            .complete_enhancement(&request, Ok("LATE".to_string()))
            .unwrap();
        assert!(plan.is_none());
        assert_eq!(ctrl.document().summary, "Changed meanwhile");

        // Nothing was applied, so undo must not clobber the hand-typed text.
        assert!(matches!(
            ctrl.undo_enhancement(EnhanceTarget::Summary),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(ctrl.document().summary, "Changed meanwhile");
    }

    #[test]
    fn test_leaving_editor_mid_reveal_writes_full_text() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        filled(&mut ctrl);

        let request = ctrl
            .begin_enhancement(EnhanceTarget::Summary, EnhancementOption::Professional)
            .unwrap();
        ctrl.complete_enhancement(&request, Ok("Built compilers".to_string()))
            .unwrap();
        assert!(ctrl.reveal_frame(request.target, request.generation, "Buil", false));

        ctrl.request_preview().unwrap();
        assert_eq!(ctrl.mode(), Mode::Previewing);
        assert_eq!(ctrl.document().summary, "Built compilers");
        assert!(ctrl.reveal_in_progress().is_none());
        assert!(!ctrl.reveal_frame(request.target, request.generation, "Built", false));

        // The applied enhancement can still be undone.
        ctrl.undo_enhancement(EnhanceTarget::Summary).unwrap();
        assert_eq!(ctrl.document().summary, "Wrote programs");
    }

    #[test]
    fn test_blank_target_is_rejected() {
        let mut ctrl = controller_with(Arc::new(MemoryResumeStore::new()));
        assert!(matches!(
            ctrl.begin_enhancement(EnhanceTarget::Summary, EnhancementOption::Professional),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ctrl.begin_enhancement(
                EnhanceTarget::Experience(Uuid::new_v4()),
                EnhancementOption::Professional
            ),
            Err(AppError::NotFound(_))
        ));
    }
}
