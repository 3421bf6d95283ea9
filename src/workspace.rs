/*!
 * Caption workspace.
 *
 * The entry point a UI talks to. It owns the caption set of the selected
 * video, the loop controller, the edit session and the display tracker,
 * and routes every mutation through the access gate first.
 *
 * Structural edits (insert, duplicate, shift, auto-resolve) stay local until
 * `save` or an edit commit; deletes of stored captions reach the store
 * before they change the set.
 */

use log::{debug, info, warn};
use std::sync::Arc;

use crate::access::{AccessDecision, AccessGate, AllowAll, GatedAction};
use crate::app_config::EngineConfig;
use crate::captions::interval_set::IntervalSet;
use crate::captions::model::{Caption, CaptionId, CaptionPatch, MediaSubject, RowType};
use crate::errors::{EngineError, EngineResult};
use crate::playback::display::{DisplayTracker, DisplayUpdate};
use crate::playback::loop_controller::{LoopController, LoopState, TickOutcome};
use crate::playback::region::{IntervalSource, LoopRegion};
use crate::playback::ticks::TickSource;
use crate::playback::transport::{usable_position, Transport};
use crate::session::{EditMode, EditSession};
use crate::store::CaptionStore;
use crate::timecode::{self, TimeValue};
use crate::validation::overlaps::{AutoResolveOutcome, ConflictResolver, SaveReport};

/// Counters from a `drive` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStats {
    pub loop_ticks: u64,
    pub seeks: u64,
    pub skipped_ticks: u64,
    pub display_changes: u64,
}

/// Editing state for one video at a time
pub struct CaptionWorkspace {
    store: Arc<dyn CaptionStore>,
    gate: Arc<dyn AccessGate>,
    transport: Box<dyn Transport>,
    config: EngineConfig,
    set: Option<IntervalSet>,
    loops: LoopController,
    session: EditSession,
    region: Option<LoopRegion>,
    display: DisplayTracker,
    resolver: ConflictResolver,
}

impl CaptionWorkspace {
    /// Workspace with default settings and no access restrictions
    pub fn new(store: Arc<dyn CaptionStore>, transport: Box<dyn Transport>) -> Self {
        Self {
            store,
            gate: Arc::new(AllowAll),
            transport,
            config: EngineConfig::default(),
            set: None,
            loops: LoopController::new(),
            session: EditSession::new(),
            region: None,
            display: DisplayTracker::new(),
            resolver: ConflictResolver::new(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn subject(&self) -> Option<&MediaSubject> {
        self.set.as_ref().map(|s| s.subject())
    }

    pub fn captions(&self) -> &[Caption] {
        self.set.as_ref().map(|s| s.captions()).unwrap_or(&[])
    }

    pub fn interval_set(&self) -> Option<&IntervalSet> {
        self.set.as_ref()
    }

    pub fn loop_state(&self) -> &LoopState {
        self.loops.state()
    }

    pub fn loop_region(&self) -> Option<&LoopRegion> {
        self.region.as_ref()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    fn authorize(&self, action: GatedAction) -> EngineResult<()> {
        match self.gate.check(action) {
            AccessDecision::Granted => Ok(()),
            AccessDecision::Denied(reason) => {
                warn!("Refused to {}: {}", action, reason);
                Err(EngineError::AccessDenied(reason))
            }
        }
    }

    fn ensure_no_session(&self) -> EngineResult<()> {
        match self.session.target() {
            Some(id) => {
                let serial = self
                    .set
                    .as_ref()
                    .and_then(|s| s.get(id))
                    .map(|c| c.serial_number)
                    .unwrap_or_default();
                Err(EngineError::SessionAlreadyOpen(serial))
            }
            None => Ok(()),
        }
    }

    fn set_mut(&mut self) -> EngineResult<&mut IntervalSet> {
        self.set.as_mut().ok_or(EngineError::NoSubject)
    }

    fn playhead(&self) -> EngineResult<f64> {
        usable_position(self.transport.as_ref()).ok_or_else(|| {
            EngineError::TransportUnavailable("the player did not report a usable position".to_string())
        })
    }

    // =========================================================================
    // Subject lifecycle
    // =========================================================================

    /// Load the captions of a video and make it current
    ///
    /// When `duration` is `None` the player's reported length is used. A store
    /// failure leaves the previous video selected.
    pub async fn open_subject(&mut self, subject_id: &str, duration: Option<TimeValue>) -> EngineResult<usize> {
        let loaded = self.store.load_captions(subject_id).await?;

        let duration = duration.or_else(|| {
            self.transport
                .duration()
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(TimeValue::from_position)
        });

        self.close_subject();
        let set = IntervalSet::from_loaded(
            MediaSubject::new(subject_id, duration),
            loaded,
            self.config.insert_policy(),
        );
        let count = set.len();
        self.set = Some(set);

        info!("Opened {} with {} captions", subject_id, count);
        Ok(count)
    }

    /// Drop the current video, its loop and any open edit
    pub fn close_subject(&mut self) {
        self.session.abandon();
        self.loops.disarm();
        self.region = None;
        self.display.reset();
        if let Some(set) = self.set.take() {
            info!("Closed {}", set.subject().id);
        }
    }

    // =========================================================================
    // Loop region
    // =========================================================================

    /// Define the loop region from user-typed times
    ///
    /// If the previous region was looping, the new one takes over at once.
    pub fn set_loop_region(&mut self, start: &str, end: &str) -> EngineResult<LoopRegion> {
        self.authorize(GatedAction::UseLoop)?;
        let duration = self.set.as_ref().and_then(|s| s.subject().duration);
        let mut region = LoopRegion::parse(start, end, duration)?;

        let region_armed = self
            .loops
            .armed_interval()
            .is_some_and(|i| i.source == IntervalSource::Region);
        if region_armed {
            region.active = true;
            self.loops.arm(region.interval(), self.transport.as_mut());
        } else if self.loops.interval().is_some_and(|i| i.source == IntervalSource::Region) {
            self.loops.hold(region.interval());
        }

        self.region = Some(region);
        Ok(region)
    }

    /// Start looping the region
    pub fn activate_loop(&mut self) -> EngineResult<()> {
        self.authorize(GatedAction::UseLoop)?;
        self.ensure_no_session()?;
        let region = self.region.as_mut().ok_or(EngineError::NoLoopRegion)?;
        region.active = true;
        self.loops.arm(region.interval(), self.transport.as_mut());
        Ok(())
    }

    /// Stop enforcing the loop, keeping the interval for `resume_loop`
    pub fn stop_loop(&mut self) -> bool {
        let stopped = self.loops.suspend();
        if stopped {
            self.sync_region_flag();
        }
        stopped
    }

    /// Re-arm whatever interval the loop holds
    pub fn resume_loop(&mut self) -> EngineResult<bool> {
        self.authorize(GatedAction::UseLoop)?;
        let resumed = self.loops.resume(self.transport.as_mut());
        self.sync_region_flag();
        Ok(resumed)
    }

    /// Forget the loop region
    pub fn clear_loop(&mut self) {
        if self.loops.interval().is_some_and(|i| i.source == IntervalSource::Region) {
            self.loops.disarm();
        }
        self.region = None;
    }

    fn sync_region_flag(&mut self) {
        let armed = self
            .loops
            .armed_interval()
            .is_some_and(|i| i.source == IntervalSource::Region);
        if let Some(region) = self.region.as_mut() {
            region.active = armed;
        }
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    pub fn insert_after(&mut self, serial_number: usize, row_type: RowType) -> EngineResult<Caption> {
        self.authorize(GatedAction::CreateCaption)?;
        self.ensure_no_session()?;
        self.set_mut()?.insert_after(serial_number, row_type)
    }

    pub fn duplicate(&mut self, id: &CaptionId) -> EngineResult<Caption> {
        self.authorize(GatedAction::CreateCaption)?;
        self.ensure_no_session()?;
        self.set_mut()?.duplicate(id)
    }

    pub fn insert_at_playhead(&mut self, row_type: RowType) -> EngineResult<Caption> {
        self.authorize(GatedAction::CreateCaption)?;
        self.ensure_no_session()?;
        let position = self.playhead()?;
        self.set_mut()?.insert_at_playhead(position, row_type)
    }

    pub fn shift(&mut self, id: &CaptionId, delta_secs: i64) -> EngineResult<Caption> {
        self.authorize(GatedAction::EditCaption)?;
        self.ensure_no_session()?;
        self.set_mut()?.shift(id, delta_secs)
    }

    /// Remove a caption, from the store first when it was saved
    pub async fn delete(&mut self, id: &CaptionId) -> EngineResult<Caption> {
        self.authorize(GatedAction::DeleteCaption)?;
        self.ensure_no_session()?;
        let set = self.set.as_mut().ok_or(EngineError::NoSubject)?;
        if set.get(id).is_none() {
            return Err(EngineError::CaptionNotFound(id.to_string()));
        }

        if set.is_persisted(id) && !self.store.delete_caption(id).await? {
            debug!("Caption {} was already gone from the store", id.short());
        }
        set.delete(id)
    }

    /// Remove every caption of the current video
    ///
    /// Store deletes run one by one; if one fails, the captions already
    /// deleted from the store are dropped locally too and the error is
    /// returned.
    pub async fn delete_all(&mut self) -> EngineResult<usize> {
        self.authorize(GatedAction::DeleteCaption)?;
        self.ensure_no_session()?;
        let set = self.set.as_mut().ok_or(EngineError::NoSubject)?;

        let stored: Vec<CaptionId> = set
            .captions()
            .iter()
            .filter(|c| set.is_persisted(&c.id))
            .map(|c| c.id.clone())
            .collect();

        for (done, id) in stored.iter().enumerate() {
            if let Err(err) = self.store.delete_caption(id).await {
                warn!("Delete all stopped after {} captions: {}", done, err);
                for gone in &stored[..done] {
                    set.delete(gone)?;
                }
                return Err(err.into());
            }
        }

        let removed = set.delete_all().len();
        info!("Deleted all {} captions of {}", removed, set.subject().id);
        Ok(removed)
    }

    /// Push overlapping captions apart; saved on the next `save`
    pub fn auto_resolve(&mut self) -> EngineResult<AutoResolveOutcome> {
        self.authorize(GatedAction::ResolveOverlaps)?;
        self.ensure_no_session()?;
        let set = self.set_mut()?;
        let outcome = ConflictResolver::auto_resolve(set.captions());
        if let Err(err) = ConflictResolver::check_bounds(&outcome.captions, set.subject().duration) {
            warn!("Auto-resolve for {} left captions out of range: {}", set.subject().id, err);
            return Err(err.into());
        }
        if outcome.changed() {
            set.replace_all(outcome.captions.clone());
        }
        Ok(outcome)
    }

    /// Persist the whole set if it has no overlaps
    pub async fn save(&mut self) -> EngineResult<SaveReport> {
        self.authorize(GatedAction::SaveCaptions)?;
        let set = self.set.as_mut().ok_or(EngineError::NoSubject)?;
        self.resolver.save(set, self.store.as_ref()).await
    }

    // =========================================================================
    // Edit sessions
    // =========================================================================

    /// Insert after `serial_number` and start editing the new caption
    pub fn begin_add_after(&mut self, serial_number: usize, row_type: RowType) -> EngineResult<Caption> {
        let created = self.insert_after(serial_number, row_type)?;
        self.enter_session(EditMode::Add, &created.id)
    }

    /// Insert at the play head and start editing the new caption
    pub fn begin_add_at_playhead(&mut self, row_type: RowType) -> EngineResult<Caption> {
        let created = self.insert_at_playhead(row_type)?;
        self.enter_session(EditMode::Add, &created.id)
    }

    pub fn begin_edit(&mut self, id: &CaptionId) -> EngineResult<Caption> {
        self.authorize(GatedAction::EditCaption)?;
        self.enter_session(EditMode::Edit, id)
    }

    fn enter_session(&mut self, mode: EditMode, id: &CaptionId) -> EngineResult<Caption> {
        let set = self.set.as_ref().ok_or(EngineError::NoSubject)?;
        let caption = self
            .session
            .enter(mode, id, set, &mut self.loops, self.transport.as_mut())?;
        self.sync_region_flag();
        Ok(caption)
    }

    pub fn stage_edit(&mut self, patch: CaptionPatch) -> EngineResult<Caption> {
        self.authorize(GatedAction::EditCaption)?;
        let set = self.set.as_ref().ok_or(EngineError::NoSubject)?;
        self.session.stage(patch, set, &mut self.loops)
    }

    /// Stage a user-typed start time
    pub fn stage_start(&mut self, input: &str) -> EngineResult<Caption> {
        let start = timecode::parse(input)?;
        self.stage_edit(CaptionPatch::start(start))
    }

    /// Stage a user-typed end time
    pub fn stage_end(&mut self, input: &str) -> EngineResult<Caption> {
        let end = timecode::parse(input)?;
        self.stage_edit(CaptionPatch::end(end))
    }

    pub async fn commit_edit(&mut self) -> EngineResult<Caption> {
        self.authorize(GatedAction::EditCaption)?;
        let set = self.set.as_mut().ok_or(EngineError::NoSubject)?;
        let committed = self
            .session
            .commit(set, &mut self.loops, &self.resolver, self.store.as_ref())
            .await?;
        self.sync_region_flag();
        Ok(committed)
    }

    /// Always allowed; a no-op when nothing is being edited
    pub fn cancel_edit(&mut self) {
        match self.set.as_mut() {
            Some(set) => self.session.cancel(set, &mut self.loops, self.transport.as_mut()),
            None => self.session.abandon(),
        }
        self.sync_region_flag();
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// One loop check
    pub fn tick(&mut self) -> TickOutcome {
        self.loops.tick(self.transport.as_mut())
    }

    /// One caption display check
    pub fn refresh_display(&mut self) -> DisplayUpdate {
        match self.set.as_ref() {
            Some(set) => self.display.refresh(set, self.transport.as_ref()),
            None => DisplayUpdate::Skipped,
        }
    }

    /// Run loop checks and display refreshes until both sources run dry
    pub async fn drive(
        &mut self,
        loop_ticks: &mut dyn TickSource,
        display_ticks: &mut dyn TickSource,
    ) -> DriveStats {
        let mut stats = DriveStats::default();
        let (mut loop_open, mut display_open) = (true, true);

        while loop_open || display_open {
            tokio::select! {
                biased;
                tick = loop_ticks.next_tick(), if loop_open => match tick {
                    Some(_) => match self.tick() {
                        TickOutcome::Seeked { .. } => {
                            stats.loop_ticks += 1;
                            stats.seeks += 1;
                        }
                        TickOutcome::TransportUnavailable => {
                            stats.loop_ticks += 1;
                            stats.skipped_ticks += 1;
                        }
                        _ => stats.loop_ticks += 1,
                    },
                    None => loop_open = false,
                },
                tick = display_ticks.next_tick(), if display_open => match tick {
                    Some(_) => {
                        if matches!(self.refresh_display(), DisplayUpdate::Show(_) | DisplayUpdate::Clear) {
                            stats.display_changes += 1;
                        }
                    }
                    None => display_open = false,
                },
            }
        }

        debug!("Drive finished: {:?}", stats);
        stats
    }
}
