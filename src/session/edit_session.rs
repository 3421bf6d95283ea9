/*!
 * Single caption edit session.
 *
 * Entering a session loops the caption being edited. Field changes are
 * staged on the session and only reach the caption set on commit, which
 * applies them to a copy, refuses overlaps, persists, and then swaps the
 * copy in. Cancel discards the staged changes and gives the loop back to
 * whatever was playing before.
 */

use log::{debug, info, warn};

use super::models::{EditMode, EditSnapshot};
use crate::captions::interval_set::IntervalSet;
use crate::captions::model::{Caption, CaptionId, CaptionPatch};
use crate::errors::{EngineError, EngineResult};
use crate::playback::loop_controller::{LoopController, LoopState};
use crate::playback::region::ActiveInterval;
use crate::playback::transport::Transport;
use crate::store::CaptionStore;
use crate::validation::overlaps::ConflictResolver;

/// At most one open edit per caption set
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    open: Option<EditSnapshot>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn mode(&self) -> Option<EditMode> {
        self.open.as_ref().map(|s| s.mode)
    }

    /// Caption being edited
    pub fn target(&self) -> Option<&CaptionId> {
        self.open.as_ref().map(|s| &s.caption_id)
    }

    /// Changes not yet committed
    pub fn staged(&self) -> Option<&CaptionPatch> {
        self.open.as_ref().map(|s| &s.staged)
    }

    /// The caption as it would look after commit
    pub fn preview(&self) -> Option<Caption> {
        self.open.as_ref().map(|s| s.original.patched(&s.staged))
    }

    /// Open a session on `caption_id` and loop its bounds
    pub fn enter(
        &mut self,
        mode: EditMode,
        caption_id: &CaptionId,
        set: &IntervalSet,
        controller: &mut LoopController,
        transport: &mut dyn Transport,
    ) -> EngineResult<Caption> {
        if let Some(open) = &self.open {
            let serial = set
                .get(&open.caption_id)
                .map(|c| c.serial_number)
                .unwrap_or_default();
            return Err(EngineError::SessionAlreadyOpen(serial));
        }

        let caption = set
            .get(caption_id)
            .ok_or_else(|| EngineError::CaptionNotFound(caption_id.to_string()))?
            .clone();

        let prior_loop = match controller.interval() {
            Some(interval) if !interval.is_caption(caption_id) => controller.state().clone(),
            _ => LoopState::Idle,
        };
        controller.arm(ActiveInterval::for_caption(&caption), transport);

        info!("Editing caption {} ({})", caption, mode);
        self.open = Some(EditSnapshot {
            mode,
            caption_id: caption_id.clone(),
            original: caption.clone(),
            staged: CaptionPatch::default(),
            prior_loop,
        });
        Ok(caption)
    }

    /// Record field changes and follow them with the loop
    ///
    /// The staged caption must stay well ordered; a rejected patch leaves the
    /// earlier staged values in place.
    pub fn stage(
        &mut self,
        patch: CaptionPatch,
        set: &IntervalSet,
        controller: &mut LoopController,
    ) -> EngineResult<Caption> {
        let open = self.open.as_mut().ok_or(EngineError::NoOpenSession)?;

        let mut staged = open.staged.clone();
        staged.merge(patch);
        let preview = open.original.patched(&staged);
        preview.check_order(set.subject().duration)?;

        open.staged = staged;
        if controller
            .interval()
            .is_some_and(|interval| interval.is_caption(&open.caption_id))
        {
            controller.retarget(preview.start_time, preview.end_time);
        }
        debug!("Staged {} for caption {}", preview, open.caption_id.short());
        Ok(preview)
    }

    /// Apply the staged changes, persist, and close the session
    ///
    /// The captions in `set` change only when both the overlap check and the
    /// store succeed; on failure the session stays open so the user can fix
    /// it. Captions the store created before a failure are still recorded as
    /// persisted so a retry updates them.
    pub async fn commit(
        &mut self,
        set: &mut IntervalSet,
        controller: &mut LoopController,
        resolver: &ConflictResolver,
        store: &dyn CaptionStore,
    ) -> EngineResult<Caption> {
        let open = self.open.as_ref().ok_or(EngineError::NoOpenSession)?;

        let mut draft = set.clone();
        draft.update(&open.caption_id, &open.staged)?;
        if let Err(err) = resolver.save(&mut draft, store).await {
            // Captions the store created before failing must be updated next time
            let written: Vec<CaptionId> = draft
                .captions()
                .iter()
                .filter(|c| draft.is_persisted(&c.id) && !set.is_persisted(&c.id))
                .map(|c| c.id.clone())
                .collect();
            for id in &written {
                set.mark_persisted(id);
            }
            if !written.is_empty() {
                debug!("Kept {} partially saved captions after failed commit", written.len());
            }
            return Err(err);
        }

        let committed = draft
            .get(&open.caption_id)
            .cloned()
            .ok_or_else(|| EngineError::CaptionNotFound(open.caption_id.to_string()))?;
        *set = draft;

        let hold = match &open.prior_loop {
            LoopState::Armed(interval) | LoopState::Suspended(interval) => interval.clone(),
            LoopState::Idle => ActiveInterval::for_caption(&committed),
        };
        controller.hold(hold);

        info!("Committed caption {}", committed);
        self.open = None;
        Ok(committed)
    }

    /// Drop the staged changes and close the session
    ///
    /// An added caption is removed again; an edited one gets its entry
    /// values back. Safe to call when nothing is open.
    pub fn cancel(
        &mut self,
        set: &mut IntervalSet,
        controller: &mut LoopController,
        transport: &mut dyn Transport,
    ) {
        let Some(open) = self.open.take() else {
            return;
        };

        match open.mode {
            EditMode::Add => {
                if set.get(&open.caption_id).is_some() {
                    if let Err(err) = set.delete(&open.caption_id) {
                        warn!("Could not remove cancelled caption: {}", err);
                    }
                }
            }
            EditMode::Edit => {
                if set.get(&open.caption_id).is_some() {
                    if let Err(err) = set.update(&open.caption_id, &open.original.snapshot()) {
                        warn!("Could not restore caption {}: {}", open.original, err);
                    }
                }
            }
        }

        match open.prior_loop {
            LoopState::Armed(interval) => controller.arm(interval, transport),
            LoopState::Suspended(interval) => controller.hold(interval),
            LoopState::Idle => controller.disarm(),
        }
        info!("Cancelled edit of caption {}", open.original);
    }

    /// Close without touching the set, e.g. when the subject goes away
    pub fn abandon(&mut self) {
        if let Some(open) = self.open.take() {
            debug!("Abandoned edit of caption {}", open.caption_id.short());
        }
    }
}
