/*!
 * End-to-end tests for the caption workspace
 */

use std::sync::Arc;

use caploop::access::DenyList;
use caploop::captions::{Caption, CaptionId, CaptionPatch, RowType};
use caploop::errors::{EngineError, OrderError, StoreError};
use caploop::playback::{ActiveInterval, DisplayUpdate, LoopState, ManualTicks, TickOutcome};
use caploop::store::{CaptionStore, MemoryStore};
use caploop::workspace::CaptionWorkspace;

use crate::common::mock_transport::{FlakyStore, MockPlayer};
use crate::common::{caption, init_logger, sample_document, secs};

const SUBJECT: &str = "song-1";

async fn seed(store: &dyn CaptionStore, captions: &[Caption]) {
    for c in captions {
        store.save_caption(SUBJECT, c).await.unwrap();
    }
}

/// Workspace over a memory store holding the sample captions
async fn sample_workspace() -> (CaptionWorkspace, MemoryStore, MockPlayer) {
    init_logger();
    let store = MemoryStore::new();
    seed(&store, &sample_document().captions).await;
    let player = MockPlayer::new();

    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(player.clone()));
    workspace.open_subject(SUBJECT, None).await.unwrap();
    (workspace, store, player)
}

fn id_of(workspace: &CaptionWorkspace, serial_number: usize) -> CaptionId {
    workspace
        .interval_set()
        .and_then(|s| s.get_by_serial(serial_number))
        .map(|c| c.id.clone())
        .unwrap()
}

fn starts(workspace: &CaptionWorkspace) -> Vec<u64> {
    workspace.captions().iter().map(|c| c.start_time.as_secs()).collect()
}

// ===== Subject lifecycle =====

#[tokio::test]
async fn test_openSubject_shouldSortCaptionsAndUsePlayerDuration() {
    let (workspace, _, _) = sample_workspace().await;

    assert_eq!(starts(&workspace), vec![0, 10, 30]);
    assert_eq!(workspace.subject().unwrap().duration, Some(secs(120)));
    assert_eq!(workspace.captions()[2].serial_number, 3);
}

#[tokio::test]
async fn test_openSubject_withStoreFailure_shouldKeepPreviousSubject() {
    let store = FlakyStore::new();
    seed(store.inner(), &sample_document().captions).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()));
    workspace.open_subject(SUBJECT, None).await.unwrap();

    store.failures().lock().unwrap().load = true;
    let result = workspace.open_subject("other", None).await;

    assert!(matches!(result, Err(EngineError::Store(StoreError::Backend(_)))));
    assert_eq!(workspace.subject().unwrap().id, SUBJECT);
    assert_eq!(workspace.captions().len(), 3);
}

// ===== Edit sessions =====

#[tokio::test]
async fn test_cancelEdit_onNewCaption_shouldRemoveIt() {
    let (mut workspace, store, player) = sample_workspace().await;

    let created = workspace.begin_add_after(3, RowType::Text).unwrap();
    assert_eq!((created.start_time.as_secs(), created.end_time.as_secs()), (45, 55));
    assert_eq!(workspace.captions().len(), 4);
    assert_eq!(player.seeks(), vec![45.0]);

    workspace.cancel_edit();

    assert_eq!(workspace.captions().len(), 3);
    assert!(!workspace.session().is_open());
    assert_eq!(workspace.loop_state(), &LoopState::Idle);
    assert_eq!(store.count_for(SUBJECT), 3);
}

#[tokio::test]
async fn test_cancelEdit_afterStagingStart_shouldRestoreOriginalTimes() {
    init_logger();
    let store = MemoryStore::new();
    seed(&store, &[caption(60, 150, "Bridge")]).await;
    let player = MockPlayer::with_duration(Some(600.0));
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(player));
    workspace.open_subject(SUBJECT, None).await.unwrap();
    let id = id_of(&workspace, 1);

    workspace.begin_edit(&id).unwrap();
    let preview = workspace.stage_start("2:00").unwrap();
    assert_eq!(preview.start_time, secs(120));
    assert_eq!(workspace.captions()[0].start_time, secs(60));

    workspace.cancel_edit();

    assert_eq!(workspace.captions()[0].start_time, secs(60));
    assert_eq!(store.get(&id).unwrap().start_time, secs(60));
    assert!(workspace.session().staged().is_none());
}

#[tokio::test]
async fn test_stage_withBadInput_shouldKeepEarlierStage() {
    let (mut workspace, _, _) = sample_workspace().await;
    let chorus = id_of(&workspace, 3);
    workspace.begin_edit(&chorus).unwrap();
    workspace.stage_end("0:50").unwrap();

    match workspace.stage_start("1:75") {
        Err(EngineError::Format(err)) => assert_eq!(err.suggestion.as_deref(), Some("2:15")),
        other => panic!("expected format error, got {:?}", other),
    }
    assert!(matches!(workspace.stage_start("0:55"), Err(EngineError::Order(_))));

    let preview = workspace.session().preview().unwrap();
    assert_eq!((preview.start_time.as_secs(), preview.end_time.as_secs()), (30, 50));
}

#[tokio::test]
async fn test_commitEdit_withOverlap_shouldStayOpenAndChangeNothing() {
    let (mut workspace, store, _) = sample_workspace().await;
    let chorus = id_of(&workspace, 3);
    workspace.begin_edit(&chorus).unwrap();
    workspace.stage_start("0:15").unwrap();

    let err = workspace.commit_edit().await.unwrap_err();

    match err {
        EngineError::Overlap { index, serial_number, .. } => assert_eq!((index, serial_number), (2, 3)),
        other => panic!("expected overlap, got {:?}", other),
    }
    assert!(workspace.session().is_open());
    assert_eq!(starts(&workspace), vec![0, 10, 30]);
    assert_eq!(store.get(&chorus).unwrap().start_time, secs(30));

    workspace.stage_start("0:20").unwrap();
    let committed = workspace.commit_edit().await.unwrap();

    assert_eq!(committed.start_time, secs(20));
    assert_eq!(store.get(&chorus).unwrap().start_time, secs(20));
    assert!(!workspace.session().is_open());
    assert_eq!(
        workspace.loop_state(),
        &LoopState::Suspended(ActiveInterval::for_caption(&committed))
    );
}

#[tokio::test]
async fn test_commitEdit_onNewCaption_shouldCreateItInStore() {
    let (mut workspace, store, _) = sample_workspace().await;

    let created = workspace.begin_add_after(2, RowType::Chords).unwrap();
    assert_eq!((created.start_time.as_secs(), created.end_time.as_secs()), (15, 20));
    workspace
        .stage_edit(CaptionPatch::lines("C  G", ""))
        .unwrap();
    workspace.commit_edit().await.unwrap();

    assert_eq!(store.count_for(SUBJECT), 4);
    let stored = store.get(&created.id).unwrap();
    assert_eq!(stored.lines[0], "C  G");
    assert_eq!(stored.serial_number, 3);
}

#[tokio::test]
async fn test_commitEdit_withStoreFailure_shouldLeaveSetUntouched() {
    init_logger();
    let store = FlakyStore::new();
    seed(store.inner(), &sample_document().captions).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()));
    workspace.open_subject(SUBJECT, None).await.unwrap();
    let chorus = id_of(&workspace, 3);

    workspace.begin_edit(&chorus).unwrap();
    workspace.stage_end("0:50").unwrap();
    store.failures().lock().unwrap().update = true;

    let result = workspace.commit_edit().await;

    assert!(matches!(result, Err(EngineError::Store(_))));
    assert!(workspace.session().is_open());
    assert_eq!(workspace.captions()[2].end_time, secs(45));
    assert_eq!(store.inner().get(&chorus).unwrap().end_time, secs(45));

    store.fail_all(false);
    workspace.commit_edit().await.unwrap();
    assert_eq!(workspace.captions()[2].end_time, secs(50));
}

#[tokio::test]
async fn test_commitEdit_afterPartialStoreFailure_shouldRetryAsUpdate() {
    init_logger();
    let store = FlakyStore::new();
    seed(store.inner(), &[caption(20, 30, "a"), caption(40, 50, "b")]).await;
    let player = MockPlayer::new();
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(player.clone()));
    workspace.open_subject(SUBJECT, None).await.unwrap();

    player.set_position(5.0);
    let created = workspace.begin_add_at_playhead(RowType::Text).unwrap();
    assert_eq!(created.serial_number, 1);
    store.failures().lock().unwrap().update = true;

    // The new caption is created first, then the first update fails
    let result = workspace.commit_edit().await;
    assert!(matches!(result, Err(EngineError::Store(StoreError::Backend(_)))));
    assert!(store.inner().get(&created.id).is_some());
    assert!(workspace.session().is_open());

    store.fail_all(false);
    let committed = workspace.commit_edit().await.unwrap();

    assert_eq!(committed.id, created.id);
    assert_eq!(store.inner().count_for(SUBJECT), 3);
    assert!(!workspace.session().is_open());
}

#[tokio::test]
async fn test_openSession_shouldBlockStructuralEdits() {
    let (mut workspace, _, _) = sample_workspace().await;
    let first = id_of(&workspace, 1);
    let chorus = id_of(&workspace, 3);
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.begin_edit(&chorus).unwrap();

    assert_eq!(
        workspace.insert_after(1, RowType::Text).unwrap_err(),
        EngineError::SessionAlreadyOpen(3)
    );
    assert_eq!(workspace.activate_loop().unwrap_err(), EngineError::SessionAlreadyOpen(3));
    assert_eq!(
        workspace.begin_edit(&first).unwrap_err(),
        EngineError::SessionAlreadyOpen(3)
    );
    assert_eq!(workspace.captions().len(), 3);
}

// ===== Loop region =====

#[tokio::test]
async fn test_editDuringLoop_shouldSuspendAndRestoreRegion() {
    let (mut workspace, _, player) = sample_workspace().await;
    let chorus = id_of(&workspace, 3);
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();

    workspace.begin_edit(&chorus).unwrap();
    assert!(matches!(
        workspace.loop_state(),
        LoopState::Armed(interval) if interval.is_caption(&chorus)
    ));
    assert!(!workspace.loop_region().unwrap().active);

    workspace.cancel_edit();

    let region = *workspace.loop_region().unwrap();
    assert!(region.active);
    assert_eq!(workspace.loop_state(), &LoopState::Armed(region.interval()));
    assert_eq!(player.seeks(), vec![10.0, 30.0, 10.0]);
}

#[tokio::test]
async fn test_commitDuringLoop_shouldHoldRegionSuspended() {
    let (mut workspace, _, player) = sample_workspace().await;
    let chorus = id_of(&workspace, 3);
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();

    workspace.begin_edit(&chorus).unwrap();
    workspace.stage_end("0:50").unwrap();
    workspace.commit_edit().await.unwrap();

    let region = *workspace.loop_region().unwrap();
    assert!(!region.active);
    assert_eq!(workspace.loop_state(), &LoopState::Suspended(region.interval()));

    player.clear_seeks();
    assert!(workspace.resume_loop().unwrap());
    assert_eq!(player.seeks(), vec![10.0]);
    assert!(workspace.loop_region().unwrap().active);
}

#[tokio::test]
async fn test_setLoopRegion_whileLooping_shouldRetargetAtOnce() {
    let (mut workspace, _, player) = sample_workspace().await;
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();

    workspace.set_loop_region("0:30", "0:40").unwrap();

    assert_eq!(player.seeks(), vec![10.0, 30.0]);
    assert!(workspace.loop_region().unwrap().active);
    player.set_position(40.0);
    assert_eq!(workspace.tick(), TickOutcome::Seeked { from: 40.0, to: 30.0 });
}

#[tokio::test]
async fn test_setLoopRegion_withInvalidTimes_shouldKeepOldRegion() {
    let (mut workspace, _, _) = sample_workspace().await;
    workspace.set_loop_region("0:10", "0:20").unwrap();

    assert!(matches!(workspace.set_loop_region("0:10", "1:75"), Err(EngineError::Format(_))));
    assert!(matches!(workspace.set_loop_region("0:10", "3:00"), Err(EngineError::Order(_))));
    assert_eq!(workspace.loop_region().unwrap().end_time, secs(20));
    assert_eq!(workspace.activate_loop(), Ok(()));
}

#[tokio::test]
async fn test_activateLoop_withoutRegion_shouldFail() {
    let (mut workspace, _, _) = sample_workspace().await;
    assert_eq!(workspace.activate_loop(), Err(EngineError::NoLoopRegion));

    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.clear_loop();
    assert_eq!(workspace.activate_loop(), Err(EngineError::NoLoopRegion));
}

#[tokio::test]
async fn test_stopLoop_shouldSuspendTicks() {
    let (mut workspace, _, player) = sample_workspace().await;
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();

    assert!(workspace.stop_loop());
    player.set_position(90.0);

    assert_eq!(workspace.tick(), TickOutcome::Suspended);
    assert_eq!(player.position(), 90.0);
    assert!(!workspace.loop_region().unwrap().active);
}

#[tokio::test]
async fn test_cancelEdit_afterStopLoop_shouldKeepRegionForResume() {
    let (mut workspace, _, player) = sample_workspace().await;
    let chorus = id_of(&workspace, 3);
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();
    assert!(workspace.stop_loop());

    workspace.begin_edit(&chorus).unwrap();
    workspace.cancel_edit();

    let region = *workspace.loop_region().unwrap();
    assert!(!region.active);
    assert_eq!(workspace.loop_state(), &LoopState::Suspended(region.interval()));

    player.clear_seeks();
    assert!(workspace.resume_loop().unwrap());
    assert_eq!(player.seeks(), vec![10.0]);
    assert!(workspace.loop_region().unwrap().active);
}

// ===== Access gate =====

#[tokio::test]
async fn test_readOnlyGate_shouldRefuseMutationsButAllowLooping() {
    let store = MemoryStore::new();
    seed(&store, &sample_document().captions).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()))
        .with_gate(Arc::new(DenyList::read_only("viewer account")));
    workspace.open_subject(SUBJECT, None).await.unwrap();
    let first = id_of(&workspace, 1);

    assert!(matches!(workspace.insert_after(1, RowType::Text), Err(EngineError::AccessDenied(_))));
    assert!(matches!(workspace.begin_edit(&first), Err(EngineError::AccessDenied(_))));
    assert!(matches!(workspace.delete(&first).await, Err(EngineError::AccessDenied(_))));
    assert!(matches!(workspace.auto_resolve(), Err(EngineError::AccessDenied(_))));
    match workspace.save().await {
        Err(EngineError::AccessDenied(reason)) => assert!(reason.contains("viewer account")),
        other => panic!("expected access denial, got {:?}", other),
    }

    assert_eq!(workspace.captions().len(), 3);
    assert!(!workspace.session().is_open());
    assert_eq!(store.count_for(SUBJECT), 3);

    workspace.set_loop_region("0:10", "0:20").unwrap();
    assert!(workspace.activate_loop().is_ok());
}

// ===== Structural edits and saving =====

#[tokio::test]
async fn test_delete_shouldRemoveFromStoreThenSet() {
    let (mut workspace, store, _) = sample_workspace().await;
    let second = id_of(&workspace, 2);

    workspace.delete(&second).await.unwrap();

    assert_eq!(starts(&workspace), vec![0, 30]);
    assert_eq!(workspace.captions()[1].serial_number, 2);
    assert!(store.get(&second).is_none());
}

#[tokio::test]
async fn test_deleteAll_withStoreFailure_shouldKeepCaptions() {
    init_logger();
    let store = FlakyStore::new();
    seed(store.inner(), &sample_document().captions).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()));
    workspace.open_subject(SUBJECT, None).await.unwrap();

    store.failures().lock().unwrap().delete = true;
    assert!(matches!(workspace.delete_all().await, Err(EngineError::Store(_))));
    assert_eq!(workspace.captions().len(), 3);

    store.fail_all(false);
    assert_eq!(workspace.delete_all().await.unwrap(), 3);
    assert!(workspace.captions().is_empty());
    assert_eq!(store.inner().count_for(SUBJECT), 0);
}

#[tokio::test]
async fn test_insertAtPlayhead_withPlayerNotReady_shouldFail() {
    let (mut workspace, _, player) = sample_workspace().await;
    player.set_ready(false);

    assert!(matches!(
        workspace.insert_at_playhead(RowType::Text),
        Err(EngineError::TransportUnavailable(_))
    ));

    player.set_ready(true);
    player.set_position(22.4);
    let created = workspace.insert_at_playhead(RowType::Text).unwrap();
    assert_eq!((created.start_time.as_secs(), created.end_time.as_secs()), (22, 30));
    assert_eq!(starts(&workspace), vec![0, 10, 22, 30]);
}

#[tokio::test]
async fn test_autoResolveThenSave_shouldPersistFixedTimes() {
    init_logger();
    let store = MemoryStore::new();
    seed(&store, &[caption(0, 20, "a"), caption(15, 30, "b")]).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()));
    workspace.open_subject(SUBJECT, None).await.unwrap();

    assert!(matches!(workspace.save().await, Err(EngineError::Overlap { .. })));

    let outcome = workspace.auto_resolve().unwrap();
    assert_eq!(outcome.shifts.len(), 1);
    let report = workspace.save().await.unwrap();

    assert_eq!(report.updated, 2);
    let moved = outcome.shifts[0].caption_id.clone();
    assert_eq!(store.get(&moved).unwrap().start_time, secs(20));
}

#[tokio::test]
async fn test_autoResolve_pastMediaEnd_shouldRefuseAndKeepCaptions() {
    init_logger();
    let store = MemoryStore::new();
    seed(&store, &[caption(0, 120, "long"), caption(20, 30, "inside")]).await;
    let mut workspace = CaptionWorkspace::new(Arc::new(store.clone()), Box::new(MockPlayer::new()));
    workspace.open_subject(SUBJECT, None).await.unwrap();

    let result = workspace.auto_resolve();

    assert!(matches!(
        result,
        Err(EngineError::Order(OrderError::BeyondDuration { .. }))
    ));
    let spans: Vec<(u64, u64)> = workspace
        .captions()
        .iter()
        .map(|c| (c.start_time.as_secs(), c.end_time.as_secs()))
        .collect();
    assert_eq!(spans, vec![(0, 120), (20, 30)]);
    assert!(matches!(workspace.save().await, Err(EngineError::Overlap { .. })));
}

// ===== Timers =====

#[tokio::test]
async fn test_drive_shouldWrapLoopAndTrackDisplay() {
    let (mut workspace, _, player) = sample_workspace().await;
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();
    player.set_position(25.0);

    let stats = workspace
        .drive(&mut ManualTicks::new(3), &mut ManualTicks::new(2))
        .await;

    assert_eq!(stats.loop_ticks, 3);
    assert_eq!(stats.seeks, 1);
    assert_eq!(stats.skipped_ticks, 0);
    assert_eq!(stats.display_changes, 1);
    assert_eq!(player.position(), 10.0);
}

#[tokio::test]
async fn test_refreshDisplay_shouldFollowPlayhead() {
    let (mut workspace, _, player) = sample_workspace().await;

    player.set_position(12.0);
    match workspace.refresh_display() {
        DisplayUpdate::Show(shown) => assert_eq!(shown.lines[0], "Second verse"),
        other => panic!("expected a caption, got {:?}", other),
    }
    assert_eq!(workspace.refresh_display(), DisplayUpdate::Unchanged);

    player.set_position(25.0);
    assert_eq!(workspace.refresh_display(), DisplayUpdate::Clear);

    player.set_ready(false);
    assert_eq!(workspace.refresh_display(), DisplayUpdate::Skipped);

    workspace.close_subject();
    player.set_ready(true);
    assert_eq!(workspace.refresh_display(), DisplayUpdate::Skipped);
}

#[tokio::test]
async fn test_closeSubject_shouldDropLoopAndSession() {
    let (mut workspace, _, _) = sample_workspace().await;
    workspace.set_loop_region("0:10", "0:20").unwrap();
    workspace.activate_loop().unwrap();
    let first = id_of(&workspace, 1);
    workspace.begin_edit(&first).unwrap();

    workspace.close_subject();

    assert!(workspace.subject().is_none());
    assert!(workspace.loop_region().is_none());
    assert!(!workspace.session().is_open());
    assert_eq!(workspace.loop_state(), &LoopState::Idle);
    assert!(matches!(
        workspace.insert_after(1, RowType::Text),
        Err(EngineError::NoSubject)
    ));
}
