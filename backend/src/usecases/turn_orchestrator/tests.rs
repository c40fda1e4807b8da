use super::*;
use chrono::Utc;
use crates::{
    domain::{
        entities::avatar_assets::UpsertAvatarAssetEntity,
        repositories::{
            language_models::MockReplyGenerator,
            speech::{MockSpeechSynthesizer, MockTranscriber},
            storage::MockMediaStorage,
        },
        value_objects::{
            enums::job_statuses::JobStatus,
            provider_jobs::{CompletionMode, JobState, ProviderJob},
        },
    },
    infra::memory::{
        avatar_assets::AvatarAssetMemory, subscriptions::SubscriptionMemory,
        usages::UsageMemory, visio_sessions::VisioSessionMemory,
    },
    providers::MockVideoAvatarProvider,
    reconcilers::{ReconcilePolicies, ReconcilePolicy, job_registry::JobRegistry},
};
use std::time::Duration;

use crate::usecases::plan_resolver::PlanResolver;

struct Harness {
    orchestrator: TurnOrchestrator,
    sessions: Arc<VisioSessionUseCase>,
    usage: Arc<UsageLedger>,
    user_id: Uuid,
    session_id: Uuid,
}

fn transcriber_saying(text: &'static str) -> MockTranscriber {
    let mut transcriber = MockTranscriber::new();
    transcriber
        .expect_transcribe()
        .returning(move |_, _| Ok(text.to_string()));
    transcriber
}

fn replies() -> MockReplyGenerator {
    let mut replies = MockReplyGenerator::new();
    replies
        .expect_complete()
        .withf(|system, user| system.contains("Likes sailing") && user == "Bonjour")
        .returning(|_, _| Ok("Bonjour ! Ravi de te voir.".to_string()));
    replies
}

fn synthesizer() -> MockSpeechSynthesizer {
    let mut synthesizer = MockSpeechSynthesizer::new();
    synthesizer
        .expect_synthesize()
        .withf(|_, voice| voice == "voice-7")
        .returning(|_, _| Ok(vec![1, 2, 3, 4]));
    synthesizer
}

fn storage() -> MockMediaStorage {
    let mut storage = MockMediaStorage::new();
    storage
        .expect_store()
        .returning(|_, name| Ok(format!("https://cdn.test/{}", name)));
    storage
}

fn provider_finishing_with(state: JobState) -> MockVideoAvatarProvider {
    let mut provider = MockVideoAvatarProvider::new();
    provider.expect_name().return_const("heygen");
    provider
        .expect_completion_mode()
        .return_const(CompletionMode::Polling);
    provider.expect_supports_resolution().return_const(true);
    provider
        .expect_generate_talking_video()
        .returning(|_, _, _| Ok(ProviderJob::submitted("video-1")));
    provider
        .expect_get_video_status()
        .returning(move |job_id| Ok(ProviderJob::observed(job_id, state.clone())));
    provider
}

fn ready(duration_seconds: Option<f64>) -> JobState {
    JobState::Ready {
        result_url: "https://cdn.test/video-1.mp4".to_string(),
        duration_seconds,
    }
}

async fn harness(
    transcriber: MockTranscriber,
    provider: MockVideoAvatarProvider,
    used_seconds: f64,
) -> Harness {
    let user_id = Uuid::new_v4();

    let avatars = Arc::new(AvatarAssetMemory::new());
    avatars
        .upsert(UpsertAvatarAssetEntity {
            user_id,
            provider: "heygen".to_string(),
            avatar_id: "avatar-1".to_string(),
            avatar_status: JobStatus::Ready.to_string(),
            voice_id: Some("voice-7".to_string()),
            personality_prompt: Some("Likes sailing".to_string()),
            idle_video_url: None,
            idle_video_status: None,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let plan_resolver = Arc::new(PlanResolver::new(Arc::new(SubscriptionMemory::new())));
    let usage = Arc::new(UsageLedger::new(Arc::new(UsageMemory::new()), plan_resolver));
    if used_seconds > 0.0 {
        usage.consume(user_id, used_seconds).await.unwrap();
    }

    let sessions = Arc::new(VisioSessionUseCase::new(
        Arc::new(VisioSessionMemory::new()),
        avatars.clone(),
    ));
    let session = sessions.start(user_id).await.unwrap();
    sessions
        .begin_recording(user_id, session.session_id)
        .await
        .unwrap();

    let speech = SpeechPipeline::new(
        Arc::new(transcriber),
        Arc::new(replies()),
        Arc::new(synthesizer()),
        Arc::new(storage()),
        "default-voice".to_string(),
    );
    let policy = ReconcilePolicy::new(Duration::from_millis(500), Duration::from_secs(5));
    let renderer = VideoRenderer::new(
        Arc::new(provider),
        Arc::new(JobRegistry::new()),
        ReconcilePolicies {
            polling: policy,
            webhook: policy,
        },
    );

    let orchestrator = TurnOrchestrator::new(
        sessions.clone(),
        usage.clone(),
        avatars,
        Arc::new(speech),
        Arc::new(renderer),
        TurnSettings::default(),
    );

    Harness {
        orchestrator,
        sessions,
        usage,
        user_id,
        session_id: session.session_id,
    }
}

fn utterance() -> TurnInput {
    TurnInput {
        audio: vec![0u8; 64],
        file_name: "turn.webm".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn completed_turn_charges_rendered_duration() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(ready(Some(5.0))),
        598.0,
    )
    .await;

    let result = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap();

    assert_eq!(result.user_text, "Bonjour");
    assert_eq!(result.ai_response, "Bonjour ! Ravi de te voir.");
    assert_eq!(result.video_url, "https://cdn.test/video-1.mp4");
    assert!(result.audio_url.starts_with("https://cdn.test/visio/"));
    assert_eq!(result.duration_seconds, 5.0);
    assert_eq!(result.usage_remaining, 0);
    assert_eq!(result.session.state, VisioState::Talking);
    assert_eq!(result.session.message_count, 1);
    assert_eq!(result.session.accumulated_seconds, 5);

    let usage = h.usage.get_or_create(h.user_id).await.unwrap();
    assert_eq!(usage.used_seconds, 603);
    assert_eq!(usage.remaining_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_duration_bills_fallback_seconds() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(ready(None)),
        0.0,
    )
    .await;

    let result = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap();

    assert_eq!(result.duration_seconds, 5.0);
    assert_eq!(result.usage_remaining, 595);
}

#[tokio::test]
async fn exhausted_quota_is_refused_before_any_paid_call() {
    let mut transcriber = MockTranscriber::new();
    transcriber.expect_transcribe().times(0);
    let h = harness(
        transcriber,
        provider_finishing_with(ready(Some(5.0))),
        600.0,
    )
    .await;

    let err = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VisioError::QuotaExceeded {
            remaining_seconds: 0
        }
    ));
    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Idle);
}

#[tokio::test]
async fn silence_returns_session_to_idle() {
    let h = harness(
        transcriber_saying("   "),
        provider_finishing_with(ready(Some(5.0))),
        0.0,
    )
    .await;

    let err = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap_err();

    assert!(matches!(err, VisioError::InvalidInput(_)));
    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Idle);
    assert_eq!(session.message_count, 0);
}

#[tokio::test(start_paused = true)]
async fn provider_failure_moves_session_to_error_without_charge() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(JobState::Failed {
            error_message: "no face detected".to_string(),
        }),
        0.0,
    )
    .await;

    let err = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap_err();

    assert!(matches!(err, VisioError::Generate(_)));
    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Error);
    let usage = h.usage.get_or_create(h.user_id).await.unwrap();
    assert_eq!(usage.used_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_render_is_not_charged() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(JobState::Processing),
        0.0,
    )
    .await;

    let err = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap_err();

    assert!(matches!(err, VisioError::Timeout { ref job_id, .. } if job_id == "video-1"));
    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Error);
    let usage = h.usage.get_or_create(h.user_id).await.unwrap();
    assert_eq!(usage.used_seconds, 0);
}

#[tokio::test]
async fn turn_requires_a_recording_session() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(ready(Some(5.0))),
        0.0,
    )
    .await;
    h.sessions
        .cancel_recording(h.user_id, h.session_id)
        .await
        .unwrap();

    let err = h
        .orchestrator
        .run_turn(h.user_id, h.session_id, utterance())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VisioError::InvalidTransition {
            from: VisioState::Idle,
            to: VisioState::Processing
        }
    ));
    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Idle);
}

#[tokio::test(start_paused = true)]
async fn dropped_request_still_leaves_processing() {
    let h = harness(
        transcriber_saying("Bonjour"),
        provider_finishing_with(JobState::Processing),
        0.0,
    )
    .await;

    let cancelled = tokio::time::timeout(
        Duration::from_secs(2),
        h.orchestrator.run_turn(h.user_id, h.session_id, utterance()),
    )
    .await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;

    let session = h.sessions.get(h.user_id, h.session_id).await.unwrap();
    assert_eq!(session.state, VisioState::Error);
    let recovered = h.sessions.recover(h.user_id, h.session_id).await.unwrap();
    assert_eq!(recovered.state, VisioState::Idle);
    let usage = h.usage.get_or_create(h.user_id).await.unwrap();
    assert_eq!(usage.used_seconds, 0);
}
