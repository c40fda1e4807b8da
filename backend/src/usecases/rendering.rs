use crates::{
    domain::{
        errors::{VisioError, VisioResult},
        value_objects::{enums::video_resolutions::VideoResolution, provider_jobs::ProviderJob},
    },
    providers::VideoAvatarProvider,
    reconcilers::{ReconcilePolicies, job_registry::JobRegistry, polling::wait_for_job},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A render that reached `ready`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVideo {
    pub job_id: String,
    pub video_url: String,
    pub duration_seconds: Option<f64>,
}

/// The configured provider together with everything needed to see its jobs through.
#[derive(Clone)]
pub struct VideoRenderer {
    provider: Arc<dyn VideoAvatarProvider>,
    registry: Arc<JobRegistry>,
    policies: ReconcilePolicies,
}

impl VideoRenderer {
    pub fn new(
        provider: Arc<dyn VideoAvatarProvider>,
        registry: Arc<JobRegistry>,
        policies: ReconcilePolicies,
    ) -> Self {
        Self {
            provider,
            registry,
            policies,
        }
    }

    pub fn provider(&self) -> &Arc<dyn VideoAvatarProvider> {
        &self.provider
    }

    /// Submits a lip-synced render and waits for its terminal result.
    pub async fn render_talking(
        &self,
        avatar_id: &str,
        audio_url: &str,
        resolution: VideoResolution,
    ) -> VisioResult<RenderedVideo> {
        if !self.provider.supports_resolution(resolution) {
            return Err(VisioError::NotSupported(format!(
                "{} cannot render {}",
                self.provider.name(),
                resolution
            )));
        }

        let job = self
            .provider
            .generate_talking_video(avatar_id, audio_url, resolution)
            .await?;
        info!(
            provider = self.provider.name(),
            job_id = %job.job_id,
            %resolution,
            "rendering: talking video submitted"
        );

        self.wait(job).await
    }

    pub async fn wait(&self, job: ProviderJob) -> VisioResult<RenderedVideo> {
        await_render(&self.provider, &self.registry, &self.policies, job).await
    }
}

/// Waits for a submitted job with the policy matching the provider's delivery mode.
///
/// On success or provider failure the registry entry is dropped. On timeout it is only
/// marked abandoned, so a late callback is still recognised until the TTL sweep.
pub async fn await_render(
    provider: &Arc<dyn VideoAvatarProvider>,
    registry: &JobRegistry,
    policies: &ReconcilePolicies,
    job: ProviderJob,
) -> VisioResult<RenderedVideo> {
    let policy = policies.for_mode(provider.completion_mode());
    let job_id = job.job_id.clone();

    let status_provider = Arc::clone(provider);
    let outcome = wait_for_job(
        &job_id,
        move |job_id: String| {
            let provider = Arc::clone(&status_provider);
            async move { provider.get_video_status(&job_id).await }
        },
        policy,
    )
    .await;

    let finished = match outcome {
        Ok(finished) => finished,
        Err(err) => {
            if matches!(err, VisioError::Timeout { .. }) {
                registry.mark_abandoned(&job_id);
            } else {
                registry.evict(&job_id);
            }
            error!(
                provider = provider.name(),
                %job_id,
                error = %err,
                "rendering: job did not complete"
            );
            return Err(err);
        }
    };
    registry.evict(&job_id);

    match finished.result_url() {
        Some(video_url) => {
            info!(
                provider = provider.name(),
                %job_id,
                duration_seconds = ?finished.duration_seconds(),
                "rendering: video ready"
            );
            Ok(RenderedVideo {
                job_id,
                video_url: video_url.to_string(),
                duration_seconds: finished.duration_seconds(),
            })
        }
        None => {
            let message = finished
                .error_message()
                .unwrap_or("provider reported failure without a message")
                .to_string();
            warn!(provider = provider.name(), %job_id, %message, "rendering: job failed");
            Err(VisioError::Generate(message))
        }
    }
}
