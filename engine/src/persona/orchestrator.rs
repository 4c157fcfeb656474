//! Run orchestration
//!
//! Plans a batch of repositories, then processes them through a bounded
//! worker pool. Every repository is isolated: one failure becomes one
//! `Failed` outcome and the rest of the run continues. Dry runs stop
//! after planning and never touch the generation service, the disk, or
//! the network.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::materializer::{materialize, LocalRepository};
use super::planner::ConceptPlanner;
use super::schedule::schedule;
use super::synthesizer::StepSynthesizer;
use super::types::{LanguageHints, RepoOutcome, RepositoryPlan, RunSummary};
use crate::generation::GenerationService;
use crate::remote::{with_backoff, RemoteError, RemoteHost, Visibility};
use crate::vcs::VcsBackend;

/// Randomized repository count bounds used when the caller gives none
pub const MIN_REPOS: u32 = 1;
pub const MAX_REPOS: u32 = 50;
/// Randomized history window bounds used when the caller gives none
pub const MIN_HISTORY_DAYS: i64 = 30;
pub const MAX_HISTORY_DAYS: i64 = 1825;

/// Caller-facing knobs for one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Number of repositories; drawn from [1, 50] when `None`
    pub repos: Option<u32>,
    /// History window in days; drawn from [30, 1825] when `None`
    pub history_days: Option<i64>,
    pub hints: LanguageHints,
    /// Skip remote creation and pushing entirely
    pub local_only: bool,
    /// Remove the local copy once a push succeeds
    pub cleanup_after_push: bool,
    /// Plan and schedule only; no generation, no disk writes, no network
    pub dry_run: bool,
    pub visibility: Visibility,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            repos: None,
            history_days: None,
            hints: LanguageHints::default(),
            local_only: false,
            cleanup_after_push: false,
            dry_run: false,
            visibility: Visibility::Public,
        }
    }
}

pub struct Orchestrator {
    service: Arc<dyn GenerationService>,
    backend: Arc<dyn VcsBackend>,
    /// Absent when the caller never intends to push
    remote: Option<Arc<dyn RemoteHost>>,
    workspace: PathBuf,
    parallelism: usize,
    max_step_retries: u32,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        workspace: PathBuf,
        parallelism: usize,
        max_step_retries: u32,
        service: Arc<dyn GenerationService>,
        backend: Arc<dyn VcsBackend>,
        remote: Option<Arc<dyn RemoteHost>>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            service,
            backend,
            remote,
            workspace,
            parallelism,
            max_step_retries,
            cancel,
        }
    }

    pub async fn run(&self, request: RunRequest) -> RunSummary {
        let run_id = Uuid::new_v4().to_string();
        let mut rng = StdRng::from_entropy();
        let repo_count = request
            .repos
            .unwrap_or_else(|| rng.gen_range(MIN_REPOS..=MAX_REPOS)) as usize;
        let history_days = request
            .history_days
            .unwrap_or_else(|| rng.gen_range(MIN_HISTORY_DAYS..=MAX_HISTORY_DAYS));
        info!(
            run = %run_id,
            repos = repo_count,
            days = history_days,
            dry_run = request.dry_run,
            "starting run"
        );

        // Planning is pure and cheap, so the whole batch is planned up
        // front; a schedule rejection fails that repository alone.
        let mut planner = ConceptPlanner::new();
        let mut plans: Vec<Result<RepositoryPlan, RepoOutcome>> = Vec::with_capacity(repo_count);
        for _ in 0..repo_count {
            let concept = planner.plan(&request.hints, &mut rng);
            match schedule(history_days, concept.commit_count as usize, &mut rng) {
                Ok(timeline) => {
                    let workdir = self.unique_workdir(&concept.name, &run_id);
                    plans.push(Ok(RepositoryPlan {
                        concept,
                        timeline,
                        workdir,
                    }));
                }
                Err(e) => {
                    warn!(repo = %concept.name, error = %e, "scheduling failed");
                    plans.push(Err(RepoOutcome::Failed {
                        name: concept.name,
                        reason: e.to_string(),
                    }));
                }
            }
        }

        if request.dry_run {
            let outcomes = plans
                .into_iter()
                .map(|plan| match plan {
                    Ok(plan) => RepoOutcome::Planned {
                        name: plan.concept.name.clone(),
                        language: plan.concept.language.clone(),
                        commits: plan.timeline.len(),
                        first_commit: plan.timeline[0],
                        last_commit: plan.timeline[plan.timeline.len() - 1],
                    },
                    Err(outcome) => outcome,
                })
                .collect();
            return RunSummary {
                run_id,
                repo_count,
                history_days,
                outcomes,
            };
        }

        let semaphore = Arc::new(Semaphore::new(self.parallelism.max(1)));
        let mut outcomes: Vec<Option<RepoOutcome>> = (0..plans.len()).map(|_| None).collect();
        let mut handles = Vec::new();

        for (idx, plan) in plans.into_iter().enumerate() {
            let plan = match plan {
                Ok(plan) => plan,
                Err(outcome) => {
                    outcomes[idx] = Some(outcome);
                    continue;
                }
            };
            let name = plan.concept.name.clone();
            let semaphore = Arc::clone(&semaphore);
            let service = Arc::clone(&self.service);
            let backend = Arc::clone(&self.backend);
            let remote = self.remote.clone();
            let cancel = Arc::clone(&self.cancel);
            let max_step_retries = self.max_step_retries;
            let request = request.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return RepoOutcome::Failed {
                            name: plan.concept.name,
                            reason: "worker pool closed".into(),
                        }
                    }
                };
                if cancel.load(Ordering::SeqCst) {
                    info!(repo = %plan.concept.name, "run cancelled, skipping repository");
                    return RepoOutcome::Failed {
                        name: plan.concept.name,
                        reason: "run cancelled before start".into(),
                    };
                }
                process_repository(plan, service, backend, remote, max_step_retries, &request)
                    .await
            });
            handles.push((idx, name, handle));
        }

        for (idx, name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => RepoOutcome::Failed {
                    name,
                    reason: format!("worker panicked: {}", e),
                },
            };
            outcomes[idx] = Some(outcome);
        }

        let summary = RunSummary {
            run_id,
            repo_count,
            history_days,
            outcomes: outcomes.into_iter().flatten().collect(),
        };
        info!(
            run = %summary.run_id,
            pushed = summary.pushed(),
            local_only = summary.local_only(),
            failed = summary.failed(),
            "run finished"
        );
        summary
    }

    /// Pick a workdir under the workspace, suffixing with the run id when
    /// a previous run left a directory with the same name behind.
    fn unique_workdir(&self, name: &str, run_id: &str) -> PathBuf {
        let base = self.workspace.join(name);
        if !base.exists() {
            return base;
        }
        let suffix: String = run_id.chars().take(8).collect();
        self.workspace.join(format!("{}-{}", name, suffix))
    }
}

async fn process_repository(
    plan: RepositoryPlan,
    service: Arc<dyn GenerationService>,
    backend: Arc<dyn VcsBackend>,
    remote: Option<Arc<dyn RemoteHost>>,
    max_step_retries: u32,
    request: &RunRequest,
) -> RepoOutcome {
    let name = plan.concept.name.clone();
    let mut synthesizer = StepSynthesizer::new(service, plan.concept.clone(), max_step_retries);

    let local = match materialize(&plan, &mut synthesizer, backend.as_ref()).await {
        Ok(local) => local,
        Err(e) => {
            error!(repo = %name, error = %e, "materialization failed");
            return RepoOutcome::Failed {
                name,
                reason: e.to_string(),
            };
        }
    };

    let remote = match remote {
        Some(remote) if !request.local_only => remote,
        _ => {
            return RepoOutcome::LocalOnly {
                name,
                commits: local.commits,
                degraded_steps: local.degraded_steps,
                path: local.path,
                reason: None,
            }
        }
    };

    match push_repository(&plan, &local, remote.as_ref(), request.visibility).await {
        Ok(url) => {
            if request.cleanup_after_push {
                if let Err(e) = std::fs::remove_dir_all(&local.path) {
                    warn!(repo = %name, error = %e, "failed to remove local copy after push");
                }
            }
            RepoOutcome::Pushed {
                name,
                commits: local.commits,
                degraded_steps: local.degraded_steps,
                remote_url: url,
            }
        }
        Err(e) => {
            warn!(repo = %name, error = %e, "push failed, keeping local copy");
            RepoOutcome::LocalOnly {
                name,
                commits: local.commits,
                degraded_steps: local.degraded_steps,
                path: local.path,
                reason: Some(e.to_string()),
            }
        }
    }
}

/// Create the remote repository and push the local history, each with
/// its own backoff. Returns the repository URL.
async fn push_repository(
    plan: &RepositoryPlan,
    local: &LocalRepository,
    remote: &dyn RemoteHost,
    visibility: Visibility,
) -> Result<String, RemoteError> {
    let concept = &plan.concept;
    let mut topics: Vec<String> = concept
        .categories
        .iter()
        .chain(concept.technologies.iter())
        .map(|t| topic_slug(t))
        .collect();
    topics.push(topic_slug(&concept.language));
    topics.retain(|t| !t.is_empty());
    topics.sort();
    topics.dedup();

    let created = with_backoff("create repository", || {
        remote.create_repository(&concept.name, &concept.description, visibility, &topics)
    })
    .await?;
    with_backoff("push", || remote.push(&local.path, &created, &local.branch)).await?;
    Ok(created.url)
}

/// Hosting services accept lowercase alphanumerics and hyphens in topics
fn topic_slug(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
