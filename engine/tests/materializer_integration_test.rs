//! Integration tests for history materialization
//!
//! Drives a scripted generation service and the real git backend
//! together, then verifies the produced repository with libgit2.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use fabricate_engine::generation::{
    FileChange, GeneratedChange, GenerationError, GenerationRequest, GenerationService,
};
use fabricate_engine::persona::{
    materialize, schedule, Complexity, ProjectConcept, RepositoryPlan, StepSynthesizer,
};
use fabricate_engine::vcs::git::GitBackend;
use fabricate_engine::vcs::VcsError;

struct ScriptedService {
    responses: Mutex<VecDeque<Result<GeneratedChange, GenerationError>>>,
}

impl ScriptedService {
    fn new(responses: Vec<Result<GeneratedChange, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _request: GenerationRequest<'_>,
    ) -> Result<GeneratedChange, GenerationError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Unavailable("script exhausted".into())))
    }
}

fn concept(commits: u32) -> ProjectConcept {
    ProjectConcept {
        name: "log-sifter".into(),
        description: "A small log analysis tool written in Python.".into(),
        language: "python".into(),
        technologies: vec!["argparse".into()],
        categories: vec!["cli tool".into()],
        features: vec!["filter entries by level".into()],
        complexity: Complexity::Low,
        commit_count: commits,
    }
}

fn change(message: &str, files: Vec<FileChange>) -> Result<GeneratedChange, GenerationError> {
    Ok(GeneratedChange {
        message: message.into(),
        files,
    })
}

#[tokio::test]
async fn materializes_a_complete_history_with_backdated_timestamps() {
    let workspace = TempDir::new().unwrap();
    let concept = concept(10);
    let started = Utc::now();
    let mut rng = StdRng::seed_from_u64(11);
    let timeline = schedule(30, 10, &mut rng).unwrap();
    assert_eq!(timeline.len(), 10);
    for t in &timeline {
        assert!(*t > started - Duration::days(30));
        assert!(*t <= Utc::now());
    }
    for pair in timeline.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    let plan = RepositoryPlan {
        concept: concept.clone(),
        timeline: timeline.clone(),
        workdir: workspace.path().join("log-sifter"),
    };

    let service = ScriptedService::new(vec![
        change(
            "Initial commit",
            vec![
                FileChange::write("README.md", "# log-sifter\n"),
                FileChange::write("main.py", "print('v1')\n"),
            ],
        ),
        change(
            "feat: add level filter",
            vec![
                FileChange::write("filters.py", "LEVELS = ['info', 'warn']\n"),
                FileChange::write("main.py", "print('v2')\n"),
            ],
        ),
        change(
            "test: cover the level filter",
            vec![FileChange::write(
                "tests/test_filters.py",
                "def test_levels():\n    assert True\n",
            )],
        ),
        change(
            "fix: accept uppercase levels",
            vec![FileChange::write("filters.py", "LEVELS = ['INFO', 'WARN']\n")],
        ),
        change(
            "refactor: fold filters into main",
            vec![
                FileChange::delete("filters.py"),
                FileChange::write("main.py", "print('v3')\n"),
            ],
        ),
        change(
            "docs: describe usage",
            vec![FileChange::write("docs/usage.md", "Run main.py\n")],
        ),
        change(
            "feat: add json output",
            vec![FileChange::write("output.py", "import json\n")],
        ),
        change(
            "fix: flush output buffers",
            vec![FileChange::write("output.py", "import json\nimport sys\n")],
        ),
        change(
            "chore: add requirements file",
            vec![FileChange::write("requirements.txt", "argparse\n")],
        ),
        change(
            "docs: expand the README",
            vec![FileChange::write(
                "README.md",
                "# log-sifter\n\nFilter logs by level.\n",
            )],
        ),
    ]);
    let mut synthesizer = StepSynthesizer::new(service, concept, 2);
    let backend = GitBackend::new("Fabricate", "fabricate@localhost", "main");

    let local = materialize(&plan, &mut synthesizer, &backend).await.unwrap();
    assert_eq!(local.commits, 10);
    assert_eq!(local.degraded_steps, 0);
    assert_eq!(local.branch, "main");

    let repo = git2::Repository::open(&local.path).unwrap();
    assert_eq!(repo.head().unwrap().shorthand(), Some("main"));

    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
        .unwrap();
    let ids: Vec<git2::Oid> = walk.map(|id| id.unwrap()).collect();
    assert_eq!(ids.len(), 10);

    // Every commit carries its scheduled timestamp as both author and
    // committer date, and the chain is strictly linear.
    for (i, id) in ids.iter().enumerate() {
        let commit = repo.find_commit(*id).unwrap();
        assert_eq!(commit.author().when().seconds(), timeline[i].timestamp());
        assert_eq!(commit.committer().when().seconds(), timeline[i].timestamp());
        assert_eq!(commit.author().name(), Some("Fabricate"));
        if i == 0 {
            assert_eq!(commit.parent_count(), 0);
        } else {
            assert_eq!(commit.parent_count(), 1);
            assert_eq!(commit.parent_id(0).unwrap(), ids[i - 1]);
        }
    }

    let first = repo.find_commit(ids[0]).unwrap();
    assert!(first.message().unwrap().starts_with("Initial commit"));

    let last = repo.find_commit(ids[9]).unwrap();
    assert!(last.message().unwrap().starts_with("docs: expand the README"));
    let tree = last.tree().unwrap();
    assert!(tree.get_name("README.md").is_some());
    assert!(tree.get_name("main.py").is_some());
    assert!(tree.get_name("output.py").is_some());
    assert!(tree.get_name("requirements.txt").is_some());
    assert!(tree.get_name("filters.py").is_none());
    assert!(tree.get_path(std::path::Path::new("docs/usage.md")).is_ok());
    assert!(tree
        .get_path(std::path::Path::new("tests/test_filters.py"))
        .is_ok());

    // The working tree matches the final snapshot too.
    assert!(!local.path.join("filters.py").exists());
    assert_eq!(
        std::fs::read_to_string(local.path.join("main.py")).unwrap(),
        "print('v3')\n"
    );
    assert_eq!(
        std::fs::read_to_string(local.path.join("output.py")).unwrap(),
        "import json\nimport sys\n"
    );
    let readme = std::fs::read_to_string(local.path.join("README.md")).unwrap();
    assert!(readme.contains("Filter logs by level."));
}

#[tokio::test]
async fn exhausted_generation_still_produces_a_full_history() {
    let workspace = TempDir::new().unwrap();
    let concept = concept(6);
    let mut rng = StdRng::seed_from_u64(23);
    let timeline = schedule(30, 6, &mut rng).unwrap();
    let plan = RepositoryPlan {
        concept: concept.clone(),
        timeline,
        workdir: workspace.path().join("log-sifter"),
    };

    // The third step fails on every attempt (1 try + 1 retry), forcing a
    // substitute; the remaining steps succeed normally.
    let service = ScriptedService::new(vec![
        change(
            "Initial commit",
            vec![FileChange::write("README.md", "# log-sifter\n")],
        ),
        change(
            "feat: add level filter",
            vec![FileChange::write("filters.py", "LEVELS = ['info']\n")],
        ),
        Err(GenerationError::Unavailable("overloaded".into())),
        Err(GenerationError::Unavailable("overloaded".into())),
        change(
            "feat: add parser",
            vec![FileChange::write("parser.py", "pass\n")],
        ),
        change(
            "test: cover the parser",
            vec![FileChange::write(
                "tests/test_parser.py",
                "def test_parse():\n    assert True\n",
            )],
        ),
        change(
            "docs: describe usage",
            vec![FileChange::write("docs/usage.md", "Run main.py\n")],
        ),
    ]);
    let mut synthesizer = StepSynthesizer::new(service, concept, 1);
    let backend = GitBackend::new("Fabricate", "fabricate@localhost", "main");

    let local = materialize(&plan, &mut synthesizer, &backend).await.unwrap();
    assert_eq!(local.commits, 6);
    assert_eq!(local.degraded_steps, 1);

    // The substitute step appended a maintenance note to the README; the
    // steps after it continued from the degraded snapshot.
    let readme = std::fs::read_to_string(local.path.join("README.md")).unwrap();
    assert!(readme.contains("# log-sifter"));
    assert!(readme.contains("Revision 2 maintenance pass."));
    assert!(local.path.join("parser.py").exists());

    let repo = git2::Repository::open(&local.path).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    assert_eq!(walk.count(), 6);
}

#[tokio::test]
async fn timeline_length_mismatch_is_rejected_before_any_disk_writes() {
    let workspace = TempDir::new().unwrap();
    let concept = concept(3);
    let mut rng = StdRng::seed_from_u64(5);
    let workdir = workspace.path().join("log-sifter");
    let plan = RepositoryPlan {
        concept: concept.clone(),
        // Two timestamps for three planned commits.
        timeline: schedule(30, 2, &mut rng).unwrap(),
        workdir: workdir.clone(),
    };

    let service = ScriptedService::new(vec![]);
    let mut synthesizer = StepSynthesizer::new(service, concept, 0);
    let backend = GitBackend::new("Fabricate", "fabricate@localhost", "main");

    let err = materialize(&plan, &mut synthesizer, &backend)
        .await
        .unwrap_err();
    assert!(matches!(err, VcsError::Plan(_)));
    assert!(!workdir.exists());
}
