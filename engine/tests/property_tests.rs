use chrono::{Duration, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use fabricate_engine::config::Config;
use fabricate_engine::persona::{schedule, ConceptPlanner, LanguageHints, NameStyle};

// Whatever the draw, a timeline must stay inside its backdated window
// and strictly increase.
proptest! {
    #[test]
    fn scheduled_timelines_stay_ordered_and_inside_the_window(
        seed in any::<u64>(),
        days in 1..=1825i64,
        commits in 1..=80usize,
    ) {
        let before = Utc::now();
        let mut rng = StdRng::seed_from_u64(seed);
        let timeline = schedule(days, commits, &mut rng).unwrap();
        let after = Utc::now();

        prop_assert_eq!(timeline.len(), commits);

        let floor = before - Duration::days(days);
        for t in &timeline {
            prop_assert!(*t > floor, "timestamp {} precedes the window", t);
            prop_assert!(*t <= after, "timestamp {} lands in the future", t);
        }
        for pair in timeline.windows(2) {
            prop_assert!(pair[0] < pair[1], "timestamps must strictly increase");
        }
    }
}

// Sparse histories never need the collision cascade's end-of-window
// compression, so their commits always land on distinct minutes.
proptest! {
    #[test]
    fn sparse_timelines_use_distinct_minutes(
        seed in any::<u64>(),
        days in 365..=1825i64,
        commits in 2..=37usize,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let timeline = schedule(days, commits, &mut rng).unwrap();
        let minutes: Vec<i64> = timeline.iter().map(|t| t.timestamp() / 60).collect();
        for pair in minutes.windows(2) {
            prop_assert!(pair[0] < pair[1], "two commits share minute {}", pair[0]);
        }
    }
}

// Planned concepts honor commit bounds and language hints, and two
// concepts from the same planner never share a name.
proptest! {
    #[test]
    fn planned_concepts_respect_bounds_and_hints(
        seed in any::<u64>(),
        min in 1..=20u32,
        spread in 0..=20u32,
        style_pick in 0..3usize,
    ) {
        let max = min + spread;
        let style = [NameStyle::Descriptive, NameStyle::Quirky, NameStyle::Technical][style_pick];
        let hints = LanguageHints {
            languages: vec!["python".into()],
            min_commits: Some(min),
            max_commits: Some(max),
            name_style: style,
            ..LanguageHints::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut planner = ConceptPlanner::new();
        let first = planner.plan(&hints, &mut rng);
        let second = planner.plan(&hints, &mut rng);

        prop_assert_eq!(first.language.as_str(), "python");
        prop_assert!(first.commit_count >= min && first.commit_count <= max);
        prop_assert!(second.commit_count >= min && second.commit_count <= max);
        prop_assert_ne!(&first.name, &second.name);
        prop_assert!(!first.description.is_empty());
        prop_assert!(!first.features.is_empty());
        prop_assert!(!first.name.is_empty() && !first.name.contains(' '));
    }
}

// Serializing a configuration to TOML and parsing it back must not lose
// or alter any field.
proptest! {
    #[test]
    fn config_round_trips_through_toml(
        log_level in "error|warn|info|debug|trace",
        visibility in "public|private",
        parallelism in 1..=16usize,
        min_commits in 1..=30u32,
        extra in 0..=40u32,
        max_tokens in 1000..=16000u32,
    ) {
        let baseline = r#"
[core]
workspace = "~/fabricate-workspace"
log_level = "info"
parallelism = 2

[author]
name = "Test Author"
email = "author@example.com"
default_branch = "main"

[generation]
model = "claude-3-5-sonnet-20241022"
max_tokens = 8000

[remote]
default_visibility = "public"

[run]
min_commits = 5
max_commits = 37
"#;
        let mut config: Config = toml::from_str(baseline).expect("baseline config must parse");
        config.core.log_level = log_level;
        config.core.parallelism = parallelism;
        config.remote.default_visibility = visibility;
        config.run.min_commits = min_commits;
        config.run.max_commits = min_commits + extra;
        config.generation.max_tokens = max_tokens;

        let text = toml::to_string(&config).expect("config must serialize");
        let parsed: Config = toml::from_str(&text).expect("serialized config must parse back");

        prop_assert_eq!(&config.core.log_level, &parsed.core.log_level);
        prop_assert_eq!(config.core.parallelism, parsed.core.parallelism);
        prop_assert_eq!(&config.remote.default_visibility, &parsed.remote.default_visibility);
        prop_assert_eq!(config.run.min_commits, parsed.run.min_commits);
        prop_assert_eq!(config.run.max_commits, parsed.run.max_commits);
        prop_assert_eq!(config.generation.max_tokens, parsed.generation.max_tokens);
    }
}
