//! Concept planning
//!
//! Draws a [`ProjectConcept`] from the built-in catalog, honoring caller
//! hints. Planning is deterministic given an RNG and never talks to the
//! generation service, so a dry run can plan hundreds of repositories
//! instantly.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::catalog;
use super::types::{LanguageHints, ProjectConcept};

/// Commit count range used when the caller supplies no bounds
pub const DEFAULT_MIN_COMMITS: u32 = 5;
pub const DEFAULT_MAX_COMMITS: u32 = 37;

/// How many draws to attempt before giving up on fragment-only names and
/// appending a numeric suffix
const NAME_DRAW_ATTEMPTS: usize = 20;

/// Stateful planner. Remembers every name it has handed out so a single
/// run never produces two repositories with the same name.
#[derive(Debug, Default)]
pub struct ConceptPlanner {
    used_names: std::collections::HashSet<String>,
}

impl ConceptPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names already claimed elsewhere (e.g. on the remote host) can be
    /// registered up front so the planner avoids them too.
    pub fn reserve_name(&mut self, name: impl Into<String>) {
        self.used_names.insert(name.into());
    }

    pub fn plan<R: Rng>(&mut self, hints: &LanguageHints, rng: &mut R) -> ProjectConcept {
        let profile = self.pick_language(hints, rng);

        let technologies = if hints.technologies.is_empty() {
            let take = rng.gen_range(2..=3.min(profile.technologies.len()));
            profile
                .technologies
                .choose_multiple(rng, take)
                .map(|t| t.to_string())
                .collect()
        } else {
            hints.technologies.clone()
        };

        let categories: Vec<String> = if hints.categories.is_empty() {
            vec![pick(catalog::CATEGORIES, rng).to_string()]
        } else {
            hints.categories.clone()
        };

        let complexity = pick_complexity(rng);
        let tier = catalog::profile_for(complexity);

        let features: Vec<String> = catalog::FEATURES
            .choose_multiple(rng, 3)
            .map(|f| f.to_string())
            .collect();

        let min = hints.min_commits.unwrap_or(DEFAULT_MIN_COMMITS).max(1);
        let max = hints.max_commits.unwrap_or(DEFAULT_MAX_COMMITS).max(min);
        let commit_count = rng.gen_range(min..=max);

        let name = self.pick_name(hints, rng);
        let category = categories
            .first()
            .map(String::as_str)
            .unwrap_or("utility")
            .to_string();
        let description = format!(
            "A {} {} written in {}.",
            tier.descriptor, category, profile.display
        );

        debug!(name = %name, language = profile.name, commits = commit_count, "planned concept");

        ProjectConcept {
            name,
            description,
            language: profile.name.to_string(),
            technologies,
            categories,
            features,
            complexity,
            commit_count,
        }
    }

    fn pick_language<R: Rng>(
        &self,
        hints: &LanguageHints,
        rng: &mut R,
    ) -> &'static catalog::LanguageProfile {
        if !hints.languages.is_empty() {
            // Unknown hint names fall through to the full catalog rather
            // than failing the whole run.
            let known: Vec<&'static catalog::LanguageProfile> = hints
                .languages
                .iter()
                .filter_map(|l| catalog::language_profile(l))
                .collect();
            if let Some(profile) = known.choose(rng) {
                return *profile;
            }
        }
        pick(catalog::LANGUAGES, rng)
    }

    fn pick_name<R: Rng>(&mut self, hints: &LanguageHints, rng: &mut R) -> String {
        let (heads, tails) = catalog::name_fragments(hints.name_style);
        for _ in 0..NAME_DRAW_ATTEMPTS {
            let candidate = format!("{}-{}", pick(heads, rng), pick(tails, rng));
            if !self.used_names.contains(&candidate) {
                self.used_names.insert(candidate.clone());
                return candidate;
            }
        }
        // Fragment space is exhausted (or unlucky); disambiguate with a
        // numeric suffix.
        loop {
            let candidate = format!(
                "{}-{}-{}",
                pick(heads, rng),
                pick(tails, rng),
                rng.gen_range(100..1000)
            );
            if !self.used_names.contains(&candidate) {
                self.used_names.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

fn pick<'a, T, R: Rng>(pool: &'a [T], rng: &mut R) -> &'a T {
    // Catalog tables are non-empty by construction.
    &pool[rng.gen_range(0..pool.len())]
}

fn pick_complexity<R: Rng>(rng: &mut R) -> super::types::Complexity {
    let roll = rng.gen_range(0..100u32);
    let mut cumulative = 0;
    for profile in catalog::COMPLEXITY_PROFILES {
        cumulative += profile.weight;
        if roll < cumulative {
            return profile.tier;
        }
    }
    catalog::COMPLEXITY_PROFILES[catalog::COMPLEXITY_PROFILES.len() - 1].tier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::NameStyle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn commit_count_uses_defaults_when_unhinted() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let concept = planner.plan(&LanguageHints::default(), &mut rng);
            assert!(concept.commit_count >= DEFAULT_MIN_COMMITS);
            assert!(concept.commit_count <= DEFAULT_MAX_COMMITS);
        }
    }

    #[test]
    fn commit_count_honors_hint_bounds() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(12);
        let hints = LanguageHints {
            min_commits: Some(8),
            max_commits: Some(9),
            ..Default::default()
        };
        for _ in 0..20 {
            let concept = planner.plan(&hints, &mut rng);
            assert!(concept.commit_count == 8 || concept.commit_count == 9);
        }
    }

    #[test]
    fn inverted_commit_bounds_are_reconciled() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(13);
        let hints = LanguageHints {
            min_commits: Some(20),
            max_commits: Some(10),
            ..Default::default()
        };
        let concept = planner.plan(&hints, &mut rng);
        assert_eq!(concept.commit_count, 20);
    }

    #[test]
    fn language_hint_is_honored() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(14);
        let hints = LanguageHints {
            languages: vec!["rust".into()],
            ..Default::default()
        };
        for _ in 0..10 {
            let concept = planner.plan(&hints, &mut rng);
            assert_eq!(concept.language, "rust");
        }
    }

    #[test]
    fn unknown_language_hint_falls_back_to_catalog() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(15);
        let hints = LanguageHints {
            languages: vec!["cobol".into()],
            ..Default::default()
        };
        let concept = planner.plan(&hints, &mut rng);
        assert!(catalog::language_profile(&concept.language).is_some());
    }

    #[test]
    fn supplied_tags_are_carried_verbatim() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(16);
        let hints = LanguageHints {
            technologies: vec!["redis".into(), "grpc".into()],
            categories: vec!["billing".into()],
            ..Default::default()
        };
        let concept = planner.plan(&hints, &mut rng);
        assert_eq!(concept.technologies, vec!["redis", "grpc"]);
        assert_eq!(concept.categories, vec!["billing"]);
    }

    #[test]
    fn names_are_unique_within_a_planner() {
        let mut planner = ConceptPlanner::new();
        let mut rng = StdRng::seed_from_u64(17);
        let mut seen = std::collections::HashSet::new();
        // More draws than the quirky pool has distinct pairs, so the
        // numeric-suffix path gets exercised too.
        let hints = LanguageHints {
            name_style: NameStyle::Quirky,
            ..Default::default()
        };
        for _ in 0..150 {
            let concept = planner.plan(&hints, &mut rng);
            assert!(seen.insert(concept.name.clone()), "duplicate {}", concept.name);
        }
    }

    #[test]
    fn reserved_names_are_avoided() {
        let mut planner = ConceptPlanner::new();
        let (heads, tails) = catalog::name_fragments(NameStyle::Descriptive);
        for head in heads {
            for tail in tails {
                planner.reserve_name(format!("{}-{}", head, tail));
            }
        }
        let mut rng = StdRng::seed_from_u64(18);
        let concept = planner.plan(&LanguageHints::default(), &mut rng);
        // Every plain pair is taken; the name must carry a suffix.
        assert_eq!(concept.name.split('-').count(), 3);
    }
}
