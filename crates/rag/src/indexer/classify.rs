//! Heuristic provenance tagging from file paths.

use crate::types::ChunkKind;

/// Maps a file path to a [`ChunkKind`].
///
/// Any `Fn(&str) -> ChunkKind` closure is a classifier, so a smarter
/// implementation can be dropped in without touching the store or cache.
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &str) -> ChunkKind;
}

impl<F> Classifier for F
where
    F: Fn(&str) -> ChunkKind + Send + Sync,
{
    fn classify(&self, path: &str) -> ChunkKind {
        self(path)
    }
}

/// Substring classifier over the lowercased path. First match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathClassifier;

const RULES: &[(&[&str], ChunkKind)] = &[
    (&["controller"], ChunkKind::Controller),
    (&["service"], ChunkKind::Service),
    (&["component", ".tsx", ".jsx"], ChunkKind::Component),
    (&["schema", "prisma", ".sql", "dto", "model"], ChunkKind::Schema),
    (&["config", ".json", ".yaml", ".yml", ".env"], ChunkKind::Config),
    (&["test", "spec"], ChunkKind::Test),
];

impl Classifier for PathClassifier {
    fn classify(&self, path: &str) -> ChunkKind {
        let path = path.replace('\\', "/").to_lowercase();

        RULES
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| path.contains(needle)))
            .map(|(_, kind)| *kind)
            .unwrap_or(ChunkKind::Code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_classifier_tags() {
        let classifier = PathClassifier;
        let cases = [
            ("src/projects/projects.controller.ts", ChunkKind::Controller),
            ("src/projects/projects.service.ts", ChunkKind::Service),
            ("web/components/Gallery.tsx", ChunkKind::Component),
            ("prisma/schema.prisma", ChunkKind::Schema),
            ("src/projects/dto/create-project.dto.ts", ChunkKind::Schema),
            ("migrations/001_init.sql", ChunkKind::Schema),
            ("tsconfig.json", ChunkKind::Config),
            ("deploy/values.yml", ChunkKind::Config),
            ("test/e2e/app.e2e.ts", ChunkKind::Test),
            ("src/utils/slugify.ts", ChunkKind::Code),
        ];

        for (path, expected) in cases {
            assert_eq!(classifier.classify(path), expected, "{}", path);
        }
    }

    #[test]
    fn test_earlier_rules_win() {
        // "service" beats "spec" and "controller" beats "service"
        assert_eq!(
            PathClassifier.classify("src/auth/auth.service.spec.ts"),
            ChunkKind::Service
        );
        assert_eq!(
            PathClassifier.classify("src/services/billing.controller.ts"),
            ChunkKind::Controller
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(PathClassifier.classify("SRC/UserService.TS"), ChunkKind::Service);
    }

    #[test]
    fn test_closure_is_a_classifier() {
        let everything_is_docs = |_: &str| ChunkKind::Document;
        assert_eq!(everything_is_docs.classify("src/main.rs"), ChunkKind::Document);
    }
}
