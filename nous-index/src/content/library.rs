//! Curated psychoeducation articles served by the chat flows.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single article as authored: stable id, title, body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
}

impl Article {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// In-memory article set. Also the fallback corpus when the index fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentLibrary {
    articles: Vec<Article>,
}

impl ContentLibrary {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// The articles shipped with the application
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_ARTICLES
                .iter()
                .map(|(id, title, body)| Article::new(*id, *title, *body))
                .collect(),
        )
    }

    /// Load a JSON array of `{id, title, body}` objects
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let articles: Vec<Article> = serde_json::from_str(&source)?;
        Ok(Self::new(articles))
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

const BUILTIN_ARTICLES: &[(&str, &str, &str)] = &[
    (
        "cbt_thought_records",
        "Thought Records",
        "A thought record slows down an automatic reaction so it can be examined. \
         Write down the situation, the emotion and its intensity, and the automatic \
         thought that came with it. Then list evidence for and against the thought \
         and write a more balanced alternative. Rate the emotion again afterwards; \
         a small drop is a meaningful result.",
    ),
    (
        "cbt_cognitive_distortions",
        "Common Cognitive Distortions",
        "Cognitive distortions are habitual thinking errors. All-or-nothing thinking \
         sees situations in only two categories. Catastrophizing jumps to the worst \
         outcome. Mind reading assumes we know what others think. Should statements \
         turn preferences into rigid rules. Naming the distortion is the first step \
         toward questioning it.",
    ),
    (
        "cbt_behavioral_activation",
        "Behavioral Activation",
        "Low mood often leads to withdrawal, and withdrawal deepens low mood. \
         Behavioral activation breaks the cycle by scheduling small, concrete \
         activities that bring pleasure or mastery, even before motivation returns. \
         Track each activity and how your mood shifted to see the connection.",
    ),
    (
        "dbt_tipp",
        "TIPP Skills for Intense Emotions",
        "TIPP is a DBT distress tolerance skill for moments when emotions feel \
         overwhelming. Temperature: cool your face with cold water. Intense exercise: \
         a few minutes of vigorous movement. Paced breathing: breathe out longer than \
         you breathe in. Paired muscle relaxation: tense and release muscle groups \
         while exhaling.",
    ),
    (
        "dbt_wise_mind",
        "Wise Mind",
        "DBT describes three states of mind. Emotion mind is driven by feelings, \
         reasonable mind by logic and facts. Wise mind is the overlap, where both \
         are honored. Pause, take a breath, and ask what wise mind would do here; \
         the answer is often quieter than the first reaction.",
    ),
    (
        "dbt_opposite_action",
        "Opposite Action",
        "When an emotion does not fit the facts, or acting on it will not help, \
         act opposite to its urge. If fear says avoid, approach gently. If anger \
         says attack, step away and be kind. If sadness says withdraw, reach out. \
         Do it fully, including posture and tone of voice.",
    ),
    (
        "act_defusion",
        "Cognitive Defusion",
        "ACT treats thoughts as events in the mind rather than commands. Defusion \
         techniques create distance: prefix a thought with 'I am having the thought \
         that', say it in a silly voice, or thank your mind for it. The goal is not \
         to make the thought disappear but to loosen its grip on what you do next.",
    ),
    (
        "act_values",
        "Clarifying Your Values",
        "Values are chosen directions, not goals to complete. Consider areas such \
         as relationships, work, health, and growth, and describe how you want to \
         act in each. Then choose one small committed action this week that moves \
         toward a value, even alongside difficult feelings.",
    ),
    (
        "sleep_hygiene",
        "Sleep Hygiene Basics",
        "Keep a consistent wake time, even on weekends. Reserve the bed for sleep, \
         limit caffeine after midday, and dim screens in the hour before bed. If \
         sleep does not come within about twenty minutes, get up and do something \
         calm until you feel sleepy again.",
    ),
    (
        "grounding_54321",
        "5-4-3-2-1 Grounding",
        "Grounding brings attention back to the present during anxiety or panic. \
         Name five things you can see, four you can touch, three you can hear, two \
         you can smell, and one you can taste. Move slowly and describe each one in \
         detail.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_ids_unique_and_nonempty() {
        let library = ContentLibrary::builtin();
        assert!(!library.is_empty());

        let ids: HashSet<&str> = library.articles().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), library.len());
        assert!(
            library
                .articles()
                .iter()
                .all(|a| !a.title.is_empty() && !a.body.is_empty())
        );
        assert_eq!(
            library.get("dbt_tipp").map(|a| a.title.as_str()),
            Some("TIPP Skills for Intense Emotions")
        );
        assert!(library.get("nope").is_none());
    }

    #[test]
    fn test_from_json_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"[{"id": "x1", "title": "Box Breathing", "body": "In four, hold four, out four."}]"#,
        )?;

        let library = ContentLibrary::from_json_file(&path)?;
        assert_eq!(
            library.articles(),
            &[Article::new("x1", "Box Breathing", "In four, hold four, out four.")]
        );

        std::fs::write(&path, "{not json")?;
        assert!(ContentLibrary::from_json_file(&path).is_err());
        Ok(())
    }
}
