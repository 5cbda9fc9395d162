//! Parsed epics and the user stories they own
use serde::{Deserialize, Serialize};

/// A single story line from the input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    /// Short label, synthesized from the description
    pub title: String,

    /// The story text with any priority and story point tokens removed
    pub description: String,

    /// The word inside the first `[Word]` token, if any
    pub priority: Option<String>,

    /// The number inside the first `{N}` token, if any
    pub story_points: Option<u64>,
}

/// A named group of stories, introduced by an `EPIC:` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    /// Text following the header marker. May be empty
    pub title: String,

    /// Stories in the order they appear in the document
    pub stories: Vec<UserStory>,
}

impl Epic {
    pub fn story_count(&self) -> usize {
        self.stories.len()
    }

    /// Sum of the story points of every story that carries an estimate
    pub fn total_points(&self) -> u64 {
        self.stories
            .iter()
            .filter_map(|s| s.story_points)
            .fold(0, u64::saturating_add)
    }

    /// Number of stories tagged with exactly the given priority
    pub fn count_with_priority(&self, priority: &str) -> usize {
        self.stories
            .iter()
            .filter(|s| s.priority.as_deref() == Some(priority))
            .count()
    }
}

/// Total number of stories across all of the given epics
pub fn total_stories(epics: &[Epic]) -> usize {
    epics.iter().map(Epic::story_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(priority: Option<&str>, points: Option<u64>) -> UserStory {
        UserStory {
            title: "t".to_string(),
            description: "d".to_string(),
            priority: priority.map(str::to_string),
            story_points: points,
        }
    }

    #[test]
    fn epic_totals() {
        let epic = Epic {
            title: "Export".to_string(),
            stories: vec![
                story(Some("High"), Some(5)),
                story(Some("Low"), None),
                story(Some("High"), Some(3)),
            ],
        };
        assert_eq!(epic.story_count(), 3);
        assert_eq!(epic.total_points(), 8);
        assert_eq!(epic.count_with_priority("High"), 2);
        assert_eq!(epic.count_with_priority("Medium"), 0);
        assert_eq!(total_stories(&[epic.clone(), epic]), 6);
    }

    #[test]
    fn huge_totals_saturate() {
        let epic = Epic {
            title: "Big".to_string(),
            stories: vec![story(None, Some(u64::MAX)), story(None, Some(2))],
        };
        assert_eq!(epic.total_points(), u64::MAX);
    }
}
