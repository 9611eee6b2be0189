//! crates/emotion_diary_core/src/emotion.rs
//!
//! The fixed catalogue of emotion tags and the guided questions each one asks.

use crate::domain::Answers;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A guided question shown in the write flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    /// Stable key the answer is stored under.
    pub key: &'static str,
    pub prompt: &'static str,
}

/// Expands to a `Question` literal, so catalogue arrays promote to `'static`.
macro_rules! q {
    ($key:literal, $prompt:literal) => {
        Question {
            key: $key,
            prompt: $prompt,
        }
    };
}

/// The emotion a user picks for an entry. Stored as its tag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Lonely,
    Tired,
    Angry,
    Anxious,
    Unfocused,
    Worried,
    Stuck,
    Financial,
    #[serde(rename = "giveup")]
    GiveUp,
    Confidence,
    Unmotivated,
    NoRevenue,
    TooMuchWork,
    LowPassion,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown emotion tag: {0}")]
pub struct UnknownEmotion(pub String);

impl Emotion {
    pub const ALL: [Emotion; 14] = [
        Emotion::Lonely,
        Emotion::Tired,
        Emotion::Angry,
        Emotion::Anxious,
        Emotion::Unfocused,
        Emotion::Worried,
        Emotion::Stuck,
        Emotion::Financial,
        Emotion::GiveUp,
        Emotion::Confidence,
        Emotion::Unmotivated,
        Emotion::NoRevenue,
        Emotion::TooMuchWork,
        Emotion::LowPassion,
    ];

    /// The tag persisted in the `emotion` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Lonely => "lonely",
            Emotion::Tired => "tired",
            Emotion::Angry => "angry",
            Emotion::Anxious => "anxious",
            Emotion::Unfocused => "unfocused",
            Emotion::Worried => "worried",
            Emotion::Stuck => "stuck",
            Emotion::Financial => "financial",
            Emotion::GiveUp => "giveup",
            Emotion::Confidence => "confidence",
            Emotion::Unmotivated => "unmotivated",
            Emotion::NoRevenue => "no_revenue",
            Emotion::TooMuchWork => "too_much_work",
            Emotion::LowPassion => "low_passion",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Lonely => "When I feel lonely",
            Emotion::Tired => "When I'm worn out",
            Emotion::Angry => "When I'm angry",
            Emotion::Anxious => "When I'm anxious",
            Emotion::Unfocused => "When I can't focus",
            Emotion::Worried => "When something weighs on me",
            Emotion::Stuck => "When things don't work out",
            Emotion::Financial => "When money is tight",
            Emotion::GiveUp => "When I want to give up",
            Emotion::Confidence => "When I lack confidence",
            Emotion::Unmotivated => "When I don't want to do anything",
            Emotion::NoRevenue => "When sales don't come in",
            Emotion::TooMuchWork => "When there's too much to do",
            Emotion::LowPassion => "When my passion fades",
        }
    }

    /// The three guided questions for this emotion, in display order.
    pub fn questions(self) -> &'static [Question] {
        match self {
            Emotion::Lonely => &[
                q!("moment", "When did you feel lonely today?"),
                q!("desire", "What did you need most in that moment?"),
                q!("connection", "Is there a person or a way that could ease this loneliness?"),
            ],
            Emotion::Tired => &[
                q!("moment", "When did you feel most worn out today?"),
                q!("source", "What exactly about that situation drained you?"),
                q!("recovery", "What kind of rest could you take right now?"),
            ],
            Emotion::Angry => &[
                q!("moment", "When were you angriest today?"),
                q!("trigger", "What precisely set you off?"),
                q!("release", "How could you express and release this anger in a healthy way?"),
            ],
            Emotion::Anxious => &[
                q!("moment", "When did you feel anxious today?"),
                q!("worry", "What was at the core of that anxiety?"),
                q!("calm", "What small action could calm it down?"),
            ],
            Emotion::Unfocused => &[
                q!("moment", "When couldn't you focus today?"),
                q!("distraction", "What pulled your attention away the most?"),
                q!("focus", "What could you try to get your focus back?"),
            ],
            Emotion::Worried => &[
                q!("concern", "What worry weighed on your mind today?"),
                q!("impact", "Has this worry been coming back lately?"),
                q!("approach", "If a friend had the same worry, what would you tell them?"),
            ],
            Emotion::Stuck => &[
                q!("situation", "What didn't go the way you wanted today?"),
                q!("obstacle", "What do you think caused it?"),
                q!("alternative", "Is there another angle you could approach it from?"),
            ],
            Emotion::Financial => &[
                q!("situation", "When did you feel financial pressure today?"),
                q!("impact", "What feelings does that pressure bring up?"),
                q!("plan", "Do you have a small plan or idea to improve things?"),
            ],
            Emotion::GiveUp => &[
                q!("moment", "When did you feel like giving up today?"),
                q!("reason", "Thinking again, is it truly impossible to improve?"),
                q!("strength", "What would it be like if you really gave up?"),
            ],
            Emotion::Confidence => &[
                q!("situation", "When did your confidence drop today?"),
                q!("doubt", "What did you doubt about yourself then?"),
                q!("strength", "What are the things you are good at?"),
            ],
            Emotion::Unmotivated => &[
                q!("feeling", "Since when today did you stop wanting to do anything?"),
                q!("cause", "What do you think is behind this mood?"),
                q!("small_step", "What is the smallest, simplest thing that could lift your energy?"),
            ],
            Emotion::NoRevenue => &[
                q!("emotion", "What did you feel first when sales didn't come in?"),
                q!("analysis", "Is it about skill, or something else?"),
                q!("improvement", "What is the smallest improvement you could try right now?"),
            ],
            Emotion::TooMuchWork => &[
                q!("burden", "Which task feels most overwhelming right now?"),
                q!("reduce", "Which part of it feels heavy?"),
                q!("priority", "If it has to be done, what part could you start on now?"),
            ],
            Emotion::LowPassion => &[
                q!("doubt", "Have you recently wondered why you are doing this?"),
                q!("initial_reason", "Why did you start this in the first place?"),
                q!("direction", "Has the direction you want changed, or are you just shaken for a moment?"),
            ],
        }
    }

    /// Keys of the questions left unanswered or blank in `answers`.
    pub fn missing_answers(self, answers: &Answers) -> Vec<&'static str> {
        self.questions()
            .iter()
            .filter(|question| {
                answers
                    .get(question.key)
                    .map_or(true, |answer| answer.trim().is_empty())
            })
            .map(|question| question.key)
            .collect()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == s)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_emotion_asks_three_distinct_questions() {
        for emotion in Emotion::ALL {
            let keys: Vec<_> = emotion.questions().iter().map(|q| q.key).collect();
            assert_eq!(keys.len(), 3, "{emotion}");
            let mut unique = keys.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), 3, "{emotion} repeats a question key");
        }
    }

    #[test]
    fn tags_parse_back_and_match_serde() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.as_str().parse::<Emotion>(), Ok(emotion));
            let json = serde_json::to_string(&emotion).unwrap();
            assert_eq!(json, format!("\"{}\"", emotion.as_str()));
        }
        assert!("sleepy".parse::<Emotion>().is_err());
    }

    #[test]
    fn blank_answers_count_as_missing() {
        let mut answers = Answers::new();
        answers.insert("moment".into(), "after the meeting".into());
        answers.insert("source".into(), "   ".into());

        assert_eq!(
            Emotion::Tired.missing_answers(&answers),
            vec!["source", "recovery"]
        );
    }
}
