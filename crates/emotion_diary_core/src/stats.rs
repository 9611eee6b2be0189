//! crates/emotion_diary_core/src/stats.rs
//!
//! Emotion frequency aggregation over a stats range.

use crate::domain::StatsPoint;
use crate::emotion::Emotion;
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;

/// Number of emotions shown on the frequency chart.
pub const CHART_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Week,
    Month,
}

impl StatsPeriod {
    /// Divisor used for the daily average.
    pub fn days(self) -> u32 {
        match self {
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
        }
    }

    /// First day of the period ending on `today`: one week or one calendar
    /// month back.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        let start = match self {
            StatsPeriod::Week => today.checked_sub_days(Days::new(7)),
            StatsPeriod::Month => today.checked_sub_months(Months::new(1)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmotionCount {
    pub emotion: Emotion,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub emotion: Emotion,
    pub percentage: u32,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmotionStats {
    /// Sorted by descending count; equal counts keep first-seen order.
    pub counts: Vec<EmotionCount>,
    pub total: usize,
}

impl EmotionStats {
    pub fn from_points(points: &[StatsPoint]) -> Self {
        let mut counts: Vec<EmotionCount> = Vec::new();
        for point in points {
            match counts.iter_mut().find(|c| c.emotion == point.emotion) {
                Some(existing) => existing.count += 1,
                None => counts.push(EmotionCount {
                    emotion: point.emotion,
                    count: 1,
                }),
            }
        }
        // sort_by is stable
        counts.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            total: points.len(),
            counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// The chart rows.
    pub fn top(&self) -> &[EmotionCount] {
        &self.counts[..self.counts.len().min(CHART_LIMIT)]
    }

    pub fn most_frequent(&self) -> Option<EmotionCount> {
        self.counts.first().copied()
    }

    pub fn insight(&self) -> Option<Insight> {
        let top = self.most_frequent()?;
        let percentage = (top.count as f64 / self.total as f64 * 100.0).round() as u32;
        Some(Insight {
            emotion: top.emotion,
            percentage,
            message: insight_message(top.emotion),
        })
    }

    pub fn daily_average(&self, period: StatsPeriod) -> u32 {
        (self.total as f64 / f64::from(period.days())).round() as u32
    }
}

fn insight_message(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Lonely => "Loneliness shows up often. Spending time with people close to you, or meeting someone new, might help.",
        Emotion::Tired => "You have been feeling worn out a lot. Rest, sleep and a little more kindness toward yourself could help.",
        Emotion::Angry => "Anger comes up frequently. Try letting it out in healthy ways such as exercise or writing.",
        Emotion::Anxious => "Anxiety appears often. Breathe deeply, focus on the present, and try meditation or a walk.",
        Emotion::Unfocused => "Trouble focusing is common lately. Tidy your workspace and take short breaks more often.",
        Emotion::Worried => "You seem to have a lot on your mind. Talk to someone you trust or sort your thoughts out in writing.",
        Emotion::Stuck => "Things have not been going your way. A different angle, or a little distance, can help.",
        Emotion::Financial => "Money has been a frequent worry. A budget and small savings are a good place to start.",
        Emotion::GiveUp => "You often feel like giving up. Acknowledge how far you have come and celebrate small wins.",
        Emotion::Confidence => "Confidence has been low. Take time to look back at your strengths and achievements.",
        Emotion::Unmotivated => "You often feel listless. Start with something very small and give yourself time.",
        Emotion::NoRevenue => "Sales have been slow a lot. Listen to customer feedback and start with small improvements.",
        Emotion::TooMuchWork => "Work overload is frequent. Set priorities, delegate, or adjust your schedule.",
        Emotion::LowPassion => "Your passion has been dipping. Remember why you started and look for small wins.",
    }
}
