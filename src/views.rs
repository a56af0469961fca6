use crate::models::{ActivityEntry, Document, Goal};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedReward {
    pub index: usize,
    pub name: String,
    pub activity_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReward {
    pub index: usize,
    pub name: String,
    pub activity_count: usize,
    pub progress_percent: f64,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardPartition {
    pub target: u32,
    pub earned: Vec<EarnedReward>,
    pub in_progress: Vec<ProgressReward>,
}

/// Splits rewards into earned and in-progress against the global target.
///
/// Earned rewards keep insertion order. In-progress rewards are sorted by
/// descending progress; ties keep insertion order.
pub fn partition_rewards(doc: &Document) -> RewardPartition {
    let target = doc.target.max(1) as usize;
    let mut earned = Vec::new();
    let mut in_progress = Vec::new();

    for (index, reward) in doc.rewards.iter().enumerate() {
        let activity_count = reward.activity.len();
        if activity_count >= target {
            earned.push(EarnedReward {
                index,
                name: reward.reward_name.clone(),
                activity_count,
            });
        } else {
            in_progress.push(ProgressReward {
                index,
                name: reward.reward_name.clone(),
                activity_count,
                progress_percent: progress_percent(activity_count, target),
                remaining: target - activity_count,
            });
        }
    }

    in_progress.sort_by(|a, b| b.progress_percent.total_cmp(&a.progress_percent));

    RewardPartition {
        target: doc.target,
        earned,
        in_progress,
    }
}

fn progress_percent(count: usize, target: usize) -> f64 {
    let raw = count as f64 / target as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

pub fn are_required_goals_completed_today(doc: &Document, reward_index: usize) -> bool {
    are_required_goals_completed_on(Local::now().date_naive(), doc, reward_index)
}

/// True when every required goal has an entry for `day` on this reward.
///
/// An unknown reward index never satisfies the gate.
pub fn are_required_goals_completed_on(day: NaiveDate, doc: &Document, reward_index: usize) -> bool {
    let Some(reward) = doc.rewards.get(reward_index) else {
        return false;
    };

    doc.goals
        .iter()
        .filter(|goal| goal.required)
        .all(|goal| {
            let expected = ActivityEntry::format(&goal.name, day);
            reward.activity.iter().any(|entry| *entry == expected)
        })
}

pub fn eligible_goals_for_logging(doc: &Document, reward_index: usize) -> Option<Vec<&Goal>> {
    eligible_goals_on(Local::now().date_naive(), doc, reward_index)
}

/// Goals that may be logged against a reward on `day`, or `None` for an
/// unknown reward.
pub fn eligible_goals_on(day: NaiveDate, doc: &Document, reward_index: usize) -> Option<Vec<&Goal>> {
    doc.rewards.get(reward_index)?;

    let unlocked = are_required_goals_completed_on(day, doc, reward_index);
    Some(
        doc.goals
            .iter()
            .filter(|goal| unlocked || goal.required)
            .collect(),
    )
}

/// Parsed activity entries of one reward, oldest first.
pub fn activity_history(doc: &Document, reward_index: usize) -> Option<Vec<ActivityEntry>> {
    let reward = doc.rewards.get(reward_index)?;
    Some(reward.activity.iter().map(|text| ActivityEntry::parse(text)).collect())
}
