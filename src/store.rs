use crate::backend::KeyValueStore;
use crate::errors::StoreError;
use crate::models::{
    goals_are_well_formed, migrate_legacy_goals, normalize_name, ActivityEntry, Document, Goal,
    Reward, DEFAULT_TARGET,
};
use crate::views::eligible_goals_on;
use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Key the whole document is persisted under.
pub const STORAGE_KEY: &str = "rewardTrackerData";

/// Sole owner of the persisted document.
///
/// Every mutation is a read-modify-write against the backend: the document is
/// loaded, changed in memory and written back in full. A rejected operation
/// writes nothing. Nothing derived (progress, earned state) is ever stored.
#[derive(Debug)]
pub struct DocumentStore<B> {
    backend: B,
}

impl<B: KeyValueStore> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads, migrates and validates the stored document, falling back to the
    /// default document when nothing usable is stored.
    pub fn initialize(&mut self) -> Result<Document, StoreError> {
        let raw = self.backend.get(STORAGE_KEY)?;
        let doc = match raw.as_deref() {
            None => {
                info!("first load, storing default document");
                Document::default()
            }
            Some(text) => recover_document(text),
        };

        let encoded = serde_json::to_string(&doc)?;
        if raw.as_deref() != Some(encoded.as_str()) {
            self.write_encoded(&encoded)?;
        }
        Ok(doc)
    }

    /// The stored document, or `None` when absent or unreadable.
    pub fn get_document(&self) -> Option<Document> {
        let raw = match self.backend.get(STORAGE_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                error!("failed to read document: {err}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!("stored document is unreadable: {err}");
                None
            }
        }
    }

    pub fn replace_document(&mut self, doc: &Document) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(doc)?;
        self.write_encoded(&encoded)
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.get_document().map(|doc| doc.goals).unwrap_or_default()
    }

    pub fn rewards(&self) -> Vec<Reward> {
        self.get_document().map(|doc| doc.rewards).unwrap_or_default()
    }

    pub fn target(&self) -> u32 {
        self.get_document()
            .map(|doc| doc.target)
            .unwrap_or(DEFAULT_TARGET)
    }

    pub fn add_goal(&mut self, name: &str, required: bool) -> Result<(), StoreError> {
        let goal = Goal::new(normalize_name(name, "goal name")?, required);
        self.modify(|doc| {
            if doc.goals.iter().any(|existing| existing.same_as(&goal)) {
                return Err(StoreError::DuplicateGoal(goal.name.clone()));
            }
            doc.goals.push(goal);
            Ok(())
        })
    }

    /// Rewrites the goal and carries a name change into every activity entry
    /// logged under the old name.
    pub fn update_goal(
        &mut self,
        index: usize,
        new_name: &str,
        new_required: bool,
    ) -> Result<(), StoreError> {
        let updated = Goal::new(normalize_name(new_name, "goal name")?, new_required);
        self.modify(|doc| {
            let old_name = doc
                .goals
                .get(index)
                .map(|goal| goal.name.clone())
                .ok_or(StoreError::GoalNotFound(index))?;

            let clash = doc
                .goals
                .iter()
                .enumerate()
                .any(|(other, goal)| other != index && goal.same_as(&updated));
            if clash {
                return Err(StoreError::DuplicateGoal(updated.name.clone()));
            }

            if old_name != updated.name {
                rename_activity(doc, &old_name, &updated.name);
            }
            doc.goals[index] = updated;
            Ok(())
        })
    }

    /// Removes the goal and every activity entry logged under its name.
    pub fn delete_goal(&mut self, index: usize) -> Result<Goal, StoreError> {
        self.modify(|doc| {
            if index >= doc.goals.len() {
                return Err(StoreError::GoalNotFound(index));
            }
            let removed = doc.goals.remove(index);
            let prefix = ActivityEntry::prefix(&removed.name);
            for reward in &mut doc.rewards {
                reward.activity.retain(|entry| !entry.starts_with(&prefix));
            }
            Ok(removed)
        })
    }

    pub fn add_reward(&mut self, name: &str) -> Result<usize, StoreError> {
        let name = normalize_name(name, "reward name")?;
        self.modify(|doc| {
            ensure_reward_name_free(doc, &name, None)?;
            doc.rewards.push(Reward::new(name));
            Ok(doc.rewards.len() - 1)
        })
    }

    pub fn update_reward(&mut self, index: usize, new_name: &str) -> Result<(), StoreError> {
        let new_name = normalize_name(new_name, "reward name")?;
        self.modify(|doc| {
            if index >= doc.rewards.len() {
                return Err(StoreError::RewardNotFound(index));
            }
            ensure_reward_name_free(doc, &new_name, Some(index))?;
            doc.rewards[index].reward_name = new_name;
            Ok(())
        })
    }

    /// Removes the reward with its history and hands it back, so a caller
    /// can offer a short-lived undo through [`DocumentStore::restore_reward`].
    pub fn delete_reward(&mut self, index: usize) -> Result<Reward, StoreError> {
        self.modify(|doc| {
            if index >= doc.rewards.len() {
                return Err(StoreError::RewardNotFound(index));
            }
            Ok(doc.rewards.remove(index))
        })
    }

    /// Appends a previously deleted reward, activity history included.
    pub fn restore_reward(&mut self, reward: Reward) -> Result<usize, StoreError> {
        let name = normalize_name(&reward.reward_name, "reward name")?;
        self.modify(|doc| {
            ensure_reward_name_free(doc, &name, None)?;
            doc.rewards.push(Reward {
                reward_name: name,
                activity: reward.activity,
            });
            Ok(doc.rewards.len() - 1)
        })
    }

    pub fn add_activity_to_reward(
        &mut self,
        reward_index: usize,
        activity: &str,
    ) -> Result<(), StoreError> {
        self.modify(|doc| {
            let reward = doc
                .rewards
                .get_mut(reward_index)
                .ok_or(StoreError::RewardNotFound(reward_index))?;
            reward.activity.push(activity.to_string());
            Ok(())
        })
    }

    pub fn remove_activity_from_reward(
        &mut self,
        reward_index: usize,
        activity_index: usize,
    ) -> Result<String, StoreError> {
        self.modify(|doc| {
            let reward = doc
                .rewards
                .get_mut(reward_index)
                .ok_or(StoreError::RewardNotFound(reward_index))?;
            if activity_index >= reward.activity.len() {
                return Err(StoreError::ActivityNotFound {
                    reward: reward_index,
                    activity: activity_index,
                });
            }
            Ok(reward.activity.remove(activity_index))
        })
    }

    /// Removes the first entry equal to `text`; used to undo a fresh log.
    pub fn remove_activity_entry(
        &mut self,
        reward_index: usize,
        text: &str,
    ) -> Result<usize, StoreError> {
        self.modify(|doc| {
            let reward = doc
                .rewards
                .get_mut(reward_index)
                .ok_or(StoreError::RewardNotFound(reward_index))?;
            let position = reward
                .activity
                .iter()
                .position(|entry| entry == text)
                .ok_or_else(|| StoreError::ActivityTextNotFound(text.to_string()))?;
            reward.activity.remove(position);
            Ok(position)
        })
    }

    pub fn log_completion_today(
        &mut self,
        reward_index: usize,
        goal_name: &str,
    ) -> Result<String, StoreError> {
        self.record_completion(reward_index, goal_name, Local::now().date_naive())
    }

    /// Logs `goal_name` as completed on `day` against a reward, honouring the
    /// required-goal gate for that day.
    pub fn record_completion(
        &mut self,
        reward_index: usize,
        goal_name: &str,
        day: NaiveDate,
    ) -> Result<String, StoreError> {
        let goal_name = goal_name.trim();
        self.modify(|doc| {
            if !doc.goals.iter().any(|goal| goal.name == goal_name) {
                return Err(StoreError::GoalNotFoundByName(goal_name.to_string()));
            }

            let eligible = eligible_goals_on(day, doc, reward_index)
                .ok_or(StoreError::RewardNotFound(reward_index))?;
            if !eligible.iter().any(|goal| goal.name == goal_name) {
                return Err(StoreError::GoalNotEligible(goal_name.to_string()));
            }

            let entry = ActivityEntry::format(goal_name, day);
            doc.rewards[reward_index].activity.push(entry.clone());
            Ok(entry)
        })
    }

    pub fn update_target(&mut self, target: u32) -> Result<(), StoreError> {
        if target < 1 {
            warn!("rejected target {target}");
            return Err(StoreError::InvalidValue(
                "target must be a positive integer".to_string(),
            ));
        }
        self.modify(|doc| {
            doc.target = target;
            Ok(())
        })
    }

    /// Drops the persisted document; the next `initialize` starts fresh.
    pub fn reset_to_defaults(&mut self) -> Result<(), StoreError> {
        self.backend.remove(STORAGE_KEY).inspect_err(|err| {
            error!("failed to reset document: {err}");
        })?;
        info!("document reset to defaults");
        Ok(())
    }

    pub fn should_show_help(&self) -> bool {
        self.get_document()
            .map(|doc| doc.show_help)
            .unwrap_or(true)
    }

    pub fn hide_help(&mut self) -> Result<(), StoreError> {
        self.modify(|doc| {
            doc.show_help = false;
            Ok(())
        })
    }

    fn modify<T>(
        &mut self,
        op: impl FnOnce(&mut Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut doc = self.get_document().ok_or(StoreError::NoDocument)?;
        let outcome = op(&mut doc).inspect_err(|err| warn!("operation rejected: {err}"))?;
        self.replace_document(&doc)?;
        Ok(outcome)
    }

    fn write_encoded(&mut self, encoded: &str) -> Result<(), StoreError> {
        self.backend.set(STORAGE_KEY, encoded).inspect_err(|err| {
            error!("failed to save document: {err}");
        })?;
        debug!("document saved");
        Ok(())
    }
}

fn recover_document(text: &str) -> Document {
    let mut raw: Value = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("stored document is not valid json, resetting: {err}");
            return Document::default();
        }
    };

    if migrate_legacy_goals(&mut raw) {
        info!("migrated legacy goals to records");
    }

    if !goals_are_well_formed(&raw) {
        warn!("stored goals are malformed, resetting");
        return Document::default();
    }

    match serde_json::from_value::<Document>(raw) {
        Ok(mut doc) => {
            if doc.target < 1 {
                warn!("stored target {} is invalid, using {DEFAULT_TARGET}", doc.target);
                doc.target = DEFAULT_TARGET;
            }
            doc
        }
        Err(err) => {
            warn!("stored document has an invalid shape, resetting: {err}");
            Document::default()
        }
    }
}

fn rename_activity(doc: &mut Document, old_name: &str, new_name: &str) {
    let old_prefix = ActivityEntry::prefix(old_name);
    let new_prefix = ActivityEntry::prefix(new_name);
    for reward in &mut doc.rewards {
        for entry in &mut reward.activity {
            if let Some(rest) = entry.strip_prefix(&old_prefix) {
                *entry = format!("{new_prefix}{rest}");
            }
        }
    }
}

fn ensure_reward_name_free(
    doc: &Document,
    name: &str,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    let taken = doc
        .rewards
        .iter()
        .enumerate()
        .any(|(index, reward)| Some(index) != skip && reward.reward_name == name);
    if taken {
        return Err(StoreError::DuplicateReward(name.to_string()));
    }
    Ok(())
}
