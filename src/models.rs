use crate::errors::StoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TARGET: u32 = 11;

/// Separator between the goal name and the date inside an activity entry.
pub const COMPLETED_ON: &str = " completed on ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default = "default_target")]
    pub target: u32,
    #[serde(default = "default_show_help")]
    pub show_help: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            goals: Vec::new(),
            rewards: Vec::new(),
            target: DEFAULT_TARGET,
            show_help: true,
        }
    }
}

fn default_target() -> u32 {
    DEFAULT_TARGET
}

fn default_show_help() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub required: bool,
}

impl Goal {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
        }
    }

    pub fn same_as(&self, other: &Goal) -> bool {
        self.name == other.name && self.required == other.required
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub reward_name: String,
    #[serde(default)]
    pub activity: Vec<String>,
}

impl Reward {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            reward_name: name.into(),
            activity: Vec::new(),
        }
    }
}

/// A parsed view of one activity log string.
///
/// The persisted form is always the plain string `"<goal> completed on <date>"`;
/// this type only exists at the read boundary. Entries that do not contain the
/// separator keep their whole text as the goal and carry no date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub text: String,
    pub goal: String,
    pub date: Option<String>,
}

impl ActivityEntry {
    pub fn parse(text: &str) -> Self {
        match text.split_once(COMPLETED_ON) {
            Some((goal, date)) => Self {
                text: text.to_string(),
                goal: goal.to_string(),
                date: Some(date.to_string()),
            },
            None => Self {
                text: text.to_string(),
                goal: text.to_string(),
                date: None,
            },
        }
    }

    pub fn format(goal: &str, date: NaiveDate) -> String {
        format!("{goal}{COMPLETED_ON}{}", date_key(date))
    }

    /// Prefix shared by every entry logged for `goal`.
    pub fn prefix(goal: &str) -> String {
        format!("{goal}{COMPLETED_ON}")
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Trims user input and rejects blank names.
pub fn normalize_name(raw: &str, field: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidValue(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Accepts only whole numbers >= 1 that fit the stored width.
pub fn validate_target(value: f64) -> Result<u32, StoreError> {
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return Err(StoreError::InvalidValue(
            "target must be a positive integer".to_string(),
        ));
    }
    Ok(value as u32)
}

/// Rewrites goals stored as bare strings into `{name, required: false}` records.
///
/// Returns true when anything changed. Documents already in the record form
/// are left untouched, which keeps repeated loads stable.
pub fn migrate_legacy_goals(raw: &mut Value) -> bool {
    let Some(goals) = raw.get_mut("goals").and_then(Value::as_array_mut) else {
        return false;
    };

    let mut migrated = false;
    for goal in goals.iter_mut() {
        if let Value::String(name) = goal {
            let name = std::mem::take(name);
            *goal = serde_json::json!({ "name": name, "required": false });
            migrated = true;
        }
    }
    migrated
}

/// Checks that `goals` is an array of well-formed goal records.
pub fn goals_are_well_formed(raw: &Value) -> bool {
    let Some(goals) = raw.get("goals").and_then(Value::as_array) else {
        return false;
    };

    goals.iter().all(|goal| {
        let name_ok = goal
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty());
        let required_ok = goal.get("required").is_some_and(Value::is_boolean);
        name_ok && required_ok
    })
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRewardRequest {
    pub reward: Reward,
}

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub goal: String,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub target: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TargetResponse {
    pub target: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpResponse {
    pub show_help: bool,
}
