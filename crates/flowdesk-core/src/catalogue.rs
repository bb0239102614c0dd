use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FlowdeskError, Result};
use crate::types::Button;

/// Maximum number of buttons a template may offer.
pub const MAX_TEMPLATE_BUTTONS: usize = 3;

/// Opening hours for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayRule {
    #[serde(default)]
    pub active: bool,
    /// `HH:MM`, inclusive.
    pub start: String,
    /// `HH:MM`, inclusive.
    pub end: String,
}

impl DayRule {
    pub fn open(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            active: true,
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn closed() -> Self {
        Self {
            active: false,
            start: "00:00".into(),
            end: "00:00".into(),
        }
    }
}

/// A named set of business-hours rules keyed by weekday name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: HashMap<String, DayRule>,
}

impl ScheduleGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, day: impl Into<String>, rule: DayRule) -> Self {
        self.rules.insert(day.into(), rule);
        self
    }
}

/// A canned message with quick-reply buttons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Template {
    /// Reject templates with too many buttons or blank labels.
    pub fn validate(&self) -> Result<()> {
        if self.buttons.len() > MAX_TEMPLATE_BUTTONS {
            return Err(FlowdeskError::Catalogue(format!(
                "template '{}' has {} buttons (max {})",
                self.id,
                self.buttons.len(),
                MAX_TEMPLATE_BUTTONS
            )));
        }
        if let Some(b) = self.buttons.iter().find(|b| b.label.trim().is_empty()) {
            return Err(FlowdeskError::Catalogue(format!(
                "template '{}' button '{}' has an empty label",
                self.id, b.id
            )));
        }
        Ok(())
    }

    pub fn has_button(&self, id: &str) -> bool {
        self.buttons.iter().any(|b| b.id == id)
    }
}
