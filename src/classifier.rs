use crate::constants::EMERGENCY_TRIGGERS;

/// Decides whether a free-form model answer describes a life-threatening situation.
pub trait EmergencyClassifier: Send + Sync {
    fn is_emergency(&self, text: &str) -> bool;
}

/// Flags text containing any trigger substring, case-insensitively.
///
/// This is a coarse heuristic: "18" also matches "18-20min" or "2018".
#[derive(Debug, Clone)]
pub struct TriggerWordClassifier {
    triggers: Vec<String>,
}

impl TriggerWordClassifier {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }
}

impl Default for TriggerWordClassifier {
    fn default() -> Self {
        Self::new(EMERGENCY_TRIGGERS)
    }
}

impl EmergencyClassifier for TriggerWordClassifier {
    fn is_emergency(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.triggers.iter().any(|trigger| lowered.contains(trigger.as_str()))
    }
}
