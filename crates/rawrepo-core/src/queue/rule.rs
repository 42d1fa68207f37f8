//! Provider to worker fan-out rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// One side of a rule match: yes, no, or either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RuleFlag {
    Yes,
    No,
    Any,
}

impl RuleFlag {
    pub fn matches(&self, value: bool) -> bool {
        match self {
            RuleFlag::Yes => value,
            RuleFlag::No => !value,
            RuleFlag::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleFlag::Yes => "Y",
            RuleFlag::No => "N",
            RuleFlag::Any => "A",
        }
    }
}

impl fmt::Display for RuleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Y" | "y" => Ok(RuleFlag::Yes),
            "N" | "n" => Ok(RuleFlag::No),
            "A" | "a" => Ok(RuleFlag::Any),
            _ => Err(InvalidInputError::RuleFlag {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

impl From<RuleFlag> for String {
    fn from(flag: RuleFlag) -> Self {
        flag.as_str().to_string()
    }
}

impl TryFrom<String> for RuleFlag {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Subscribes `worker` to the jobs `provider` emits with matching flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueRule {
    pub provider: String,
    pub worker: String,
    pub changed: RuleFlag,
    pub leaf: RuleFlag,
}

impl QueueRule {
    pub fn new(
        provider: impl Into<String>,
        worker: impl Into<String>,
        changed: RuleFlag,
        leaf: RuleFlag,
    ) -> Self {
        Self {
            provider: provider.into(),
            worker: worker.into(),
            changed,
            leaf,
        }
    }

    pub fn matches(&self, provider: &str, changed: bool, leaf: bool) -> bool {
        self.provider == provider && self.changed.matches(changed) && self.leaf.matches(leaf)
    }

    /// When this worker receives a job, in words.
    pub fn describe(&self) -> String {
        let which = match self.changed {
            RuleFlag::Yes => "the changed record",
            RuleFlag::No => "records affected by a change",
            RuleFlag::Any => "every record",
        };
        let kind = match self.leaf {
            RuleFlag::Yes => ", if it is a leaf",
            RuleFlag::No => ", if it has children",
            RuleFlag::Any => "",
        };
        format!("{} receives {}{}", self.worker, which, kind)
    }
}

/// Workers that should receive a job, in rule order without repeats.
pub fn matching_workers<'a>(
    rules: &'a [QueueRule],
    provider: &str,
    changed: bool,
    leaf: bool,
) -> Vec<&'a str> {
    let mut workers: Vec<&str> = Vec::new();
    for rule in rules.iter().filter(|r| r.matches(provider, changed, leaf)) {
        if !workers.contains(&rule.worker.as_str()) {
            workers.push(&rule.worker);
        }
    }
    workers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<QueueRule> {
        vec![
            QueueRule::new("test", "changed", RuleFlag::Yes, RuleFlag::Any),
            QueueRule::new("test", "leaf", RuleFlag::Any, RuleFlag::Yes),
            QueueRule::new("test", "node", RuleFlag::Any, RuleFlag::No),
            QueueRule::new("other", "everything", RuleFlag::Any, RuleFlag::Any),
        ]
    }

    #[test]
    fn test_fan_out() {
        let rules = rules();
        assert_eq!(
            matching_workers(&rules, "test", true, true),
            vec!["changed", "leaf"]
        );
        assert_eq!(
            matching_workers(&rules, "test", true, false),
            vec!["changed", "node"]
        );
        assert_eq!(matching_workers(&rules, "test", false, true), vec!["leaf"]);
        assert_eq!(matching_workers(&rules, "test", false, false), vec!["node"]);
        assert!(matching_workers(&rules, "nobody", true, true).is_empty());
    }

    #[test]
    fn test_flag_parse() {
        assert_eq!("A".parse::<RuleFlag>().unwrap(), RuleFlag::Any);
        assert!("X".parse::<RuleFlag>().is_err());
    }

    #[test]
    fn test_describe() {
        let rule = QueueRule::new("p", "indexer", RuleFlag::Yes, RuleFlag::Yes);
        assert_eq!(rule.describe(), "indexer receives the changed record, if it is a leaf");
    }
}
