//! Provider conventions.
//!
//! Some providers take settings that almost every stack supplies through a
//! top-level key (`region`, `project_id`, ...). A [`ProviderConventions`]
//! table lists, per provider, which fields to wire to a variable reference
//! when the provider block does not set them itself.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Inject `field = var.<key>` using the first of `source_keys` present at the
/// top level of the stack configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionRule {
    pub field: String,
    /// Candidate top-level keys, highest priority first.
    pub source_keys: Vec<String>,
}

impl InjectionRule {
    pub fn new(field: impl Into<String>, source_keys: &[&str]) -> Self {
        Self {
            field: field.into(),
            source_keys: source_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Pick the first source key accepted by `is_present`.
    pub fn select<'a>(&'a self, is_present: impl Fn(&str) -> bool) -> Option<&'a str> {
        self.source_keys
            .iter()
            .map(String::as_str)
            .find(|key| is_present(key))
    }
}

/// Provider name to injection rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConventions {
    rules: IndexMap<String, Vec<InjectionRule>>,
}

impl ProviderConventions {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventions for the Google and AWS providers.
    pub fn builtin() -> Self {
        Self::new()
            .with_rule("google", InjectionRule::new("project", &["project_id", "project"]))
            .with_rule("google", InjectionRule::new("region", &["region"]))
            .with_rule("aws", InjectionRule::new("region", &["aws_region", "region"]))
    }

    /// Append a rule for `provider`.
    pub fn with_rule(mut self, provider: impl Into<String>, rule: InjectionRule) -> Self {
        self.rules.entry(provider.into()).or_default().push(rule);
        self
    }

    pub fn rules_for(&self, provider: &str) -> &[InjectionRule] {
        self.rules.get(provider).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let conventions = ProviderConventions::builtin();

        let google: Vec<&str> = conventions
            .rules_for("google")
            .iter()
            .map(|r| r.field.as_str())
            .collect();
        assert_eq!(google, vec!["project", "region"]);

        let aws = conventions.rules_for("aws");
        assert_eq!(aws.len(), 1);
        assert_eq!(aws[0].source_keys, vec!["aws_region", "region"]);

        assert!(conventions.rules_for("azurerm").is_empty());
    }

    #[test]
    fn test_select_respects_priority() {
        let rule = InjectionRule::new("region", &["aws_region", "region"]);

        assert_eq!(rule.select(|k| k == "region"), Some("region"));
        assert_eq!(rule.select(|_| true), Some("aws_region"));
        assert_eq!(rule.select(|_| false), None);
    }

    #[test]
    fn test_table_is_extensible() {
        let conventions = ProviderConventions::builtin()
            .with_rule("azurerm", InjectionRule::new("subscription_id", &["subscription_id"]));

        assert_eq!(conventions.rules_for("azurerm").len(), 1);
        assert_eq!(conventions.providers().count(), 3);
    }
}
