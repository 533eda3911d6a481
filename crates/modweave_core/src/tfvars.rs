//! `terraform.tfvars` generation.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{StackConfig, VariableSpec};
use crate::value::{format_value, HclValue};
use crate::variables::merge_variables;

/// Builds the contents of `terraform.tfvars` for a stack.
///
/// Top-level values are written for every variable the stack declares,
/// either explicitly or through the well-known variable table. Lines from an
/// existing tfvars file are kept when their key was not regenerated.
pub struct TfvarsBuilder<'a> {
    top_level: &'a IndexMap<String, HclValue>,
    declared: IndexMap<String, VariableSpec>,
}

impl<'a> TfvarsBuilder<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self::from_sections(&config.variables, &config.top_level)
    }

    pub fn from_sections(
        variables: &IndexMap<String, VariableSpec>,
        top_level: &'a IndexMap<String, HclValue>,
    ) -> Self {
        Self {
            top_level,
            declared: merge_variables(variables, top_level),
        }
    }

    /// Generated `(key, formatted value)` pairs, in top-level key order.
    pub fn generated_entries(&self) -> Vec<(&'a str, String)> {
        self.top_level
            .iter()
            .filter(|(key, _)| !key.ends_with("_config"))
            .filter(|(key, _)| self.declared.contains_key(key.as_str()))
            .map(|(key, value)| (key.as_str(), format_value(value)))
            .collect()
    }

    /// Generated `key = value` lines, in top-level key order.
    pub fn generated_lines(&self) -> Vec<String> {
        self.generated_entries()
            .into_iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect()
    }

    /// Render the file, merging entries from `existing` tfvars content.
    ///
    /// Returns `None` when there is nothing to write.
    pub fn render(&self, existing: Option<&str>) -> Option<String> {
        let generated = self.generated_entries();
        let mut lines: Vec<String> = generated
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect();

        if let Some(existing) = existing {
            let preserved = parse_tfvars(existing);
            debug!("Found {} existing tfvars entries", preserved.len());
            for (key, value) in preserved {
                if !generated.iter().any(|(k, _)| *k == key) {
                    lines.push(format!("{} = {}", key, value));
                }
            }
        }

        if lines.is_empty() {
            info!("No variables to write to tfvars file");
            return None;
        }
        Some(lines.join("\n"))
    }
}

/// Entry being collected across several lines.
struct Pending {
    key: String,
    value: String,
    depth: i64,
    heredoc: Option<String>,
}

impl Pending {
    fn is_complete(&self) -> bool {
        self.heredoc.is_none() && self.depth <= 0
    }
}

/// Parse `key = value` entries, skipping blanks and `#` / `//` comments.
///
/// Values are kept as raw text. A value that opens `{`, `[` or `(` runs until
/// the brackets balance, and a `<<EOF` heredoc runs until its marker line, so
/// multi-line values come back as one entry with their inner lines intact.
/// An entry still open at end of input is dropped.
pub fn parse_tfvars(content: &str) -> IndexMap<String, String> {
    let mut entries = IndexMap::new();
    let mut pending: Option<Pending> = None;

    for raw in content.lines() {
        if let Some(mut entry) = pending.take() {
            entry.value.push('\n');
            entry.value.push_str(raw);
            match &entry.heredoc {
                Some(marker) => {
                    if raw.trim() == marker {
                        entry.heredoc = None;
                    }
                }
                None => entry.depth += bracket_delta(raw),
            }
            if entry.is_complete() {
                entries.insert(entry.key, entry.value);
            } else {
                pending = Some(entry);
            }
            continue;
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("Ignoring unrecognised tfvars line: {}", line);
            continue;
        };

        let value = value.trim();
        let entry = Pending {
            key: key.trim().to_string(),
            value: value.to_string(),
            depth: bracket_delta(value),
            heredoc: heredoc_marker(value),
        };
        if entry.is_complete() {
            entries.insert(entry.key, entry.value);
        } else {
            pending = Some(entry);
        }
    }

    if let Some(entry) = pending {
        warn!("Dropping unterminated tfvars entry: {}", entry.key);
    }
    entries
}

/// Marker of a `<<EOF` or `<<-EOF` heredoc opener.
fn heredoc_marker(value: &str) -> Option<String> {
    let marker = value.strip_prefix("<<")?;
    let marker = marker.strip_prefix('-').unwrap_or(marker).trim();
    (!marker.is_empty()).then(|| marker.to_string())
}

/// Opening minus closing brackets outside string literals and comments.
fn bracket_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '#' => break,
            '/' if chars.peek() == Some(&'/') => break,
            '{' | '[' | '(' => delta += 1,
            '}' | ']' | ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> StackConfig {
        StackConfig::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_only_declared_keys_are_written() {
        let config = config(
            r#"
instance_type: t3.small
unused: 1
variables:
  instance_type:
    type: string
"#,
        );

        let rendered = TfvarsBuilder::new(&config).render(None).unwrap();
        assert_eq!(rendered, "instance_type = \"t3.small\"");
    }

    #[test]
    fn test_well_known_keys_are_written() {
        let config = config("region: eu-west-1\nzone: eu-west-1a\n");
        let rendered = TfvarsBuilder::new(&config).render(None).unwrap();
        assert_eq!(rendered, "region = \"eu-west-1\"\nzone = \"eu-west-1a\"");
    }

    #[test]
    fn test_existing_entries_are_preserved() {
        let config = config("region: eu-west-1\n");
        let existing = "# managed by hand\nregion = \"us-east-1\"\ndb_password = \"hunter22\"\n\n";

        let rendered = TfvarsBuilder::new(&config).render(Some(existing)).unwrap();
        assert_eq!(rendered, "region = \"eu-west-1\"\ndb_password = \"hunter22\"");
    }

    #[test]
    fn test_nothing_to_write() {
        let config = config("modules: {}\n");
        assert_eq!(TfvarsBuilder::new(&config).render(None), None);
    }

    #[test]
    fn test_parse_tfvars() {
        let parsed = parse_tfvars("a = 1\n  # note\nb=\"x = y\"\ngarbage\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["a"], "1");
        assert_eq!(parsed["b"], "\"x = y\"");
    }

    #[test]
    fn test_parse_multiline_values() {
        let content = "labels = {\n  team = \"platform\"\n  note = \"a } b\"\n}\nzones = [\n  \"a\",\n  \"b\",\n]\nregion = \"eu\"\n";
        let parsed = parse_tfvars(content);

        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed["labels"],
            "{\n  team = \"platform\"\n  note = \"a } b\"\n}"
        );
        assert_eq!(parsed["zones"], "[\n  \"a\",\n  \"b\",\n]");
        assert_eq!(parsed["region"], "\"eu\"");
    }

    #[test]
    fn test_parse_heredoc() {
        let content = "policy = <<EOF\n{\n  \"Version\": \"2012-10-17\"\nEOF\nname = \"x\"\n";
        let parsed = parse_tfvars(content);

        assert_eq!(parsed["policy"], "<<EOF\n{\n  \"Version\": \"2012-10-17\"\nEOF");
        assert_eq!(parsed["name"], "\"x\"");
    }

    #[test]
    fn test_parse_drops_unterminated_entry() {
        let parsed = parse_tfvars("a = 1\nbroken = {\n  x = 1\n");
        assert_eq!(parsed.len(), 1);
        assert!(!parsed.contains_key("x"));
    }

    #[test]
    fn test_map_values_survive_repeated_merges() {
        let with_labels = config(
            r#"
region: eu-west-1
labels:
  team: platform
  tier: web
variables:
  labels:
    type: map(string)
"#,
        );
        let without_labels = config("region: eu-west-1\n");

        let first = TfvarsBuilder::new(&with_labels).render(None).unwrap();
        let second = TfvarsBuilder::new(&with_labels).render(Some(&first)).unwrap();
        assert_eq!(second, first);

        let third = TfvarsBuilder::new(&without_labels).render(Some(&second)).unwrap();
        assert_eq!(
            third,
            "region = \"eu-west-1\"\nlabels = {\n  team = \"platform\"\n  tier = \"web\"\n}"
        );
        assert_eq!(third.matches('{').count(), third.matches('}').count());
    }
}
