use regex::Regex;

use crate::{config::VibeRule, ShoutoutError};

/// The ordered keyword table used to guess what a streamer's channel feels like.
#[derive(Debug)]
pub struct VibeTable {
    rules: Vec<(Regex, String)>,
    default_label: String,
}

impl VibeTable {
    /// Compiles every rule into one case-insensitive substring matcher. Keywords are matched
    /// literally, so `fun` also hits "funny".
    pub fn new(rules: &[VibeRule], default_label: &str) -> Result<Self, ShoutoutError> {
        let rules: Vec<(Regex, String)> = rules
            .iter()
            .map(|rule| {
                let alternatives: Vec<String> = rule
                    .keywords
                    .iter()
                    .map(|k| k.trim())
                    .filter(|k| !k.is_empty())
                    .map(regex::escape)
                    .collect();
                if alternatives.is_empty() {
                    return Err(ShoutoutError::InvalidVibeRule(
                        rule.label.clone(),
                        "no keywords".to_owned(),
                    ));
                }

                Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
                    .map(|re| (re, rule.label.clone()))
                    .map_err(|e| ShoutoutError::InvalidVibeRule(rule.label.clone(), e.to_string()))
            })
            .collect::<Result<Vec<_>, ShoutoutError>>()?;

        Ok(Self {
            rules,
            default_label: default_label.to_owned(),
        })
    }

    /// Labels of every rule matching any of `texts`, in table order. Falls back to exactly the
    /// default label when nothing matches.
    pub fn classify(&self, texts: &[&str]) -> Vec<&str> {
        let haystack = texts.join(" ").to_lowercase();

        let mut labels: Vec<&str> = self
            .rules
            .iter()
            .filter(|(re, _)| re.is_match(&haystack))
            .map(|(_, label)| label.as_str())
            .collect();

        if labels.is_empty() {
            labels.push(&self.default_label);
        }

        labels
    }
}
