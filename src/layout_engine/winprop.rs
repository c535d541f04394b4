use regex::Regex;
use tracing::debug;

use crate::common::config::{ConfigError, WinpropRule};
use crate::model::window::WindowInfo;

#[derive(Clone, Debug)]
pub enum TitleMatcher {
    Exact(String),
    Pattern(Regex),
}

impl TitleMatcher {
    fn parse(title: &str) -> Result<Self, regex::Error> {
        match title.strip_prefix('/').and_then(|t| t.strip_suffix('/')) {
            Some(pattern) if title.len() >= 2 => Ok(TitleMatcher::Pattern(Regex::new(pattern)?)),
            _ => Ok(TitleMatcher::Exact(title.to_owned())),
        }
    }

    fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatcher::Exact(exact) => exact == title,
            TitleMatcher::Pattern(re) => re.is_match(title),
        }
    }
}

/// A compiled window-matching rule.
#[derive(Clone, Debug)]
pub struct Winprop {
    pub wm_class: String,
    pub title: Option<TitleMatcher>,
    pub scratch_layer: bool,
    pub oneshot: bool,
}

impl Winprop {
    pub fn compile(rule: &WinpropRule) -> Result<Self, ConfigError> {
        if rule.wm_class.is_empty() {
            return Err(ConfigError::InvalidWinprop {
                wm_class: String::new(),
                reason: "wm_class is required".into(),
            });
        }
        let title = rule
            .title
            .as_deref()
            .map(TitleMatcher::parse)
            .transpose()
            .map_err(|e| ConfigError::InvalidWinprop {
                wm_class: rule.wm_class.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            wm_class: rule.wm_class.clone(),
            title,
            scratch_layer: rule.scratch_layer,
            oneshot: rule.oneshot,
        })
    }

    pub fn matches(&self, info: &WindowInfo) -> bool {
        if info.wm_class.as_deref() != Some(self.wm_class.as_str()) {
            return false;
        }
        self.title.as_ref().is_none_or(|t| t.matches(&info.title))
    }
}

/// Ordered rule list. The first matching definition wins.
#[derive(Clone, Debug, Default)]
pub struct Winprops {
    rules: Vec<Winprop>,
}

impl Winprops {
    pub fn new(rules: Vec<Winprop>) -> Self { Self { rules } }

    pub fn len(&self) -> usize { self.rules.len() }

    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    pub fn define(&mut self, rule: Winprop) { self.rules.push(rule); }

    /// Finds the rule for `info`. One-shot rules are consumed by the match.
    pub fn take_match(&mut self, info: &WindowInfo) -> Option<Winprop> {
        let index = self.rules.iter().position(|rule| rule.matches(info))?;
        let rule = if self.rules[index].oneshot {
            debug!(wm_class = %self.rules[index].wm_class, "consumed oneshot winprop");
            self.rules.remove(index)
        } else {
            self.rules[index].clone()
        };
        Some(rule)
    }
}
