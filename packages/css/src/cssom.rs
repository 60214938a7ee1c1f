//! Synthetic CSSOM: style sheets and rules.
//!
//! A sheet owns its rules; grouping rules own their nested rules. The
//! `parent_rule` / `parent_style_sheet` / `owner_node` fields are non-owning
//! back-references by identity, maintained by [`StyleSheet::link`] and by the
//! patcher on insert.

use aerial_common::{IdGenerator, SourceLocation, Uid};
use aerial_diff::OrderedMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property name → value, in source order. Order takes part in equality.
pub type Declarations = OrderedMap<String, String>;

/// Top-level rule list, optionally owned by a `<style>` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_node: Option<Uid>,
    #[serde(default)]
    pub rules: Vec<CssRule>,
}

/// A CSS rule of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssRule {
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_rule: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_style_sheet: Option<Uid>,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// `selector { declarations }`; also used for keyframe steps (`0% { .. }`)
    Style { selector: String, style: Declarations },

    /// `@media condition { rules }`
    Media { condition: String, rules: Vec<CssRule> },

    /// `@keyframes name { steps }`
    Keyframes { name: String, rules: Vec<CssRule> },

    /// `@font-face { declarations }`
    FontFace { style: Declarations },

    /// Any other at-rule: opaque container of nested rules
    Unknown {
        name: String,
        prelude: String,
        rules: Vec<CssRule>,
    },
}

impl StyleSheet {
    pub fn new(ids: &mut dyn IdGenerator) -> Self {
        Self {
            uid: ids.next_id(),
            source: None,
            owner_node: None,
            rules: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner: Uid) -> Self {
        self.owner_node = Some(owner);
        self
    }

    pub fn with_rule(mut self, rule: CssRule) -> Self {
        self.rules.push(rule);
        self.link();
        self
    }

    /// Re-establish every back-reference below this sheet
    pub fn link(&mut self) {
        let sheet = self.uid.clone();
        for rule in &mut self.rules {
            rule.link(&sheet, None);
        }
    }

    /// Find a rule anywhere in the sheet
    pub fn find_rule(&self, uid: &Uid) -> Option<&CssRule> {
        find_in(&self.rules, uid)
    }

    pub fn find_rule_mut(&mut self, uid: &Uid) -> Option<&mut CssRule> {
        find_in_mut(&mut self.rules, uid)
    }

    /// The sheet or grouping rule identified by `uid` as a rule container
    pub fn rule_list(&self, uid: &Uid) -> Option<&Vec<CssRule>> {
        if *uid == self.uid {
            return Some(&self.rules);
        }
        self.find_rule(uid).and_then(CssRule::rules)
    }

    /// Sheet the rule belongs to: its own back-reference, or inherited through
    /// the parent rule chain
    pub fn parent_style_sheet_of(&self, uid: &Uid) -> Option<&Uid> {
        let mut current = self.find_rule(uid)?;
        loop {
            if let Some(sheet) = &current.parent_style_sheet {
                return Some(sheet);
            }
            match &current.parent_rule {
                Some(parent) => current = self.find_rule(parent)?,
                None => return None,
            }
        }
    }

    /// The owning element of the sheet a rule belongs to
    pub fn owner_node_of(&self, uid: &Uid) -> Option<&Uid> {
        if *uid == self.uid {
            return self.owner_node.as_ref();
        }
        match self.parent_style_sheet_of(uid) {
            Some(sheet) if *sheet == self.uid => self.owner_node.as_ref(),
            _ => None,
        }
    }

    /// Every rule in the sheet keyed by identity
    pub fn flatten(&self) -> HashMap<&Uid, &CssRule> {
        let mut all = HashMap::new();
        let mut stack: Vec<&CssRule> = self.rules.iter().rev().collect();
        while let Some(rule) = stack.pop() {
            all.insert(&rule.uid, rule);
            if let Some(children) = rule.rules() {
                stack.extend(children.iter().rev());
            }
        }
        all
    }

    /// Assign fresh identities; `deep` also re-identifies every rule
    pub fn regenerate_ids(&mut self, ids: &mut dyn IdGenerator, deep: bool) {
        self.uid = ids.next_id();
        if deep {
            for rule in &mut self.rules {
                rule.regenerate_ids(ids, true);
            }
        }
        self.link();
    }

    /// Equal ignoring identities, provenance and back-references
    pub fn same_structure(&self, other: &StyleSheet) -> bool {
        same_rules(&self.rules, &other.rules)
    }
}

impl CssRule {
    fn with_kind(ids: &mut dyn IdGenerator, kind: RuleKind) -> Self {
        Self {
            uid: ids.next_id(),
            source: None,
            parent_rule: None,
            parent_style_sheet: None,
            kind,
        }
    }

    pub fn style(ids: &mut dyn IdGenerator, selector: impl Into<String>) -> Self {
        Self::with_kind(
            ids,
            RuleKind::Style {
                selector: selector.into(),
                style: Declarations::new(),
            },
        )
    }

    pub fn media(ids: &mut dyn IdGenerator, condition: impl Into<String>) -> Self {
        Self::with_kind(
            ids,
            RuleKind::Media {
                condition: condition.into(),
                rules: Vec::new(),
            },
        )
    }

    pub fn keyframes(ids: &mut dyn IdGenerator, name: impl Into<String>) -> Self {
        Self::with_kind(
            ids,
            RuleKind::Keyframes {
                name: name.into(),
                rules: Vec::new(),
            },
        )
    }

    pub fn font_face(ids: &mut dyn IdGenerator) -> Self {
        Self::with_kind(
            ids,
            RuleKind::FontFace {
                style: Declarations::new(),
            },
        )
    }

    pub fn unknown(
        ids: &mut dyn IdGenerator,
        name: impl Into<String>,
        prelude: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            ids,
            RuleKind::Unknown {
                name: name.into(),
                prelude: prelude.into(),
                rules: Vec::new(),
            },
        )
    }

    /// Add a declaration (style and font-face rules only)
    pub fn with_declaration(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(style) = self.declarations_mut() {
            style.insert(name.into(), value.into());
        }
        self
    }

    /// Nest a rule (grouping rules only)
    pub fn with_rule(mut self, mut rule: CssRule) -> Self {
        let parent = self.uid.clone();
        let sheet = self.parent_style_sheet.clone();
        if let Some(rules) = self.rules_mut() {
            rule.link_under(sheet.as_ref(), Some(&parent));
            rules.push(rule);
        }
        self
    }

    pub fn rules(&self) -> Option<&Vec<CssRule>> {
        match &self.kind {
            RuleKind::Media { rules, .. }
            | RuleKind::Keyframes { rules, .. }
            | RuleKind::Unknown { rules, .. } => Some(rules),
            RuleKind::Style { .. } | RuleKind::FontFace { .. } => None,
        }
    }

    pub fn rules_mut(&mut self) -> Option<&mut Vec<CssRule>> {
        match &mut self.kind {
            RuleKind::Media { rules, .. }
            | RuleKind::Keyframes { rules, .. }
            | RuleKind::Unknown { rules, .. } => Some(rules),
            RuleKind::Style { .. } | RuleKind::FontFace { .. } => None,
        }
    }

    pub fn declarations(&self) -> Option<&Declarations> {
        match &self.kind {
            RuleKind::Style { style, .. } | RuleKind::FontFace { style } => Some(style),
            RuleKind::Media { .. } | RuleKind::Keyframes { .. } | RuleKind::Unknown { .. } => None,
        }
    }

    pub fn declarations_mut(&mut self) -> Option<&mut Declarations> {
        match &mut self.kind {
            RuleKind::Style { style, .. } | RuleKind::FontFace { style } => Some(style),
            RuleKind::Media { .. } | RuleKind::Keyframes { .. } | RuleKind::Unknown { .. } => None,
        }
    }

    pub fn selector_text(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Style { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// Condition text of media / unknown rules
    pub fn condition_text(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Media { condition, .. } => Some(condition),
            RuleKind::Unknown { prelude, .. } => Some(prelude),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            RuleKind::Style { .. } => "style",
            RuleKind::Media { .. } => "media",
            RuleKind::Keyframes { .. } => "keyframes",
            RuleKind::FontFace { .. } => "font-face",
            RuleKind::Unknown { .. } => "unknown",
        }
    }

    pub(crate) fn link(&mut self, sheet: &Uid, parent: Option<&Uid>) {
        self.link_under(Some(sheet), parent);
    }

    pub(crate) fn link_under(&mut self, sheet: Option<&Uid>, parent: Option<&Uid>) {
        self.parent_style_sheet = sheet.cloned();
        self.parent_rule = parent.cloned();
        let own = self.uid.clone();
        if let Some(rules) = self.rules_mut() {
            for rule in rules {
                rule.link_under(sheet, Some(&own));
            }
        }
    }

    pub fn regenerate_ids(&mut self, ids: &mut dyn IdGenerator, deep: bool) {
        self.uid = ids.next_id();
        let own = self.uid.clone();
        if let Some(rules) = self.rules_mut() {
            for rule in rules {
                rule.parent_rule = Some(own.clone());
                if deep {
                    rule.regenerate_ids(ids, true);
                }
            }
        }
    }

    /// Equal ignoring identities, provenance and back-references
    pub fn same_structure(&self, other: &CssRule) -> bool {
        match (&self.kind, &other.kind) {
            (
                RuleKind::Style { selector: a, style: sa },
                RuleKind::Style { selector: b, style: sb },
            ) => a == b && sa == sb,
            (RuleKind::FontFace { style: a }, RuleKind::FontFace { style: b }) => a == b,
            (
                RuleKind::Media { condition: a, rules: ra },
                RuleKind::Media { condition: b, rules: rb },
            )
            | (
                RuleKind::Keyframes { name: a, rules: ra },
                RuleKind::Keyframes { name: b, rules: rb },
            ) => a == b && same_rules(ra, rb),
            (
                RuleKind::Unknown {
                    name: a,
                    prelude: pa,
                    rules: ra,
                },
                RuleKind::Unknown {
                    name: b,
                    prelude: pb,
                    rules: rb,
                },
            ) => a == b && pa == pb && same_rules(ra, rb),
            _ => false,
        }
    }
}

fn same_rules(a: &[CssRule], b: &[CssRule]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
}

fn find_in<'a>(rules: &'a [CssRule], uid: &Uid) -> Option<&'a CssRule> {
    for rule in rules {
        if rule.uid == *uid {
            return Some(rule);
        }
        if let Some(found) = rule.rules().and_then(|children| find_in(children, uid)) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(rules: &'a mut [CssRule], uid: &Uid) -> Option<&'a mut CssRule> {
    for rule in rules.iter_mut() {
        if rule.uid == *uid {
            return Some(rule);
        }
        if let Some(children) = rule.rules_mut() {
            if let Some(found) = find_in_mut(children, uid) {
                return Some(found);
            }
        }
    }
    None
}
