//! # Aerial CSS
//!
//! Synthetic CSS object model with stable identities, plus a diff/patch pair
//! that turns one style sheet into another through ordered, serializable
//! mutations.
//!
//! ```
//! use aerial_common::SequentialIds;
//! use aerial_css::{apply_css_mutations, css_text, diff_style_sheet, CssRule, StyleSheet};
//!
//! let mut ids = SequentialIds::new("file:///a.css");
//! let mut old = StyleSheet::new(&mut ids)
//!     .with_rule(CssRule::style(&mut ids, "a").with_declaration("color", "red"));
//! let new = StyleSheet::new(&mut ids)
//!     .with_rule(CssRule::style(&mut ids, "a").with_declaration("color", "blue"));
//!
//! let mutations = diff_style_sheet(&old, &new);
//! assert_eq!(mutations.len(), 1);
//!
//! apply_css_mutations(&mut old, &mutations, &mut ids).unwrap();
//! assert_eq!(css_text(&old), css_text(&new));
//! ```

pub mod cssom;
pub mod differ;
pub mod mutation;
pub mod patch;
pub mod serializer;

pub use cssom::{CssRule, Declarations, RuleKind, StyleSheet};
pub use differ::{diff_rule, diff_style_sheet, rules_correspond};
pub use mutation::{CssMutation, CssMutationError, CssMutationResult};
pub use patch::{apply_css_mutation, apply_css_mutations};
pub use serializer::{
    annotate_sources, css_text, declarations_body, rule_body, rule_text, strip_whitespace,
};
