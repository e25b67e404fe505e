//! Compile-time variable substitution (`define`).
//!
//! A table maps dotted names (`__DEV__`, `process.env.NODE_ENV`) to
//! expression source. Each replacement is parsed once when the table is
//! built; during the transform a matching identifier or member chain is
//! replaced by a copy of that expression.

use super::classify::dotted_name;
use super::swc::parse_expression;
use crate::config::TransformConfig;
use crate::error::Error;
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;
use swc_ecma_ast::{Expr, KeyValueProp, Prop, PropName};

/// Parsed replacement rules, keyed by exact dotted name.
#[derive(Debug, Default, Clone)]
pub struct ReplacementTable {
    rules: HashMap<String, Box<Expr>>,
}

impl ReplacementTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `name -> expression source` pairs.
    pub fn from_defines<'a, I>(defines: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut table = Self::new();
        for (name, source) in defines {
            table.insert(name, source)?;
        }
        Ok(table)
    }

    /// Build the table for a config's `define` section.
    pub fn from_config(config: &TransformConfig) -> Result<Self, Error> {
        Self::from_defines(&config.define)
    }

    /// Add (or replace) one rule.
    pub fn insert(&mut self, name: &str, source: &str) -> Result<(), Error> {
        let expr = parse_expression(source).map_err(|message| Error::InvalidReplacement {
            name: name.to_string(),
            message,
        })?;
        self.rules.insert(name.to_string(), expr);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Replace `expr` in place when it is an identifier or member chain with
    /// a configured name. Returns whether a substitution happened.
    pub fn substitute(&self, expr: &mut Expr) -> bool {
        if self.rules.is_empty() || !matches!(expr, Expr::Ident(_) | Expr::Member(_)) {
            return false;
        }
        let Some(replacement) = dotted_name(expr).and_then(|name| self.rules.get(&name)) else {
            return false;
        };
        *expr = (**replacement).clone();
        true
    }

    /// Expand a shorthand property whose name is configured, so that
    /// `{ __DEV__ }` becomes `{ __DEV__: false }`.
    pub fn substitute_shorthand(&self, prop: &mut Prop) -> bool {
        let Prop::Shorthand(ident) = prop else {
            return false;
        };
        let Some(replacement) = self.rules.get(&*ident.sym) else {
            return false;
        };
        *prop = Prop::KeyValue(KeyValueProp {
            key: PropName::Ident(ident.clone().into()),
            value: replacement.clone(),
        });
        true
    }
}

impl TryFrom<&BTreeMap<String, String>> for ReplacementTable {
    type Error = Error;

    fn try_from(defines: &BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_defines(defines)
    }
}
