//! Attribute queries over image collections.

use crate::error::{Error, Result};
use crate::image::ImageNode;
use std::collections::BTreeSet;

/// Condition on a single string attribute.
///
/// Matching is exact: aliases (e.g. architecture names) must be resolved by
/// the caller before building the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals(String),
    AnyOf(BTreeSet<String>),
}

impl Predicate {
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Predicate::Equals(expected) => expected == value,
            Predicate::AnyOf(values) => values.contains(value),
        }
    }
}

impl From<&str> for Predicate {
    fn from(value: &str) -> Self {
        Predicate::Equals(value.to_string())
    }
}

impl From<String> for Predicate {
    fn from(value: String) -> Self {
        Predicate::Equals(value)
    }
}

/// Conjunction of attribute predicates. Unset attributes match everything;
/// an empty string matches images without a tag or variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFilter {
    name: Option<Predicate>,
    tag: Option<Predicate>,
    arch: Option<Predicate>,
    os: Option<Predicate>,
    variant: Option<Predicate>,
}

impl ImageFilter {
    pub const KEYS: [&'static str; 5] = ["name", "tag", "arch", "os", "variant"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from `key=value` style pairs, e.g. CLI selectors.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Predicate>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            filter.set(key.as_ref(), value.into())?;
        }
        Ok(filter)
    }

    pub fn set(&mut self, key: &str, predicate: Predicate) -> Result<()> {
        let slot = match key {
            "name" => &mut self.name,
            "tag" => &mut self.tag,
            "arch" => &mut self.arch,
            "os" => &mut self.os,
            "variant" => &mut self.variant,
            other => {
                return Err(Error::Configuration(format!(
                    "unknown filter key `{}`, expected one of: {}",
                    other,
                    Self::KEYS.join(", ")
                )));
            }
        };
        *slot = Some(predicate);
        Ok(())
    }

    pub fn name(mut self, predicate: impl Into<Predicate>) -> Self {
        self.name = Some(predicate.into());
        self
    }

    pub fn tag(mut self, predicate: impl Into<Predicate>) -> Self {
        self.tag = Some(predicate.into());
        self
    }

    pub fn arch(mut self, predicate: impl Into<Predicate>) -> Self {
        self.arch = Some(predicate.into());
        self
    }

    pub fn os(mut self, predicate: impl Into<Predicate>) -> Self {
        self.os = Some(predicate.into());
        self
    }

    pub fn variant(mut self, predicate: impl Into<Predicate>) -> Self {
        self.variant = Some(predicate.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, image: &ImageNode) -> bool {
        let check = |predicate: &Option<Predicate>, value: &str| {
            predicate.as_ref().is_none_or(|p| p.matches(value))
        };

        check(&self.name, image.name())
            && check(&self.tag, image.tag().unwrap_or_default())
            && check(&self.arch, image.arch())
            && check(&self.os, image.os())
            && check(&self.variant, image.variant().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_is_a_configuration_error() {
        let err = ImageFilter::from_pairs([("arch", "amd64"), ("distro", "ubuntu")]).unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("distro")));
    }

    #[test]
    fn test_from_pairs_matches_builder() {
        let parsed = ImageFilter::from_pairs([("arch", "amd64"), ("tag", "worker")]).unwrap();
        assert_eq!(parsed, ImageFilter::new().arch("amd64").tag("worker"));
        assert!(!parsed.is_empty());
        assert!(ImageFilter::new().is_empty());
    }

    #[test]
    fn test_any_of() {
        let predicate = Predicate::any_of(["worker", "latest"]);
        assert!(predicate.matches("worker"));
        assert!(!predicate.matches("jupyter"));
    }
}
