//! Fluent construction of a [`SanitizationOptions`] policy.
//!
//! Every method consumes the builder and hands back the updated one, so a policy is
//! assembled as a single chain:
//!
//! ```
//! use htmlguard::{Merge, SanitizerBuilder};
//!
//! let sanitizer = SanitizerBuilder::new()
//!     .allow_tags(vec!["img"], Merge::Append)
//!     .allow_attributes(vec!["href", "data-*"], "img", Merge::Append)
//!     .build();
//! assert_eq!(sanitizer.sanitize_html("<b>bold</b><font>x</font>"), "<b>bold</b>x");
//! ```

use crate::options::{
    AllowList, AttributeMap, AttributeRule, DisallowedTagsMode, SanitizationOptions, TagKey,
};
use crate::sanitizer::Sanitizer;

/// How a call combines its arguments with what the policy already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Append,
    Replace,
}

impl Default for Merge {
    fn default() -> Self {
        Merge::Append
    }
}

#[derive(Debug, Clone, Default)]
pub struct SanitizerBuilder {
    options: SanitizationOptions,
}

impl SanitizerBuilder {
    pub fn new() -> SanitizerBuilder {
        SanitizerBuilder::default()
    }

    pub fn with_mode(disallowed_tags_mode: DisallowedTagsMode) -> SanitizerBuilder {
        SanitizerBuilder {
            options: SanitizationOptions::new(disallowed_tags_mode),
        }
    }

    /// Continues from an existing policy, e.g. one loaded from a JSON file.
    pub fn from_options(options: SanitizationOptions) -> SanitizerBuilder {
        SanitizerBuilder { options }
    }

    pub fn options(&self) -> &SanitizationOptions {
        &self.options
    }

    pub fn allow_all_tags(mut self) -> Self {
        self.options.allowed_tags = AllowList::Unrestricted;
        self
    }

    pub fn allow_all_attributes(mut self) -> Self {
        self.options.allowed_attributes = AllowList::Unrestricted;
        self
    }

    /// Adds tags to the allow-list. Replaces the list instead when asked to, or when every
    /// tag is currently allowed.
    pub fn allow_tags<I, S>(mut self, tags: I, merge: Merge) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into);
        match (merge, &mut self.options.allowed_tags) {
            (Merge::Append, AllowList::Restricted(existing)) => union_into(existing, tags),
            _ => {
                let mut replaced = Vec::new();
                union_into(&mut replaced, tags);
                self.options.allowed_tags = AllowList::Restricted(replaced);
            }
        }
        self
    }

    /// Allows attributes on `tag` (`"*"` for every tag). Appending keeps duplicates.
    /// Replacing, or adding to an unrestricted policy, leaves `tag` as the only entry.
    pub fn allow_attributes<I, R, K>(mut self, rules: I, tag: K, merge: Merge) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<AttributeRule>,
        K: Into<TagKey>,
    {
        let tag = tag.into();
        let rules: Vec<AttributeRule> = rules.into_iter().map(Into::into).collect();
        match (merge, &mut self.options.allowed_attributes) {
            (Merge::Append, AllowList::Restricted(map)) => {
                map.entry(tag).or_insert_with(Vec::new).extend(rules);
            }
            _ => {
                let mut map = AttributeMap::new();
                map.insert(tag, rules);
                self.options.allowed_attributes = AllowList::Restricted(map);
            }
        }
        self
    }

    /// Tags whose whole content is dropped along with them when they are discarded.
    pub fn allow_non_text_tags<I, S>(mut self, tags: I, merge: Merge) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if merge == Merge::Replace {
            self.options.non_text_tags.clear();
        }
        union_into(&mut self.options.non_text_tags, tags.into_iter().map(Into::into));
        self
    }

    /// Sets the class names (globs allowed) permitted on `tag`, replacing earlier ones.
    pub fn allow_css_classes<I, S, K>(mut self, classes: I, tag: K) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: Into<TagKey>,
    {
        self.options
            .allowed_classes
            .insert(tag.into(), classes.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts iframe sources to the given domains and hostnames and allows `iframe`
    /// with its `src` attribute.
    pub fn set_iframe_filters<D, H>(mut self, domains: D, hostnames: H) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        self.options.allowed_iframe_domains = Some(domains.into_iter().map(Into::into).collect());
        self.options.allowed_iframe_hostnames =
            Some(hostnames.into_iter().map(Into::into).collect());
        self.allow_tags(vec!["iframe"], Merge::Append)
            .allow_attributes(vec!["src"], "iframe", Merge::Append)
    }

    pub fn allow_url_schemes<I, S>(mut self, schemes: I, merge: Merge) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if merge == Merge::Replace {
            self.options.allowed_schemes.clear();
        }
        self.options
            .allowed_schemes
            .extend(schemes.into_iter().map(Into::into));
        self
    }

    /// Schemes for `tag` only. They replace the global list for that tag.
    pub fn allow_url_schemes_for_tag<I, S>(mut self, schemes: I, tag: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.allowed_schemes_by_tag.insert(
            tag.to_ascii_lowercase(),
            schemes.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Restricts script sources to the given domains and hostnames and allows `script`
    /// with its `src` attribute.
    pub fn allow_scripts<D, H>(mut self, domains: D, hostnames: H) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        self.options.allowed_script_domains = Some(domains.into_iter().map(Into::into).collect());
        self.options.allowed_script_hostnames =
            Some(hostnames.into_iter().map(Into::into).collect());
        self.allow_tags(vec!["script"], Merge::Append)
            .allow_attributes(vec!["src"], "script", Merge::Append)
    }

    /// Sets whether everything outside of the `<html>` element is discarded.
    pub fn allow_text_outside_of_html(mut self, flag: bool) -> Self {
        self.options.enforce_html_boundary = flag;
        self
    }

    pub fn disable_warning_for_vulnerable_tags(mut self, flag: bool) -> Self {
        self.options.allow_vulnerable_tags = flag;
        self
    }

    /// Freezes a copy of the current policy into a [`Sanitizer`]. The policy is not validated.
    pub fn build(&self) -> Sanitizer {
        Sanitizer::new(self.options.clone())
    }
}

fn union_into<I>(target: &mut Vec<String>, values: I)
where
    I: IntoIterator<Item = String>,
{
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}
