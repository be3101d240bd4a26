use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::config::default::{
    ALLOWED_ATTRIBUTES, ALLOWED_SCHEMES, ALLOWED_TAGS, NON_TEXT_TAGS, URL_ATTRIBUTES,
};
use crate::error::PolicyError;

/// What happens to the markup of an element that is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisallowedTagsMode {
    /// Drop the tag. Its content survives unless the tag is a non-text tag.
    Discard,
    /// Render the tag as literal, escaped text.
    Escape,
}

impl Default for DisallowedTagsMode {
    fn default() -> Self {
        DisallowedTagsMode::Discard
    }
}

/// Either no restriction at all, or an explicit allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowList<T> {
    Unrestricted,
    Restricted(T),
}

impl<T> AllowList<T> {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AllowList::Unrestricted)
    }

    pub fn restricted(&self) -> Option<&T> {
        match self {
            AllowList::Unrestricted => None,
            AllowList::Restricted(list) => Some(list),
        }
    }
}

/// Key of the per-tag maps: a concrete tag name or `*` for every tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagKey {
    Wildcard,
    Tag(String),
}

impl TagKey {
    pub fn as_str(&self) -> &str {
        match self {
            TagKey::Wildcard => "*",
            TagKey::Tag(name) => name,
        }
    }
}

impl From<&str> for TagKey {
    fn from(name: &str) -> Self {
        if name == "*" {
            TagKey::Wildcard
        } else {
            TagKey::Tag(name.to_ascii_lowercase())
        }
    }
}

impl From<String> for TagKey {
    fn from(name: String) -> Self {
        TagKey::from(name.as_str())
    }
}

impl From<TagKey> for String {
    fn from(key: TagKey) -> Self {
        match key {
            TagKey::Wildcard => String::from("*"),
            TagKey::Tag(name) => name,
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an attribute allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeRule {
    /// An attribute name. `*` matches any run of characters, so `data-*` allows every data attribute.
    Name(String),
    /// An attribute that may only carry the listed values. With `multiple`, the value is
    /// treated as a space separated list and filtered token by token.
    Valued {
        name: String,
        #[serde(default)]
        multiple: bool,
        values: Vec<String>,
    },
}

impl AttributeRule {
    pub fn valued<S: Into<String>>(name: &str, multiple: bool, values: Vec<S>) -> Self {
        AttributeRule::Valued {
            name: name.to_owned(),
            multiple,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AttributeRule::Name(name) => name,
            AttributeRule::Valued { name, .. } => name,
        }
    }
}

impl From<&str> for AttributeRule {
    fn from(name: &str) -> Self {
        AttributeRule::Name(name.to_owned())
    }
}

impl From<String> for AttributeRule {
    fn from(name: String) -> Self {
        AttributeRule::Name(name)
    }
}

pub type AttributeMap = HashMap<TagKey, Vec<AttributeRule>>;

/// A complete sanitization policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizationOptions {
    pub allowed_tags: AllowList<Vec<String>>,
    pub non_text_tags: Vec<String>,
    pub allowed_attributes: AllowList<AttributeMap>,
    pub allowed_classes: HashMap<TagKey, Vec<String>>,
    pub allowed_iframe_domains: Option<Vec<String>>,
    pub allowed_iframe_hostnames: Option<Vec<String>>,
    pub allowed_schemes: Vec<String>,
    pub allowed_schemes_by_tag: HashMap<String, Vec<String>>,
    pub allowed_schemes_applied_to_attributes: Vec<String>,
    pub allow_protocol_relative: bool,
    pub allowed_script_domains: Option<Vec<String>>,
    pub allowed_script_hostnames: Option<Vec<String>>,
    pub enforce_html_boundary: bool,
    pub allow_vulnerable_tags: bool,
    disallowed_tags_mode: DisallowedTagsMode,
}

impl SanitizationOptions {
    pub fn new(disallowed_tags_mode: DisallowedTagsMode) -> SanitizationOptions {
        let mut allowed_tags: Vec<String> = Vec::with_capacity(ALLOWED_TAGS.len());
        for tag in ALLOWED_TAGS {
            if !allowed_tags.iter().any(|existing| existing == tag) {
                allowed_tags.push((*tag).to_owned());
            }
        }

        let allowed_attributes = ALLOWED_ATTRIBUTES
            .iter()
            .map(|(tag, attributes)| {
                (
                    TagKey::from(*tag),
                    attributes.iter().map(|name| AttributeRule::from(*name)).collect(),
                )
            })
            .collect();

        SanitizationOptions {
            allowed_tags: AllowList::Restricted(allowed_tags),
            non_text_tags: to_strings(NON_TEXT_TAGS),
            allowed_attributes: AllowList::Restricted(allowed_attributes),
            allowed_classes: HashMap::new(),
            allowed_iframe_domains: None,
            allowed_iframe_hostnames: None,
            allowed_schemes: to_strings(ALLOWED_SCHEMES),
            allowed_schemes_by_tag: HashMap::new(),
            allowed_schemes_applied_to_attributes: to_strings(URL_ATTRIBUTES),
            allow_protocol_relative: true,
            allowed_script_domains: None,
            allowed_script_hostnames: None,
            enforce_html_boundary: false,
            allow_vulnerable_tags: false,
            disallowed_tags_mode,
        }
    }

    /// Reads a policy from JSON. Missing fields take their default values.
    pub fn from_json_reader(reader: impl Read) -> Result<SanitizationOptions, PolicyError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn disallowed_tags_mode(&self) -> DisallowedTagsMode {
        self.disallowed_tags_mode
    }

    pub fn allows_tag(&self, name: &str) -> bool {
        match &self.allowed_tags {
            AllowList::Unrestricted => true,
            AllowList::Restricted(tags) => tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)),
        }
    }

    pub fn is_non_text_tag(&self, name: &str) -> bool {
        self.non_text_tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(name))
    }
}

impl Default for SanitizationOptions {
    fn default() -> Self {
        SanitizationOptions::new(DisallowedTagsMode::default())
    }
}

pub(crate) fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_have_no_duplicate_tags() {
        let options = SanitizationOptions::default();
        let tags = options.allowed_tags.restricted().unwrap();
        let mut deduped = tags.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), tags.len());
        assert!(options.allows_tag("H1"));
        assert!(!options.allows_tag("img"));
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let options = SanitizationOptions::default();
        assert_eq!(options.disallowed_tags_mode(), DisallowedTagsMode::Discard);
        assert_eq!(
            options.non_text_tags,
            vec!["style", "script", "option", "textarea"]
        );
        assert_eq!(
            options.allowed_schemes,
            vec!["http", "https", "ftp", "mailto", "tel"]
        );
        assert_eq!(options.allowed_attributes.restricted().unwrap().len(), 2);
        assert!(options.allowed_schemes_by_tag.is_empty());
        assert!(options.allowed_iframe_hostnames.is_none());
    }

    #[test]
    fn wildcard_tag_key() {
        assert_eq!(TagKey::from("*"), TagKey::Wildcard);
        assert_eq!(TagKey::from("IMG"), TagKey::Tag(String::from("img")));
        assert_eq!(String::from(TagKey::Wildcard), "*");
    }

    #[test]
    fn reads_partial_json_policy() {
        let json = r#"{
            "allowed_tags": {"restricted": ["p", "a"]},
            "allowed_attributes": {"restricted": {
                "a": ["href", {"name": "rel", "multiple": true, "values": ["nofollow"]}]
            }},
            "disallowed_tags_mode": "escape"
        }"#;
        let options = SanitizationOptions::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(options.disallowed_tags_mode(), DisallowedTagsMode::Escape);
        assert_eq!(
            options.allowed_tags,
            AllowList::Restricted(vec![String::from("p"), String::from("a")])
        );
        let rules = &options.allowed_attributes.restricted().unwrap()[&TagKey::from("a")];
        assert_eq!(rules[1], AttributeRule::valued("rel", true, vec!["nofollow"]));
        assert_eq!(options.allowed_schemes.len(), 5);
    }

    #[test]
    fn rejects_malformed_policy() {
        let result = SanitizationOptions::from_json_reader(&b"{\"allowed_tags\": 3}"[..]);
        assert!(matches!(result, Err(PolicyError::Parse(_))));
    }
}
