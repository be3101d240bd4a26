use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Read, Write};

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::StrTendril;
use html5ever::Attribute;
use url::Url;

use crate::arena_dom::{create_text, parse_fragment_into_arena, Arena, NodeData, Ref};
use crate::config::default::{VOID_ELEMENTS, VULNERABLE_TAGS};
use crate::error::SanitizeError;
use crate::options::{AllowList, AttributeRule, DisallowedTagsMode, SanitizationOptions, TagKey};
use crate::pattern::Pattern;

/// Applies a frozen [`SanitizationOptions`] policy to HTML fragments.
///
/// Build one with [`SanitizerBuilder`](crate::SanitizerBuilder). A sanitizer never changes after
/// construction and can be shared freely.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    options: SanitizationOptions,
    attributes: Option<HashMap<TagKey, Vec<CompiledRule>>>,
    classes: HashMap<TagKey, Vec<Pattern>>,
}

#[derive(Debug, Clone)]
enum CompiledRule {
    Name(Pattern),
    Valued {
        name: String,
        multiple: bool,
        values: Vec<String>,
    },
}

/// Where the walk goes after a node has been handled.
enum Step<'arena> {
    /// Continue with this node, which now sits where the handled one was.
    Next(Option<Ref<'arena>>),
    /// The node was kept: visit its children, then its next sibling.
    Descend,
}

impl From<&AttributeRule> for CompiledRule {
    fn from(rule: &AttributeRule) -> Self {
        match rule {
            AttributeRule::Name(name) => CompiledRule::Name(Pattern::new(name)),
            AttributeRule::Valued {
                name,
                multiple,
                values,
            } => CompiledRule::Valued {
                name: name.clone(),
                multiple: *multiple,
                values: values.clone(),
            },
        }
    }
}

enum Source {
    Relative,
    Host(String),
    Invalid,
}

lazy_static! {
    static ref RELATIVE_BASE: Option<Url> = Url::parse("relative://relative-site/").ok();
}

impl Sanitizer {
    pub fn new(options: SanitizationOptions) -> Sanitizer {
        if let AllowList::Restricted(tags) = &options.allowed_tags {
            let vulnerable: Vec<&str> = tags
                .iter()
                .map(String::as_str)
                .filter(|tag| VULNERABLE_TAGS.contains(*tag))
                .collect();
            if !vulnerable.is_empty() && !options.allow_vulnerable_tags {
                log::warn!(
                    "allowing {} opens the door to cross-site scripting; \
                     call disable_warning_for_vulnerable_tags(true) if this is intended",
                    vulnerable.join(", ")
                );
            }
        }

        let attributes = options.allowed_attributes.restricted().map(|map| {
            map.iter()
                .map(|(tag, rules)| (tag.clone(), rules.iter().map(CompiledRule::from).collect()))
                .collect()
        });
        let classes = options
            .allowed_classes
            .iter()
            .map(|(tag, classes)| {
                (
                    tag.clone(),
                    classes.iter().map(|class| Pattern::new(class)).collect(),
                )
            })
            .collect();

        Sanitizer {
            options,
            attributes,
            classes,
        }
    }

    pub fn options(&self) -> &SanitizationOptions {
        &self.options
    }

    /// Sanitizes an HTML fragment held in memory. Never fails: if sanitization cannot
    /// complete, the error is logged and nothing is returned.
    pub fn sanitize_html(&self, html: &str) -> String {
        let mut output = Vec::with_capacity(html.len());
        match self.sanitize_fragment(&mut html.as_bytes(), &mut output) {
            Ok(()) => String::from_utf8_lossy(&output).into_owned(),
            Err(error) => {
                log::error!("failed to sanitize html: {}", error);
                String::new()
            }
        }
    }

    pub fn sanitize_fragment(
        &self,
        input: &mut impl Read,
        output: &mut impl Write,
    ) -> Result<(), SanitizeError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).map_err(SanitizeError::Read)?;
        let bytes = if self.options.enforce_html_boundary {
            html_boundary(&bytes)
        } else {
            &bytes[..]
        };

        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(bytes, &arena);
        let root = match document.first_child.get() {
            Some(root) => root,
            None => return Ok(()),
        };
        self.sanitize_children(root, &arena);

        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        serialize(output, root, opts).map_err(SanitizeError::Serialize)
    }

    /// Walks the subtree below `root` in document order without recursion. Kept elements park
    /// their next sibling on `resume` while their children are visited.
    fn sanitize_children<'arena>(&self, root: Ref<'arena>, arena: Arena<'arena>) {
        let mut resume: Vec<Ref<'arena>> = Vec::new();
        let mut next = root.first_child.get();
        while let Some(node) = next.take().or_else(|| resume.pop()) {
            next = match self.sanitize_node(node, arena) {
                Step::Next(next) => next,
                Step::Descend => {
                    resume.extend(node.next_sibling.get());
                    node.first_child.get()
                }
            };
        }
    }

    fn sanitize_node<'arena>(&self, node: Ref<'arena>, arena: Arena<'arena>) -> Step<'arena> {
        let sibling = node.next_sibling.get();
        let (tag, attrs) = match node.data {
            NodeData::Text { .. } => return Step::Next(sibling),
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => (&*name.local, attrs),
            NodeData::Document
            | NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => {
                log::trace!("removing {}", node.data);
                node.detach();
                return Step::Next(sibling);
            }
        };
        node.adopt_template_contents();

        if self.options.allows_tag(tag) {
            self.filter_attributes(tag, &mut attrs.borrow_mut());
            return Step::Descend;
        }

        Step::Next(match self.options.disallowed_tags_mode() {
            DisallowedTagsMode::Discard if self.options.is_non_text_tag(tag) => {
                log::trace!("removing <{}> and its content", tag);
                node.detach();
                sibling
            }
            DisallowedTagsMode::Discard => {
                log::trace!("unwrapping <{}>", tag);
                node.unwrap().or(sibling)
            }
            DisallowedTagsMode::Escape => {
                log::trace!("escaping <{}>", tag);
                let start_tag = self.escaped_start_tag(tag, &attrs.borrow());
                node.insert_before(create_text(arena, &start_tag));
                if !VOID_ELEMENTS.contains(tag) {
                    node.append(create_text(arena, &format!("</{}>", tag)));
                }
                node.unwrap().or(sibling)
            }
        })
    }

    fn escaped_start_tag(&self, tag: &str, attrs: &[Attribute]) -> String {
        let mut markup = format!("<{}", tag);
        for attr in attrs {
            if let Some(value) = self.filter_attribute(tag, &attr.name.local, &attr.value) {
                markup.push_str(&format!(
                    " {}=\"{}\"",
                    &*attr.name.local,
                    value.replace('&', "&amp;").replace('"', "&quot;")
                ));
            }
        }
        markup.push_str(if VOID_ELEMENTS.contains(tag) { " />" } else { ">" });
        markup
    }

    fn filter_attributes(&self, tag: &str, attrs: &mut Vec<Attribute>) {
        attrs.retain_mut(|attr| {
            let filtered = match self.filter_attribute(tag, &attr.name.local, &attr.value) {
                None => return false,
                Some(Cow::Borrowed(_)) => return true,
                Some(Cow::Owned(value)) => value,
            };
            attr.value = StrTendril::from(filtered);
            true
        });
    }

    /// The value `name` keeps on `tag`, or `None` when the attribute must go.
    fn filter_attribute<'v>(&self, tag: &str, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        let class_patterns = if name == "class" {
            self.class_patterns(tag)
        } else {
            Vec::new()
        };

        let mut value = match self.match_attribute_rules(tag, name, value) {
            Some(value) => {
                // An explicitly allowed class attribute keeps every class.
                if name == "class" {
                    return self.check_url(tag, name, value);
                }
                value
            }
            None if !class_patterns.is_empty() => Cow::Borrowed(value),
            None => return None,
        };

        if !class_patterns.is_empty() {
            let classes: Vec<&str> = value
                .split_whitespace()
                .filter(|class| class_patterns.iter().any(|pattern| pattern.matches(class)))
                .collect();
            if classes.is_empty() {
                return None;
            }
            value = Cow::Owned(classes.join(" "));
        }

        self.check_url(tag, name, value)
    }

    fn match_attribute_rules<'v>(&self, tag: &str, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        let map = match &self.attributes {
            None => return Some(Cow::Borrowed(value)),
            Some(map) => map,
        };

        let rules: Vec<&CompiledRule> = map
            .get(&TagKey::from(tag))
            .into_iter()
            .flatten()
            .chain(map.get(&TagKey::Wildcard).into_iter().flatten())
            .collect();

        let by_name = rules.iter().any(|rule| match rule {
            CompiledRule::Name(pattern) => pattern.matches(name),
            CompiledRule::Valued { .. } => false,
        });
        if by_name {
            return Some(Cow::Borrowed(value));
        }

        rules.iter().find_map(|rule| match rule {
            CompiledRule::Valued {
                name: rule_name,
                multiple,
                values,
            } if rule_name == name => {
                let allowed = |candidate: &str| values.iter().any(|value| value == candidate);
                if *multiple {
                    let kept: Vec<&str> = value.split(' ').filter(|token| allowed(token)).collect();
                    if kept.is_empty() {
                        None
                    } else {
                        Some(Cow::Owned(kept.join(" ")))
                    }
                } else if allowed(value) {
                    Some(Cow::Borrowed(value))
                } else {
                    None
                }
            }
            _ => None,
        })
    }

    fn class_patterns(&self, tag: &str) -> Vec<&Pattern> {
        self.classes
            .get(&TagKey::from(tag))
            .into_iter()
            .flatten()
            .chain(self.classes.get(&TagKey::Wildcard).into_iter().flatten())
            .collect()
    }

    fn check_url<'v>(&self, tag: &str, name: &str, value: Cow<'v, str>) -> Option<Cow<'v, str>> {
        let applies = self
            .options
            .allowed_schemes_applied_to_attributes
            .iter()
            .any(|attribute| attribute == name);
        if applies && self.is_naughty_href(tag, &value) {
            log::trace!("dropping {} with disallowed scheme on <{}>", name, tag);
            return None;
        }
        if name == "srcset" && srcset_urls(&value).any(|url| self.is_naughty_href(tag, url)) {
            log::trace!("dropping srcset with disallowed scheme on <{}>", tag);
            return None;
        }

        if name == "src" {
            let allowed = match tag {
                "iframe" => is_allowed_source(
                    &value,
                    self.options.allowed_iframe_domains.as_deref(),
                    self.options.allowed_iframe_hostnames.as_deref(),
                ),
                "script" => is_allowed_source(
                    &value,
                    self.options.allowed_script_domains.as_deref(),
                    self.options.allowed_script_hostnames.as_deref(),
                ),
                _ => true,
            };
            if !allowed {
                log::trace!("dropping src of <{}> from a host that is not allowed", tag);
                return None;
            }
        }

        Some(value)
    }

    fn is_naughty_href(&self, tag: &str, href: &str) -> bool {
        let cleaned: String = href
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect();

        let scheme = match scheme_of(&cleaned) {
            Some(scheme) => scheme,
            None => {
                let protocol_relative = cleaned.starts_with("//")
                    || cleaned.starts_with("\\\\")
                    || cleaned.starts_with("/\\")
                    || cleaned.starts_with("\\/");
                return protocol_relative && !self.options.allow_protocol_relative;
            }
        };

        let allowed = self
            .options
            .allowed_schemes_by_tag
            .get(tag)
            .unwrap_or(&self.options.allowed_schemes);
        !allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
    }
}

fn scheme_of(url: &str) -> Option<&str> {
    let scheme = &url[..url.find(':')?];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'));
    if valid {
        Some(scheme)
    } else {
        None
    }
}

/// The URL of every candidate in a `srcset` list such as `a.png 1x, b.png 2x`.
fn srcset_urls(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
}

fn classify_source(value: &str) -> Source {
    let value = value.trim();
    if value.to_ascii_lowercase().starts_with("relative:") {
        return Source::Invalid;
    }
    let base = match RELATIVE_BASE.as_ref() {
        Some(base) => base,
        None => return Source::Invalid,
    };
    match base.join(value) {
        Ok(url) if url.scheme() == "relative" && url.host_str() == Some("relative-site") => {
            Source::Relative
        }
        Ok(url) => match url.host_str() {
            Some(host) => Source::Host(host.to_ascii_lowercase()),
            None => Source::Invalid,
        },
        Err(_) => Source::Invalid,
    }
}

/// With no domain or hostname list every source passes. Otherwise only absolute URLs whose
/// host is listed, or lies under a listed domain, do.
fn is_allowed_source(value: &str, domains: Option<&[String]>, hostnames: Option<&[String]>) -> bool {
    if domains.is_none() && hostnames.is_none() {
        return true;
    }

    match classify_source(value) {
        Source::Relative | Source::Invalid => false,
        Source::Host(host) => {
            let by_hostname = hostnames
                .unwrap_or_default()
                .iter()
                .any(|hostname| hostname.eq_ignore_ascii_case(&host));
            let by_domain = domains.unwrap_or_default().iter().any(|domain| {
                let domain = domain.to_ascii_lowercase();
                host == domain || host.ends_with(&format!(".{}", domain))
            });
            by_hostname || by_domain
        }
    }
}

/// Everything from the first `<html` to the end of the last `</html>`, when both exist.
fn html_boundary(bytes: &[u8]) -> &[u8] {
    let start = find_ignore_case(bytes, b"<html", false);
    let end = find_ignore_case(bytes, b"</html>", true);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &bytes[start..end + b"</html>".len()],
        _ => bytes,
    }
}

fn find_ignore_case(haystack: &[u8], needle: &[u8], last: bool) -> Option<usize> {
    let mut positions = haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| window.eq_ignore_ascii_case(needle))
        .map(|(position, _)| position);
    if last {
        positions.last()
    } else {
        positions.next()
    }
}
