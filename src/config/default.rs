use std::collections::{HashMap, HashSet};

/// Tags a fresh policy allows. Safe structural and inline formatting elements only.
pub const ALLOWED_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "footer",
    "header",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hgroup",
    "main",
    "nav",
    "section",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "ul",
    "a",
    "abbr",
    "b",
    "bdi",
    "bdo",
    "br",
    "cite",
    "code",
    "data",
    "dfn",
    "em",
    "i",
    "kbd",
    "mark",
    "q",
    "rb",
    "rp",
    "rt",
    "rtc",
    "ruby",
    "s",
    "samp",
    "small",
    "span",
    "strong",
    "sub",
    "sup",
    "time",
    "u",
    "var",
    "wbr",
    "caption",
    "col",
    "colgroup",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
];

pub const NON_TEXT_TAGS: &[&str] = &["style", "script", "option", "textarea"];

pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto", "tel"];

pub const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

lazy_static! {
    pub static ref ALLOWED_ATTRIBUTES: HashMap<&'static str, Vec<&'static str>> = hashmap! {
        "a" => vec!["href", "name", "target"],
        "img" => vec!["src", "srcset", "alt", "title", "width", "height", "loading"],
    };
    /// Elements the serializer writes without an end tag.
    pub static ref VOID_ELEMENTS: HashSet<&'static str> = hashset! {
        "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img",
        "input", "keygen", "link", "meta", "param", "source", "track", "wbr",
    };
    pub static ref VULNERABLE_TAGS: HashSet<&'static str> = hashset! {
        "script",
        "style",
    };
}
