#![warn(clippy::all)]
//! Allow-list HTML sanitization built on html5ever, configured through a fluent
//! [`SanitizerBuilder`], plus the small browser-side helpers that usually travel with it:
//! failure-tolerant key/value storage, breakpoint media matchers and string/object helpers.

#[macro_use]
extern crate html5ever;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate maplit;

mod arena_dom;
pub mod builder;
pub mod config;
pub mod error;
pub mod media;
pub mod options;
mod pattern;
pub mod sanitizer;
pub mod storage;
pub mod text;

pub use builder::{Merge, SanitizerBuilder};
pub use error::{MediaError, PolicyError, SanitizeError, StorageError, Unavailable};
pub use options::{AllowList, AttributeRule, DisallowedTagsMode, SanitizationOptions, TagKey};
pub use sanitizer::Sanitizer;
