//! Width breakpoints and the media query lists that watch them.
//!
//! An environment that can evaluate media queries implements [`MediaEnvironment`]. [`Viewport`]
//! is the in-process one: it tracks a single width and notifies listeners whenever a resize
//! flips the result of their query.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::error::{MediaError, Unavailable};

pub const XL_WIDTH: u32 = 1200;
pub const LG_WIDTH: u32 = 980;
pub const MD_WIDTH: u32 = 768;
pub const SM_WIDTH: u32 = 600;
pub const XS_WIDTH: u32 = 320;

/// Subtracted from `max-width` queries so that a `Down` and an `Up` breakpoint on the same
/// width never match at the same time.
pub const HALF_PIXEL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Breakpoint {
    DownXl,
    DownLg,
    DownMd,
    DownSm,
    DownXs,
    UpXl,
    UpLg,
    UpMd,
    UpSm,
    UpXs,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 10] = [
        Breakpoint::DownXl,
        Breakpoint::DownLg,
        Breakpoint::DownMd,
        Breakpoint::DownSm,
        Breakpoint::DownXs,
        Breakpoint::UpXl,
        Breakpoint::UpLg,
        Breakpoint::UpMd,
        Breakpoint::UpSm,
        Breakpoint::UpXs,
    ];

    pub fn width(self) -> u32 {
        match self {
            Breakpoint::DownXl | Breakpoint::UpXl => XL_WIDTH,
            Breakpoint::DownLg | Breakpoint::UpLg => LG_WIDTH,
            Breakpoint::DownMd | Breakpoint::UpMd => MD_WIDTH,
            Breakpoint::DownSm | Breakpoint::UpSm => SM_WIDTH,
            Breakpoint::DownXs | Breakpoint::UpXs => XS_WIDTH,
        }
    }

    pub fn is_down(self) -> bool {
        matches!(
            self,
            Breakpoint::DownXl
                | Breakpoint::DownLg
                | Breakpoint::DownMd
                | Breakpoint::DownSm
                | Breakpoint::DownXs
        )
    }

    pub fn query(self) -> String {
        if self.is_down() {
            format!("(max-width:{}px)", f64::from(self.width()) - HALF_PIXEL)
        } else {
            format!("(min-width:{}px)", self.width())
        }
    }

    fn name(self) -> &'static str {
        match self {
            Breakpoint::DownXl => "DOWN_XL",
            Breakpoint::DownLg => "DOWN_LG",
            Breakpoint::DownMd => "DOWN_MD",
            Breakpoint::DownSm => "DOWN_SM",
            Breakpoint::DownXs => "DOWN_XS",
            Breakpoint::UpXl => "UP_XL",
            Breakpoint::UpLg => "UP_LG",
            Breakpoint::UpMd => "UP_MD",
            Breakpoint::UpSm => "UP_SM",
            Breakpoint::UpXs => "UP_XS",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Breakpoint {
    type Err = MediaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Breakpoint::ALL
            .iter()
            .copied()
            .find(|breakpoint| breakpoint.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| MediaError::Unsupported(name.to_owned()))
    }
}

/// A parsed media query. Only media types and `min-width`/`max-width` in pixels are understood.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    media_type: Option<String>,
    min_width: Option<f64>,
    max_width: Option<f64>,
}

impl MediaQuery {
    pub fn matches(&self, width: f64) -> bool {
        let type_matches = match self.media_type.as_deref() {
            None | Some("all") | Some("screen") => true,
            Some(_) => false,
        };
        type_matches
            && self.min_width.map_or(true, |min| width >= min)
            && self.max_width.map_or(true, |max| width <= max)
    }
}

impl FromStr for MediaQuery {
    type Err = MediaError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        let unsupported = || MediaError::Unsupported(query.to_owned());
        let normalized = query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(unsupported());
        }

        let mut parsed = MediaQuery {
            media_type: None,
            min_width: None,
            max_width: None,
        };
        for (position, part) in normalized.split(" and ").enumerate() {
            if part.starts_with('(') {
                let (feature, width) = width_feature(part).ok_or_else(unsupported)?;
                match feature {
                    "min-width" => parsed.min_width = Some(width),
                    _ => parsed.max_width = Some(width),
                }
                continue;
            }

            if position > 0 {
                return Err(unsupported());
            }
            let media_type = match part.split(' ').collect::<Vec<_>>()[..] {
                ["only", media_type] | [media_type] => media_type,
                _ => return Err(unsupported()),
            };
            parsed.media_type = Some(media_type.to_owned());
        }
        Ok(parsed)
    }
}

/// `(min-width: 600px)` or `(max-width: 599.5px)`.
fn width_feature(part: &str) -> Option<(&str, f64)> {
    let (feature, value) = part
        .strip_prefix('(')?
        .strip_suffix(')')?
        .split_once(':')?;
    let feature = feature.trim();
    if feature != "min-width" && feature != "max-width" {
        return None;
    }
    let width: f64 = value.trim().strip_suffix("px")?.trim_end().parse().ok()?;
    if width.is_finite() && width >= 0.0 {
        Some((feature, width))
    } else {
        None
    }
}

/// Passed to listeners when the result of a query changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQueryEvent {
    pub media: String,
    pub matches: bool,
}

pub type ListenerId = usize;

/// The event is `None` when a handler is applied right after being registered.
pub type MediaQueryHandler = Rc<dyn Fn(Option<&MediaQueryEvent>, &dyn MediaQueryList)>;

pub trait MediaQueryList {
    fn media(&self) -> &str;
    fn matches(&self) -> bool;
    /// Registers `handler`. A handler that is already registered is moved to the end instead
    /// of being added twice.
    fn add_listener(&self, handler: MediaQueryHandler) -> ListenerId;
    fn remove_listener(&self, id: ListenerId) -> bool;
}

pub trait MediaEnvironment {
    fn match_media(&self, query: &str) -> Result<Rc<dyn MediaQueryList>, MediaError>;
}

/// An environment without any media support, such as a server rendering pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl MediaEnvironment for Headless {
    fn match_media(&self, _: &str) -> Result<Rc<dyn MediaQueryList>, MediaError> {
        Err(MediaError::NotSupported)
    }
}

/// A single resizable viewport.
#[derive(Debug, Clone)]
pub struct Viewport {
    state: Rc<ViewportState>,
}

#[derive(Debug)]
struct ViewportState {
    width: Cell<f64>,
    queries: RefCell<Vec<Weak<ViewportQuery>>>,
}

struct ViewportQuery {
    media: String,
    query: MediaQuery,
    matches: Cell<bool>,
    listeners: RefCell<Vec<(ListenerId, MediaQueryHandler)>>,
    next_id: Cell<ListenerId>,
}

impl fmt::Debug for ViewportQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportQuery")
            .field("media", &self.media)
            .field("matches", &self.matches.get())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl MediaQueryList for ViewportQuery {
    fn media(&self) -> &str {
        &self.media
    }

    fn matches(&self) -> bool {
        self.matches.get()
    }

    fn add_listener(&self, handler: MediaQueryHandler) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|(_, existing)| !Rc::ptr_eq(existing, &handler));
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        listeners.push((id, handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

impl Viewport {
    pub fn new(width: f64) -> Viewport {
        Viewport {
            state: Rc::new(ViewportState {
                width: Cell::new(width),
                queries: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn width(&self) -> f64 {
        self.state.width.get()
    }

    /// Changes the width and notifies the listeners of every query whose result flipped.
    pub fn resize(&self, width: f64) {
        self.state.width.set(width);

        let queries: Vec<Rc<ViewportQuery>> = {
            let mut queries = self.state.queries.borrow_mut();
            queries.retain(|query| query.strong_count() > 0);
            queries.iter().filter_map(Weak::upgrade).collect()
        };

        for query in queries {
            let matches = query.query.matches(width);
            if matches == query.matches.get() {
                continue;
            }
            query.matches.set(matches);
            log::trace!("media query {} now matches: {}", query.media, matches);

            let event = MediaQueryEvent {
                media: query.media.clone(),
                matches,
            };
            let handlers: Vec<MediaQueryHandler> = query
                .listeners
                .borrow()
                .iter()
                .map(|(_, handler)| Rc::clone(handler))
                .collect();
            for handler in handlers {
                handler(Some(&event), &*query);
            }
        }
    }
}

impl MediaEnvironment for Viewport {
    fn match_media(&self, media: &str) -> Result<Rc<dyn MediaQueryList>, MediaError> {
        let query: MediaQuery = media.parse()?;
        let list = Rc::new(ViewportQuery {
            media: media.to_owned(),
            matches: Cell::new(query.matches(self.width())),
            query,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        });
        self.state.queries.borrow_mut().push(Rc::downgrade(&list));
        Ok(list)
    }
}

/// Evaluates `query` in `env`. Failures are logged.
pub fn media_matcher(
    env: &dyn MediaEnvironment,
    query: &str,
) -> Result<Rc<dyn MediaQueryList>, Unavailable> {
    env.match_media(query).map_err(|error| {
        log::error!("could not create media matcher: {}", error);
        Unavailable
    })
}

pub fn breakpoint_matcher(
    env: &dyn MediaEnvironment,
    breakpoint: Breakpoint,
) -> Result<Rc<dyn MediaQueryList>, Unavailable> {
    media_matcher(env, &breakpoint.query())
}

pub fn add_media_query_listener(
    matcher: &dyn MediaQueryList,
    handler: MediaQueryHandler,
    apply_immediately: bool,
) -> ListenerId {
    let id = matcher.add_listener(Rc::clone(&handler));
    if apply_immediately {
        handler(None, matcher);
    }
    id
}

pub fn remove_media_query_listener(matcher: &dyn MediaQueryList, id: ListenerId) -> bool {
    matcher.remove_listener(id)
}
