use regex::Regex;

/// A name from an allow-list. Names containing `*` match like shell globs.
#[derive(Debug, Clone)]
pub enum Pattern {
    Exact(String),
    Glob(Regex),
}

impl Pattern {
    pub fn new(pattern: &str) -> Pattern {
        if !pattern.contains('*') {
            return Pattern::Exact(pattern.to_owned());
        }

        let expression = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));
        match Regex::new(&expression) {
            Ok(regex) => Pattern::Glob(regex),
            Err(error) => {
                log::warn!("glob {:?} did not compile, matching it literally: {}", pattern, error);
                Pattern::Exact(pattern.to_owned())
            }
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Pattern::Exact(name) => name == candidate,
            Pattern::Glob(regex) => regex.is_match(candidate),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_names() {
        let pattern = Pattern::new("href");
        assert!(pattern.matches("href"));
        assert!(!pattern.matches("hreflang"));
    }

    #[test]
    fn prefix_globs() {
        let pattern = Pattern::new("data-*");
        assert!(pattern.matches("data-id"));
        assert!(pattern.matches("data-"));
        assert!(!pattern.matches("x-data-id"));
    }

    #[test]
    fn glob_escapes_regex_syntax() {
        let pattern = Pattern::new("col.*");
        assert!(pattern.matches("col.md"));
        assert!(!pattern.matches("colmd"));
    }
}
