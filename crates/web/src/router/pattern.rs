//! Path pattern compilation.
//!
//! A route path is declared with `/`-separated segments of word characters, `-`
//! and `.`, where a segment that is exactly `*` is a wildcard:
//!
//! - a trailing `/*` matches zero or more further segments
//! - a `*` anywhere else matches exactly one segment
//!
//! Every pattern also accepts an optional trailing slash. Paths are lower-cased
//! when normalized and matched case-insensitively.
//!
//! ```
//! use vireo_web::router::PathPattern;
//!
//! let pattern = PathPattern::compile("/Users/*/posts").unwrap();
//! assert_eq!(pattern.path(), "/users/*/posts");
//! assert!(pattern.is_match("/users/42/posts/"));
//! assert!(!pattern.is_match("/users/42/drafts/posts"));
//! ```

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

/// One path segment: word characters, `-` or `.`.
const SEGMENT: &str = r"[A-Za-z0-9_\-.]+";

static PATH_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((/?[A-Za-z0-9_\-.]+)|(/\*))*(/\*)?$").expect("path spec grammar must compile"));

#[derive(Debug, Clone)]
pub struct PathPattern {
    path: String,
    regex: Regex,
    wildcard: bool,
    literal_segments: usize,
}

impl PathPattern {
    /// Normalizes a path spec: lower-cased, one leading slash, no trailing slash.
    ///
    /// # Errors
    ///
    /// Returns error if the spec is empty or contains characters outside the path grammar.
    pub fn normalize(spec: &str) -> Result<String, ValidationError> {
        if spec.is_empty() {
            return Err(ValidationError::EmptyPath);
        }

        let path = format!("/{}", spec.to_ascii_lowercase().trim_matches('/'));
        if path != "/" && !PATH_SPEC.is_match(&path) {
            return Err(ValidationError::IllegalPath { path: spec.to_string() });
        }

        Ok(path)
    }

    /// Compiles a path spec into an anchored matcher.
    ///
    /// # Errors
    ///
    /// Returns error if the spec fails [`normalize`](Self::normalize).
    pub fn compile(spec: &str) -> Result<Self, ValidationError> {
        let path = Self::normalize(spec)?;
        let wildcard = path.ends_with("/*");

        let mut source = regex::escape(&path);
        if wildcard {
            // drop the escaped trailing `/\*`
            source.truncate(source.len() - 3);
            source.push_str("(?:/");
            source.push_str(SEGMENT);
            source.push_str(")*");
        }
        source.push_str("/?");
        let source = format!("(?i)^{}$", source.replace(r"\*", SEGMENT));

        let regex = Regex::new(&source).map_err(|e| ValidationError::Pattern { path: path.clone(), source: e })?;

        let segments = path.split('/').filter(|segment| !segment.is_empty()).count();
        let literal_segments = if wildcard { segments - 1 } else { segments };

        Ok(Self { path, regex, wildcard, literal_segments })
    }

    /// Tests a request path (without query string) against this pattern.
    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The normalized path spec.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The compiled regular expression source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the path ends with the `/*` wildcard segment.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Number of path segments before the trailing wildcard.
    pub fn literal_segments(&self) -> usize {
        self.literal_segments
    }
}
