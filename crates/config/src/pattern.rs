//! Include pattern validation.
//!
//! The include pattern is user input that ends up evaluated against every
//! document path in the vault. Patterns are screened with the same heuristic
//! as the `safe-regex` family of checkers before they are compiled: a star
//! height above one (a repetition nested inside another repetition, such as
//! `(a+)+`) or more than [`MAX_REPETITIONS`] repetition operators in total is
//! rejected as [`UnsafePattern`](ErrorKind::UnsafePattern).

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use regex_syntax::hir::{Hir, HirKind};
use std::fmt;
use std::str::FromStr;

/// Maximum number of repetition operators allowed in one pattern.
pub const MAX_REPETITIONS: usize = 25;

/// A compiled include pattern that has passed the safety screen.
///
/// The only way to obtain one is through [`IncludePattern::new`] (or
/// [`FromStr`]), so anything holding an `IncludePattern` is holding a
/// validated regex.
#[derive(Clone, Debug)]
pub struct IncludePattern(Regex);

impl IncludePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let hir = regex_syntax::Parser::new()
            .parse(pattern)
            .or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?;
        let mut stats = Stats::default();
        stats.visit(&hir, 0);
        if stats.star_height > 1 || stats.repetitions > MAX_REPETITIONS {
            tracing::debug!(pattern, star_height = stats.star_height, repetitions = stats.repetitions, "Rejected pattern");
            exn::bail!(ErrorKind::UnsafePattern(pattern.to_string()));
        }
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?;
        Ok(Self(regex))
    }

    /// Returns `true` if the document path matches anywhere.
    pub fn is_match(&self, path: &str) -> bool {
        self.0.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
impl FromStr for IncludePattern {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl fmt::Display for IncludePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct Stats {
    star_height: usize,
    repetitions: usize,
}
impl Stats {
    fn visit(&mut self, hir: &Hir, depth: usize) {
        match hir.kind() {
            HirKind::Repetition(rep) => {
                // `?` and `{0,1}` cannot backtrack exponentially on their own.
                let depth = match rep.max {
                    Some(max) if max <= 1 => depth,
                    _ => depth + 1,
                };
                self.repetitions += 1;
                self.star_height = self.star_height.max(depth);
                self.visit(&rep.sub, depth);
            },
            HirKind::Capture(capture) => self.visit(&capture.sub, depth),
            HirKind::Concat(children) | HirKind::Alternation(children) => {
                for child in children {
                    self.visit(child, depth);
                }
            },
            HirKind::Empty | HirKind::Literal(_) | HirKind::Class(_) | HirKind::Look(_) => {},
        }
    }
}
