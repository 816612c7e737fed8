//! Dependency manifest parsing
//!
//! A manifest is a flat list of dependency specifiers, one per line:
//! a package name optionally followed by a constraint operator and a
//! version (`boto>=2.32.1`). `#` starts a comment, either on its own
//! line or after a specifier. Blank lines are ignored.
//!
//! The `deps` subcommand and the `--manifest` preflight consume this
//! module.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;

/// Manifest parse failure, carrying the offending line
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ManifestError {
    /// 1-based line number
    pub line: usize,
    /// What went wrong
    pub message: String,
}

/// Constraint operators, in source notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `~=` (compatible release)
    Compatible,
}

impl ConstraintOp {
    /// Source notation
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Compatible => "~=",
        }
    }

    fn parse(op: &str) -> Option<Self> {
        match op {
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "~=" => Some(Self::Compatible),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator plus the version it constrains against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Constraint operator
    pub op: ConstraintOp,
    /// Version literal from the manifest
    pub version: String,
}

impl VersionConstraint {
    /// Whether a candidate version satisfies this constraint
    ///
    /// Versions compare segment-wise on `.`; numeric segments compare
    /// numerically with missing segments as zero, non-numeric segments
    /// lexicographically. `~=` pins every supplied segment except the
    /// last.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let ord = cmp_versions(candidate, &self.version);
        match self.op {
            ConstraintOp::Ge => ord != Ordering::Less,
            ConstraintOp::Le => ord != Ordering::Greater,
            ConstraintOp::Eq => ord == Ordering::Equal,
            ConstraintOp::Ne => ord != Ordering::Equal,
            ConstraintOp::Gt => ord == Ordering::Greater,
            ConstraintOp::Lt => ord == Ordering::Less,
            ConstraintOp::Compatible => {
                if ord == Ordering::Less {
                    return false;
                }
                let pinned: Vec<&str> = self.version.split('.').collect();
                if pinned.len() < 2 {
                    return true;
                }
                let prefix = &pinned[..pinned.len() - 1];
                let candidate_segments: Vec<&str> = candidate.split('.').collect();
                prefix.iter().enumerate().all(|(i, seg)| {
                    candidate_segments
                        .get(i)
                        .is_some_and(|c| cmp_segments(c, seg) == Ordering::Equal)
                })
            }
        }
    }
}

impl std::fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

fn cmp_segments(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb),
        _ => a.cmp(b),
    }
}

fn cmp_versions(a: &str, b: &str) -> Ordering {
    let sa: Vec<&str> = a.split('.').collect();
    let sb: Vec<&str> = b.split('.').collect();
    for i in 0..sa.len().max(sb.len()) {
        let ord = cmp_segments(sa.get(i).copied().unwrap_or("0"), sb.get(i).copied().unwrap_or("0"));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

static SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:(?P<op>>=|<=|==|!=|~=|>|<)\s*(?P<version>[A-Za-z0-9][A-Za-z0-9._+-]*))?$",
    )
    .expect("specifier regex compiles")
});

/// One dependency specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// Package name
    pub name: String,
    /// Optional version constraint
    pub constraint: Option<VersionConstraint>,
}

impl FromStr for DependencySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = SPEC_RE
            .captures(trimmed)
            .ok_or_else(|| format!("\"{trimmed}\" is not a valid dependency specifier"))?;
        let name = caps["name"].to_string();
        let constraint = match (caps.name("op"), caps.name("version")) {
            (Some(op), Some(version)) => Some(VersionConstraint {
                // The regex only admits operators ConstraintOp knows
                op: ConstraintOp::parse(op.as_str())
                    .ok_or_else(|| format!("unknown operator \"{}\"", op.as_str()))?,
                version: version.as_str().to_string(),
            }),
            _ => None,
        };
        Ok(Self { name, constraint })
    }
}

impl std::fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}{c}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed dependency manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    specs: Vec<DependencySpec>,
    comments: Vec<(usize, String)>,
}

impl Manifest {
    /// Parse manifest text
    ///
    /// Every non-comment, non-blank line must parse as a specifier.
    ///
    /// # Errors
    /// Returns the first offending line with its 1-based number.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut specs = Vec::new();
        let mut comments = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                comments.push((line_no, comment.trim().to_string()));
                continue;
            }

            // Inline comments: '#' preceded by whitespace
            let content = match line.find(" #") {
                Some(pos) => line[..pos].trim_end(),
                None => line,
            };

            let spec = DependencySpec::from_str(content)
                .map_err(|message| ManifestError { line: line_no, message })?;
            specs.push(spec);
        }

        Ok(Self { specs, comments })
    }

    /// The specifiers, in manifest order
    #[inline]
    #[must_use]
    pub fn specs(&self) -> &[DependencySpec] {
        &self.specs
    }

    /// Retained comment lines with their line numbers
    #[inline]
    #[must_use]
    pub fn comments(&self) -> &[(usize, String)] {
        &self.comments
    }

    /// Look up a specifier by package name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&DependencySpec> {
        self.specs.iter().find(|s| s.name == name)
    }
}
