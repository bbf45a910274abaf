//! Version arithmetic over the app's JSON config

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

/// Which part of the version a bump touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Patch,
    Minor,
    Major,
}

impl Part {
    /// Resolve the three mutually exclusive bump flags.
    pub fn from_flags(patch: bool, minor: bool, major: bool) -> Option<Self> {
        match (patch, minor, major) {
            (true, false, false) => Some(Part::Patch),
            (false, true, false) => Some(Part::Minor),
            (false, false, true) => Some(Part::Major),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Version {
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.trim().splitn(3, '.');
        let mut next = |what: &str| -> Result<u64> {
            parts
                .next()
                .with_context(|| format!("version {text:?} is missing its {what} part"))?
                .parse()
                .with_context(|| format!("version {text:?} has a non-numeric {what} part"))
        };
        Ok(Self {
            major: next("major")?,
            minor: next("minor")?,
            patch: next("patch")?,
        })
    }

    /// Bump one part, resetting everything below it.
    pub fn bump(self, part: Part) -> Self {
        match part {
            Part::Patch => Self {
                patch: self.patch + 1,
                ..self
            },
            Part::Minor => Self {
                minor: self.minor + 1,
                patch: 0,
                ..self
            },
            Part::Major => Self {
                major: self.major + 1,
                minor: 0,
                patch: 0,
            },
        }
    }

    pub fn tag(&self) -> String {
        format!("desktop-v{self}")
    }
}

/// Read the version field out of the app's JSON config.
pub fn read(path: &Path) -> Result<Version> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let conf: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let version = conf
        .get("version")
        .and_then(serde_json::Value::as_str)
        .with_context(|| format!("{} has no string \"version\" field", path.display()))?;
    Version::parse(version)
}

/// Rewrite only the version field, keeping the rest of the config
/// intact, with 2-space indentation and a trailing newline.
pub fn write(path: &Path, version: Version) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut conf: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let Some(object) = conf.as_object_mut() else {
        bail!("{} is not a JSON object", path.display());
    };
    object.insert(
        "version".to_string(),
        serde_json::Value::String(version.to_string()),
    );
    let mut rendered = serde_json::to_string_pretty(&conf)?;
    rendered.push('\n');
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
