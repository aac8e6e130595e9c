use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::reporter::Reporter;

// @module: Video id validation and input resolution

/// Number of characters in a video id
pub const VIDEO_ID_LEN: usize = 11;

/// A validated video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    /// Accept `raw` only when it has the canonical id length
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.chars().count() == VIDEO_ID_LEN {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn raw command line inputs into an ordered list of video ids.
///
/// Each input is either a file listing one id per line or a literal id.
/// Malformed entries are reported and dropped; nothing here is fatal.
/// Repeated ids are kept (and processed twice) but reported.
pub fn resolve<S: AsRef<str>>(inputs: &[S], reporter: &dyn Reporter) -> Vec<VideoId> {
    let mut ids = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);

        if path.is_file() {
            ids.extend(read_id_file(path, reporter));
        } else if let Some(id) = VideoId::parse(input) {
            ids.push(id);
        } else {
            reporter.warn(&format!(
                "Arg '{}' is not a file nor seems to be a video id",
                input
            ));
        }
    }

    let mut seen = HashSet::new();
    for id in &ids {
        if !seen.insert(id) {
            reporter.warn(&format!("Video {} is listed more than once", id));
        }
    }

    ids
}

fn read_id_file(path: &Path, reporter: &dyn Reporter) -> Vec<VideoId> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            reporter.warn(&format!("Could not read id list `{}`: {}", path.display(), e));
            return Vec::new();
        }
    };

    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let id = VideoId::parse(line);
            if id.is_none() {
                reporter.warn(&format!(
                    "String '{}' doesn't look like a video id, skipping (from file `{}`)",
                    line,
                    path.display()
                ));
            }
            id
        })
        .collect()
}
