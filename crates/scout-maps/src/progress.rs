//! Search progress, written for external pollers as `<index>/<total>|<query>`.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based
    pub index: usize,
    pub total: usize,
    pub query: String,
}

impl Progress {
    pub fn parse(s: &str) -> Option<Self> {
        let (counts, query) = s.trim_end().split_once('|')?;
        let (index, total) = counts.split_once('/')?;
        Some(Self {
            index: index.trim().parse().ok()?,
            total: total.trim().parse().ok()?,
            query: query.to_string(),
        })
    }

    /// Write errors are logged and otherwise ignored.
    pub fn write(&self, path: &Path) {
        if let Err(e) = fs_err::write(path, self.to_string()) {
            log::debug!("Couldn't write progress: {e}");
        }
    }

    pub fn read(path: &Path) -> Option<Self> {
        fs_err::read_to_string(path).ok().and_then(|s| Self::parse(&s))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}|{}", self.index, self.total, self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraper_progress.txt");
        let progress = Progress {
            index: 3,
            total: 19,
            query: "Best Dental clinics in Gotri, Vadodara".into(),
        };

        progress.write(&path);

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "3/19|Best Dental clinics in Gotri, Vadodara"
        );
        assert_eq!(Progress::read(&path), Some(progress));
    }

    #[test]
    fn unwritable_progress_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let progress = Progress {
            index: 1,
            total: 1,
            query: "q".into(),
        };
        progress.write(&dir.path().join("missing").join("progress.txt"));
        assert_eq!(Progress::read(&dir.path().join("missing").join("progress.txt")), None);
    }

    #[test]
    fn malformed_progress() {
        assert_eq!(Progress::parse("3/19"), None);
        assert_eq!(Progress::parse("x/19|q"), None);
        assert_eq!(
            Progress::parse("1/2|a|b"),
            Some(Progress {
                index: 1,
                total: 2,
                query: "a|b".into()
            })
        );
    }
}
