use std::path::Path;

use scout_crawler::CrawlerConfig;
use scout_maps::MapsConfig;
use scout_verify::VerifyConfig;
use serde::{Deserialize, Serialize};

/// Content of the optional yaml configuration file, one section per subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    pub maps: MapsConfig,
    pub verify: VerifyConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = fs_err::File::open(path)?;
                Ok(serde_yaml::from_reader(file)?)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::num::NonZeroUsize;

    use scout_crawler::{OnError, Throttle};

    use super::*;

    #[test]
    fn sections_are_optional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "crawler:\n  throttle:\n    PerSecond: 2\n  onDlError: Fail\n\
             maps:\n  query: Dentists in Pune\n  feed:\n    maxLinks: 50\n"
        )
        .unwrap();

        let conf = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(conf.crawler.throttle, Throttle::PerSecond(NonZeroUsize::new(2).unwrap()));
        assert_eq!(conf.crawler.on_dl_error, OnError::Fail);
        assert_eq!(conf.maps.query, "Dentists in Pune");
        assert_eq!(conf.maps.feed.max_links, 50);
        assert_eq!(conf.maps.feed.max_scrolls, 400);
        assert_eq!(conf.verify.base_url, "http://localhost:3000");
        assert_eq!(conf.verify.batch_size, 10);
    }

    #[test]
    fn no_file_means_defaults() {
        let conf = AppConfig::load(None).unwrap();
        assert!(conf.maps.expand_queries);
        assert!(conf.verify.demo_fallback);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/leadscout.yaml"))).is_err());
    }
}
