use std::collections::HashSet;
use std::sync::Mutex;

/// A place link without its query string, which only carries tracking state.
pub fn clean_link(link: &str) -> &str {
    link.split('?').next().unwrap_or(link)
}

/// Hands out each cleaned place link once, across every search.
#[derive(Debug, Default)]
pub struct LinkDeduper {
    seen: Mutex<HashSet<String>>,
}

impl LinkDeduper {
    pub fn accept(&self, link: &str) -> Option<String> {
        let link = clean_link(link.trim());
        if link.is_empty() {
            return None;
        }
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        if seen.insert(link.to_string()) {
            Some(link.to_string())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
