use std::time::Duration;

use anyhow::Result;
use scout_crawler::BrowserPage;
use serde_json::Value;

const VISIBLE_BUTTONS: &str = "Array.from(document.querySelectorAll('button, [role=\"button\"]')).filter(b => b.offsetParent !== null)";

/// Picks the button to click: the first keyword, in order, found in a label.
pub fn pick_button<S: AsRef<str>>(labels: &[String], keywords: &[S]) -> Option<usize> {
    let labels = labels.iter().map(|l| l.to_lowercase()).collect::<Vec<_>>();
    keywords.iter().find_map(|keyword| {
        let keyword = keyword.as_ref().to_lowercase();
        if keyword.is_empty() {
            return None;
        }
        labels.iter().position(|label| label.contains(&keyword))
    })
}

/// Dismisses a cookie/consent dialog when one is shown, returns whether a button was clicked.
pub fn dismiss_consent<S: AsRef<str>>(page: &dyn BrowserPage, keywords: &[S]) -> Result<bool> {
    let labels = page.evaluate(&format!(
        "{VISIBLE_BUTTONS}.map(b => (b.innerText || b.getAttribute('aria-label') || '').trim())"
    ))?;
    let labels: Vec<String> = match labels {
        Value::Null => vec![],
        labels => serde_json::from_value(labels)?,
    };

    let index = match pick_button(&labels, keywords) {
        Some(index) => index,
        None => return Ok(false),
    };

    log::info!("Dismissing consent dialog with: {}", labels[index]);
    page.evaluate(&format!(
        "(() => {{ const b = {VISIBLE_BUTTONS}[{index}]; if (b) {{ b.click(); }} return !!b; }})()"
    ))?;
    page.pause(Duration::from_millis(1500));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;

    struct ConsentPage {
        labels: Vec<&'static str>,
        scripts: RefCell<Vec<String>>,
    }

    impl BrowserPage for ConsentPage {
        fn url(&self) -> String {
            "https://consent.google.com/".into()
        }

        fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        fn evaluate(&self, script: &str) -> Result<Value> {
            self.scripts.borrow_mut().push(script.to_string());
            if script.contains(".click()") {
                Ok(Value::Bool(true))
            } else {
                Ok(Value::from(self.labels.clone()))
            }
        }

        fn content(&self) -> Result<String> {
            Ok(String::new())
        }

        fn screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn pause(&self, _duration: Duration) {}
    }

    fn labels(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn keyword_order_wins_over_button_order() {
        let buttons = labels(&["Alle ablehnen", "Alle akzeptieren"]);
        assert_eq!(pick_button(&buttons, &["alle akzeptieren", "alle ablehnen"]), Some(1));
        assert_eq!(pick_button(&buttons, &["alle ablehnen"]), Some(0));
    }

    #[test]
    fn matching_is_case_insensitive_and_partial() {
        let buttons = labels(&["More options", "ACCEPT ALL COOKIES"]);
        assert_eq!(pick_button(&buttons, &["Accept all"]), Some(1));
        assert_eq!(pick_button(&buttons, &["reject all", ""]), None);
    }

    #[test]
    fn clicks_the_matching_button() {
        let page = ConsentPage {
            labels: vec!["Reject all", "Accept all"],
            scripts: RefCell::new(vec![]),
        };
        assert!(dismiss_consent(&page, &["accept all"]).unwrap());
        let scripts = page.scripts.borrow();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[1].contains("[1]; if (b) { b.click(); }"));
    }

    #[test]
    fn no_dialog_is_not_an_error() {
        let page = ConsentPage {
            labels: vec!["Directions", "Save"],
            scripts: RefCell::new(vec![]),
        };
        assert!(!dismiss_consent(&page, &["accept all"]).unwrap());
        assert_eq!(page.scripts.borrow().len(), 1);
    }
}
