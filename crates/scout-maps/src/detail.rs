use anyhow::anyhow;
use sws_scraper::{Html, Selector};
use url::Url;

use crate::listing::Listing;

const WEBSITE_SELECTORS: [&str; 6] = [
    r#"a[data-item-id="authority"]"#,
    r#"a[data-item-id^="authority"]"#,
    r#"a[aria-label*="Website"]"#,
    r#"a[href*="http"][data-item-id*="authority"]"#,
    r#"a[data-item-id*="authority"]"#,
    r#"a[href*="http"][aria-label*="ebsite"]"#,
];

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css}: {e:?}"))
}

fn first_attr(page: &Html, css: &str, attr: &str) -> anyhow::Result<Option<String>> {
    Ok(page
        .select(selector(css)?)
        .find_map(|elem| elem.map_value(|v| v.attr(attr).map(String::from)).flatten())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn first_text(page: &Html, css: &str) -> anyhow::Result<Option<String>> {
    Ok(page
        .select(selector(css)?)
        .map(|elem| elem.inner_text().trim().to_string())
        .find(|s| !s.is_empty()))
}

/// Labelled button value, `aria-label` without its prefix or else the visible text.
fn labelled(page: &Html, button: &str, prefix: &str) -> anyhow::Result<Option<String>> {
    match first_attr(page, button, "aria-label")? {
        Some(label) => Ok(Some(
            label.strip_prefix(prefix).unwrap_or(label.as_str()).trim().to_string(),
        )),
        None => first_text(page, &format!("{button} .fontBodyMedium")),
    }
}

/// Extracts a listing from a rendered place page, leaving the email out.
pub fn extract_listing(html: &str, place_url: &str) -> anyhow::Result<Listing> {
    let page = Html::parse_document(html);

    let business_name = first_text(&page, "h1")?;
    let address = labelled(&page, r#"button[data-item-id="address"]"#, "Address: ")?;
    let phone_number = labelled(&page, r#"button[data-item-id^="phone"]"#, "Phone: ")?;

    let mut website_url = None;
    for css in WEBSITE_SELECTORS {
        if let Some(href) = first_attr(&page, css, "href")? {
            log::debug!("Website found with {css}");
            website_url = Some(unwrap_redirect(&href));
            break;
        }
    }

    Ok(Listing {
        business_name,
        phone_number,
        address,
        website_url,
        email: None,
        place_url: Some(place_url.to_string()),
    })
}

/// Resolves Google redirect links (`google.com/url?q=...`) to their target.
pub fn unwrap_redirect(href: &str) -> String {
    if !href.contains("google.com/url?q=") {
        return href.to_string();
    }
    Url::parse(href)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.into_owned())
        })
        .filter(|target| !target.is_empty())
        .unwrap_or_else(|| href.to_string())
}
