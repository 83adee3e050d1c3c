use std::collections::HashSet;

const MAX_VARIANTS: usize = 6;

/// Expands `"<business> in <location>"` into search variations covering more listings.
///
/// A query without a location runs as-is.
pub fn expand_queries(query: &str) -> Vec<String> {
    let query = query.trim();
    let (business, location) = match split_location(query) {
        Some(parts) => parts,
        None => return vec![query.to_string()],
    };

    let mut queries = vec![];
    let variants = business_variants(business);
    for variant in &variants {
        queries.push(format!("{variant} in {location}"));
        queries.push(format!("{variant} {location}"));
        if variant == business {
            queries.push(format!("Best {variant} in {location}"));
            queries.push(format!("Top {variant} in {location}"));
        }
    }
    queries.push(format!("All {business} in {location}"));

    if location.contains(',') {
        let areas = location.split(',').map(str::trim).collect::<Vec<_>>();
        let specific = areas[0];
        let broader = areas[areas.len() - 1];
        queries.extend([
            format!("{business} in {broader}"),
            format!("{business} near {broader}"),
            format!("Best {business} in {broader}"),
            format!("{business} {broader}"),
            format!("{business} {specific}"),
            format!("{business} near {specific}"),
        ]);
    }

    let mut seen = HashSet::new();
    queries.retain(|q| seen.insert(q.clone()));
    queries
}

fn split_location(query: &str) -> Option<(&str, &str)> {
    let start = query.find(" in ")?;
    let end = query.rfind(" in ")?;
    let business = query[..start].trim();
    let location = query[end + 4..].trim();
    if business.is_empty() || location.is_empty() {
        None
    } else {
        Some((business, location))
    }
}

fn business_variants(business: &str) -> Vec<String> {
    let lower = business.to_lowercase();
    let words = business.split_whitespace().count();

    let mut variants = vec![business.to_string()];
    if !lower.contains("service") {
        variants.push(format!("{business} services"));
    }
    if !lower.contains("firm") && !lower.contains("compan") {
        variants.push(format!("{business} firm"));
    }
    if !lower.contains("office") && !lower.contains("center") {
        variants.push(format!("{business} office"));
    }
    if !lower.contains("consultant") && words <= 2 {
        variants.push(format!("{business} consultant"));
    }
    variants.truncate(MAX_VARIANTS);
    variants
}

/// The Maps search page for a query.
pub fn search_url(query: &str, language: Option<&str>) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    match language {
        Some(hl) => format!("https://www.google.com/maps/search/{encoded}/?hl={hl}"),
        None => format!("https://www.google.com/maps/search/{encoded}/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_location_runs_as_is() {
        assert_eq!(expand_queries(" dentist Vadodara "), vec!["dentist Vadodara"]);
        assert_eq!(expand_queries("Dentists in "), vec!["Dentists in"]);
    }

    #[test]
    fn expands_business_and_area_variants() {
        let queries = expand_queries("Dental clinics in Gotri, Vadodara");

        assert_eq!(
            &queries[..6],
            &[
                "Dental clinics in Gotri, Vadodara",
                "Dental clinics Gotri, Vadodara",
                "Best Dental clinics in Gotri, Vadodara",
                "Top Dental clinics in Gotri, Vadodara",
                "Dental clinics services in Gotri, Vadodara",
                "Dental clinics services Gotri, Vadodara",
            ]
        );
        assert!(queries.contains(&"Dental clinics consultant in Gotri, Vadodara".to_string()));
        assert!(queries.contains(&"All Dental clinics in Gotri, Vadodara".to_string()));
        assert!(queries.contains(&"Dental clinics near Vadodara".to_string()));
        assert!(queries.contains(&"Dental clinics near Gotri".to_string()));
        assert_eq!(queries.len(), 19);
    }

    #[test]
    fn keyword_guards_skip_redundant_variants() {
        let queries = expand_queries("IT services company in Pune");
        assert!(!queries.iter().any(|q| q.contains("services services")));
        assert!(!queries.iter().any(|q| q.contains("company firm")));
        // more than two words
        assert!(!queries.iter().any(|q| q.contains("consultant")));
        assert!(queries.contains(&"IT services company office in Pune".to_string()));
        assert!(!queries.iter().any(|q| q.contains("near")));
    }

    #[test]
    fn expanded_queries_are_unique() {
        let queries = expand_queries("Lawyers in Pune, Pune");
        let unique = queries.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), queries.len());
    }

    #[test]
    fn search_urls_are_encoded() {
        assert_eq!(
            search_url("Dental clinics in Gotri, Vadodara", None),
            "https://www.google.com/maps/search/Dental+clinics+in+Gotri%2C+Vadodara/"
        );
        assert_eq!(
            search_url("café & bar", Some("en")),
            "https://www.google.com/maps/search/caf%C3%A9+%26+bar/?hl=en"
        );
    }
}
