use std::collections::HashSet;

use crate::listing::Listing;

/// Normalizes listings and drops the ones already seen.
///
/// The phone number is the strong signal, the name is only used when there is no phone.
#[derive(Debug, Default)]
pub struct ListingPipeline {
    seen_phones: HashSet<String>,
    seen_names: HashSet<String>,
}

impl ListingPipeline {
    pub fn process(&mut self, mut listing: Listing) -> Option<Listing> {
        listing.business_name = listing
            .business_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        listing.phone_number = listing
            .phone_number
            .map(|phone| phone.replace([' ', '-'], ""))
            .filter(|phone| !phone.is_empty());

        if let Some(phone) = &listing.phone_number {
            if !self.seen_phones.insert(phone.clone()) {
                log::debug!("Dropping duplicate phone {phone}: {}", listing.label());
                return None;
            }
        } else if let Some(name) = &listing.business_name {
            if !self.seen_names.insert(name.clone()) {
                log::debug!("Dropping duplicate name: {name}");
                return None;
            }
        }

        Some(listing)
    }
}
