use serde::{Deserialize, Serialize};

/// A business found on Maps, every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub business_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub email: Option<String>,
    pub place_url: Option<String>,
}

impl Listing {
    pub fn label(&self) -> &str {
        self.business_name
            .as_deref()
            .or(self.place_url.as_deref())
            .unwrap_or("<unnamed>")
    }
}
