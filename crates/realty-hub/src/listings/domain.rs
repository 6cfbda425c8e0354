use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_IMAGE_URL: &str = "/images/listing-placeholder.jpg";
pub const UNKNOWN_CITY: &str = "Unknown City";
pub const UNKNOWN_ADDRESS: &str = "Address not provided";

/// Where a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The site's own record store.
    Local,
    /// The MLS syndication feed.
    Syndicated,
    /// Illustrative data shown when the MLS feed refused the request.
    Sample,
}

impl Provenance {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Syndicated => "MLS",
            Self::Sample => "Sample",
        }
    }
}

/// Display model shared by every provider. Numeric fields are always populated so
/// filters never need to handle gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub square_feet: u32,
    pub property_type: String,
    pub listing_type: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub provenance: Provenance,
}

impl PropertyListing {
    pub fn location_line(&self) -> String {
        let region = [self.state.as_str(), self.zip.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if region.is_empty() {
            self.city.clone()
        } else {
            format!("{}, {}", self.city, region)
        }
    }
}

/// Server-side restrictions passed to providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub agent: Option<String>,
}

impl ListingQuery {
    pub fn for_agent(agent: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
        }
    }
}
