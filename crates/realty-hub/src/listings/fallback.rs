use std::fmt::Debug;

use super::domain::{PropertyListing, Provenance, PLACEHOLDER_IMAGE_URL};

/// What the MLS provider shows when the feed answers with a non-success status.
pub trait FallbackPolicy: Debug + Send + Sync {
    fn on_failure(&self, status: u16) -> Vec<PropertyListing>;
}

/// Fixed illustrative listings tagged [`Provenance::Sample`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleListings;

impl FallbackPolicy for SampleListings {
    fn on_failure(&self, _status: u16) -> Vec<PropertyListing> {
        sample_listings()
    }
}

/// Shows nothing instead of sample data.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyFallback;

impl FallbackPolicy for EmptyFallback {
    fn on_failure(&self, _status: u16) -> Vec<PropertyListing> {
        Vec::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: &str,
    address: &str,
    city: &str,
    zip: &str,
    price: f64,
    bedrooms: u32,
    bathrooms: f32,
    square_feet: u32,
    property_type: &str,
    listing_type: &str,
) -> PropertyListing {
    PropertyListing {
        id: id.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        state: "CA".to_string(),
        zip: zip.to_string(),
        price,
        bedrooms,
        bathrooms,
        square_feet,
        property_type: property_type.to_string(),
        listing_type: listing_type.to_string(),
        image_url: PLACEHOLDER_IMAGE_URL.to_string(),
        description: Some("Sample listing shown while the MLS feed is unavailable.".to_string()),
        agent: None,
        provenance: Provenance::Sample,
    }
}

pub fn sample_listings() -> Vec<PropertyListing> {
    vec![
        sample(
            "sample-1",
            "123 Sample Street",
            "San Diego",
            "92101",
            750_000.0,
            3,
            2.0,
            1_800,
            "Single Family",
            "For Sale",
        ),
        sample(
            "sample-2",
            "456 Example Avenue",
            "San Diego",
            "92103",
            3_200.0,
            2,
            1.0,
            950,
            "Condo",
            "For Rent",
        ),
        sample(
            "sample-3",
            "789 Demo Court",
            "La Jolla",
            "92037",
            1_450_000.0,
            4,
            3.5,
            2_600,
            "Townhouse",
            "For Sale",
        ),
    ]
}
