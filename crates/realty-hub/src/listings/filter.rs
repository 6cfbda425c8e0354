use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::PropertyListing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingTab {
    #[default]
    All,
    Sale,
    Rent,
}

impl ListingTab {
    fn matches(self, listing_type: &str) -> bool {
        let listing_type = listing_type.to_ascii_lowercase();
        match self {
            ListingTab::All => true,
            ListingTab::Sale => listing_type.contains("sale"),
            ListingTab::Rent => listing_type.contains("rent"),
        }
    }
}

impl FromStr for ListingTab {
    type Err = std::convert::Infallible;

    /// Unknown tabs show everything.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Ok(if value.contains("sale") || value == "buy" {
            ListingTab::Sale
        } else if value.contains("rent") || value == "lease" {
            ListingTab::Rent
        } else {
            ListingTab::All
        })
    }
}

impl<'de> Deserialize<'de> for ListingTab {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse::<ListingTab>().unwrap_or_default())
    }
}

/// Client-side refinements applied after aggregation. Every set criterion must hold.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingFilter {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub tab: ListingTab,
    #[serde(default, deserialize_with = "empty_string_as_none_number")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none_number")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none_number")]
    pub min_bedrooms: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none_number")]
    pub min_bathrooms: Option<f32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub property_type: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &PropertyListing) -> bool {
        self.matches_search(listing)
            && self.tab.matches(&listing.listing_type)
            && self.min_price.map_or(true, |min| listing.price >= min)
            && self.max_price.map_or(true, |max| listing.price <= max)
            && self.min_bedrooms.map_or(true, |min| listing.bedrooms >= min)
            && self.min_bathrooms.map_or(true, |min| listing.bathrooms >= min)
            && self.matches_property_type(listing)
    }

    fn matches_search(&self, listing: &PropertyListing) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [&listing.address, &listing.city, &listing.zip]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_property_type(&self, listing: &PropertyListing) -> bool {
        match self.property_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(wanted) if wanted.eq_ignore_ascii_case("all") => true,
            Some(wanted) => listing.property_type.eq_ignore_ascii_case(wanted),
        }
    }

    pub fn apply(&self, listings: &[PropertyListing]) -> Vec<PropertyListing> {
        listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect()
    }
}

/// Distinct non-empty property types, sorted, for the type selector.
pub fn property_types(listings: &[PropertyListing]) -> Vec<String> {
    listings
        .iter()
        .map(|listing| listing.property_type.trim())
        .filter(|kind| !kind.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn empty_string_as_none_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::domain::Provenance;

    fn listing(id: &str, price: f64, bedrooms: u32, bathrooms: f32) -> PropertyListing {
        PropertyListing {
            id: id.to_string(),
            address: format!("{id} Main Street"),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            zip: "97201".to_string(),
            price,
            bedrooms,
            bathrooms,
            square_feet: 1200,
            property_type: "Single Family".to_string(),
            listing_type: "For Sale".to_string(),
            image_url: String::new(),
            description: None,
            agent: None,
            provenance: Provenance::Local,
        }
    }

    fn ten_listings() -> Vec<PropertyListing> {
        (0..10)
            .map(|i| {
                listing(
                    &format!("{}", i + 1),
                    50_000.0 + 75_000.0 * i as f64,
                    1 + (i % 5),
                    1.0 + (i % 3) as f32,
                )
            })
            .collect()
    }

    #[test]
    fn price_range_is_inclusive() {
        let filter = ListingFilter {
            min_price: Some(100_000.0),
            max_price: Some(500_000.0),
            ..ListingFilter::default()
        };
        let matched = filter.apply(&ten_listings());

        assert!(!matched.is_empty());
        assert!(matched
            .iter()
            .all(|l| (100_000.0..=500_000.0).contains(&l.price)));
        let expected = ten_listings()
            .into_iter()
            .filter(|l| l.price >= 100_000.0 && l.price <= 500_000.0)
            .count();
        assert_eq!(matched.len(), expected);
    }

    #[test]
    fn criteria_compose_conjunctively() {
        let price_only = ListingFilter {
            min_price: Some(100_000.0),
            max_price: Some(500_000.0),
            ..ListingFilter::default()
        };
        let with_beds = ListingFilter {
            min_bedrooms: Some(3),
            ..price_only.clone()
        };

        let narrowed = with_beds.apply(&ten_listings());
        assert!(narrowed.len() < price_only.apply(&ten_listings()).len());
        assert!(narrowed
            .iter()
            .all(|l| l.bedrooms >= 3 && l.price >= 100_000.0 && l.price <= 500_000.0));
    }

    #[test]
    fn search_matches_address_city_or_zip_case_insensitively() {
        let mut listings = ten_listings();
        listings[0].city = "Lake Oswego".to_string();
        listings[1].zip = "97035".to_string();

        let by_city = ListingFilter {
            search: Some("OSWEGO".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(by_city.apply(&listings).len(), 1);

        let by_zip = ListingFilter {
            search: Some("9703".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(by_zip.apply(&listings)[0].id, "2");

        let by_address = ListingFilter {
            search: Some("10 main".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(by_address.apply(&listings).len(), 1);
    }

    #[test]
    fn tab_matches_listing_type_substring() {
        let mut listings = ten_listings();
        listings[3].listing_type = "For Rent".to_string();
        listings[4].listing_type = "Rental".to_string();

        let rent = ListingFilter {
            tab: "rent".parse().expect("infallible"),
            ..ListingFilter::default()
        };
        assert_eq!(rent.apply(&listings).len(), 2);

        let sale = ListingFilter {
            tab: ListingTab::Sale,
            ..ListingFilter::default()
        };
        assert_eq!(sale.apply(&listings).len(), 8);
    }

    #[test]
    fn property_type_is_exact_and_bathrooms_are_thresholds() {
        let mut listings = ten_listings();
        listings[2].property_type = "Condo".to_string();

        let condos = ListingFilter {
            property_type: Some("condo".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(condos.apply(&listings).len(), 1);

        let partial = ListingFilter {
            property_type: Some("Single".to_string()),
            ..ListingFilter::default()
        };
        assert!(partial.apply(&listings).is_empty());

        let baths = ListingFilter {
            min_bathrooms: Some(3.0),
            ..ListingFilter::default()
        };
        assert!(baths.apply(&listings).iter().all(|l| l.bathrooms >= 3.0));
    }

    #[test]
    fn deserializes_query_string_with_blanks() {
        let filter: ListingFilter =
            serde_json::from_value(serde_json::json!({
                "search": "",
                "tab": "For Rent",
                "min_price": "100000",
                "max_price": "",
                "min_bedrooms": "3"
            }))
            .expect("filter parses");

        assert_eq!(filter.search, None);
        assert_eq!(filter.tab, ListingTab::Rent);
        assert_eq!(filter.min_price, Some(100_000.0));
        assert_eq!(filter.max_price, None);
        assert_eq!(filter.min_bedrooms, Some(3));
    }

    #[test]
    fn property_types_are_distinct_and_sorted() {
        let mut listings = ten_listings();
        listings[0].property_type = "Condo".to_string();
        listings[1].property_type = String::new();
        assert_eq!(property_types(&listings), vec!["Condo", "Single Family"]);
    }
}
