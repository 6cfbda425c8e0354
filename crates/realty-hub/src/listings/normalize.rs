use serde_json::{Map, Value};

use super::domain::{
    PropertyListing, Provenance, PLACEHOLDER_IMAGE_URL, UNKNOWN_ADDRESS, UNKNOWN_CITY,
};
use crate::record_store::value_as_text;

/// Candidate source names for each display field, first present wins. Dotted names
/// walk nested objects (`address.city`).
#[derive(Debug, Clone, Copy)]
pub struct FieldTable {
    pub id: &'static [&'static str],
    pub address: &'static [&'static str],
    pub city: &'static [&'static str],
    pub state: &'static [&'static str],
    pub zip: &'static [&'static str],
    pub price: &'static [&'static str],
    pub bedrooms: &'static [&'static str],
    pub bathrooms: &'static [&'static str],
    pub square_feet: &'static [&'static str],
    pub property_type: &'static [&'static str],
    pub listing_type: &'static [&'static str],
    pub description: &'static [&'static str],
    pub agent: &'static [&'static str],
    pub images: &'static [&'static str],
    pub image_url_keys: &'static [&'static str],
    pub default_listing_type: &'static str,
}

/// Column names of the record store's properties table.
pub const RECORD_STORE_FIELDS: FieldTable = FieldTable {
    id: &["Listing ID"],
    address: &["Address", "Street Address", "Name"],
    city: &["City"],
    state: &["State"],
    zip: &["Zip", "Zip Code", "ZIP"],
    price: &["Price", "List Price"],
    bedrooms: &["Bedrooms", "Beds"],
    bathrooms: &["Bathrooms", "Baths"],
    square_feet: &["Square Feet", "Sq Ft", "SqFt"],
    property_type: &["Property Type", "Type"],
    listing_type: &["Listing Type", "Status"],
    description: &["Description"],
    agent: &["Agent", "Agent Name"],
    images: &["Images", "Photos", "Image", "Image URL"],
    image_url_keys: &["url"],
    default_listing_type: "For Sale",
};

/// Fixed schema of the MLS syndication feed.
pub const MLS_FIELDS: FieldTable = FieldTable {
    id: &["mlsId", "listingId", "ListingId"],
    address: &["address.full", "UnparsedAddress"],
    city: &["address.city", "City"],
    state: &["address.state", "StateOrProvince"],
    zip: &["address.postalCode", "PostalCode"],
    price: &["listPrice", "ListPrice"],
    bedrooms: &["property.bedrooms", "BedroomsTotal"],
    bathrooms: &["property.bathrooms", "property.bathsFull", "BathroomsTotalInteger"],
    square_feet: &["property.area", "LivingArea"],
    property_type: &["property.type", "PropertyType"],
    listing_type: &["listingType", "TransactionType"],
    description: &["remarks", "PublicRemarks"],
    agent: &["agent.name", "ListAgentFullName"],
    images: &["photos", "Media"],
    image_url_keys: &["MediaURL", "url"],
    default_listing_type: "For Sale",
};

fn lookup<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if let Some(value) = fields.get(name) {
        return Some(value);
    }

    let mut parts = name.split('.');
    let first = parts.next()?;
    let mut current = fields.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Scalar text, or the first scalar of a list (linked-record style cells).
pub(crate) fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(items) => items.iter().find_map(value_as_text),
        other => value_as_text(other),
    }?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn cell_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn first_text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| lookup(fields, name).and_then(cell_text))
}

fn first_number(fields: &Map<String, Value>, names: &[&str]) -> f64 {
    names
        .iter()
        .find_map(|name| lookup(fields, name).and_then(cell_number))
        .map(|number| number.max(0.0))
        .unwrap_or(0.0)
}

pub(crate) fn image_url(value: &Value, url_keys: &[&str]) -> Option<String> {
    match value {
        Value::String(url) => Some(url.trim().to_string()).filter(|url| !url.is_empty()),
        Value::Array(items) => items.first().and_then(|item| image_url(item, url_keys)),
        Value::Object(entry) => url_keys
            .iter()
            .find_map(|key| entry.get(*key))
            .and_then(|url| image_url(url, url_keys)),
        _ => None,
    }
}

fn first_image(fields: &Map<String, Value>, table: &FieldTable) -> String {
    table
        .images
        .iter()
        .find_map(|name| lookup(fields, name).and_then(|value| image_url(value, table.image_url_keys)))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string())
}

/// Maps one provider record onto the display model. `fallback_id` is used when the
/// record carries none of the table's id fields.
pub fn map_record(
    fallback_id: &str,
    fields: &Map<String, Value>,
    table: &FieldTable,
    provenance: Provenance,
) -> PropertyListing {
    PropertyListing {
        id: first_text(fields, table.id).unwrap_or_else(|| fallback_id.to_string()),
        address: first_text(fields, table.address).unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
        city: first_text(fields, table.city).unwrap_or_else(|| UNKNOWN_CITY.to_string()),
        state: first_text(fields, table.state).unwrap_or_default(),
        zip: first_text(fields, table.zip).unwrap_or_default(),
        price: first_number(fields, table.price),
        bedrooms: first_number(fields, table.bedrooms).round() as u32,
        bathrooms: first_number(fields, table.bathrooms) as f32,
        square_feet: first_number(fields, table.square_feet).round() as u32,
        property_type: first_text(fields, table.property_type).unwrap_or_default(),
        listing_type: first_text(fields, table.listing_type)
            .unwrap_or_else(|| table.default_listing_type.to_string()),
        image_url: first_image(fields, table),
        description: first_text(fields, table.description),
        agent: first_text(fields, table.agent),
        provenance,
    }
}
