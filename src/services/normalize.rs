// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw listing → canonical [`Vehicle`].

use crate::models::{Picture, Vehicle};
use crate::services::meli::{RawAttribute, RawItem};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

// Attribute keys per field: machine ids first, then localized names.
const BRAND_KEYS: &[&str] = &["BRAND", "Marca"];
const MODEL_KEYS: &[&str] = &["MODEL", "Modelo", "Model"];
const VERSION_KEYS: &[&str] = &["TRIM", "Versión", "Version"];
const YEAR_KEYS: &[&str] = &["VEHICLE_YEAR", "YEAR", "Año"];
const KM_KEYS: &[&str] = &["KILOMETERS", "KM", "Kilómetros", "Kilometraje"];
const COLOR_KEYS: &[&str] = &["COLOR", "Color"];
const TRANSMISSION_KEYS: &[&str] = &["TRANSMISSION", "CAJA", "Transmisión", "Caja"];
const ENGINE_KEYS: &[&str] = &["ENGINE", "MOTOR", "Motor"];

const ALL_KEYS: &[&[&str]] = &[
    BRAND_KEYS,
    MODEL_KEYS,
    VERSION_KEYS,
    YEAR_KEYS,
    KM_KEYS,
    COLOR_KEYS,
    TRANSMISSION_KEYS,
    ENGINE_KEYS,
];

/// Case-insensitive attribute lookup keyed by both id and name.
struct AttributeMap {
    values: HashMap<String, String>,
}

impl AttributeMap {
    fn from_attributes(attributes: &[RawAttribute]) -> Self {
        let mut values = HashMap::new();
        for attr in attributes {
            let Some(value) = attr.value_name.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            for key in [attr.id.as_deref(), attr.name.as_deref()].into_iter().flatten() {
                if !key.is_empty() {
                    values.insert(key.to_lowercase(), value.to_string());
                }
            }
        }
        Self { values }
    }

    /// First value found among `keys`, tried in order.
    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.values.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    fn resolve(&self, keys: &[&str]) -> String {
        self.first_of(keys).unwrap_or_default().to_string()
    }
}

fn is_known_key(key: &str) -> bool {
    let key = key.to_lowercase();
    ALL_KEYS
        .iter()
        .flat_map(|keys| keys.iter())
        .any(|known| known.to_lowercase() == key)
}

/// Map one listing payload into a [`Vehicle`]. The slug is left empty.
pub fn normalize_item(item: &RawItem) -> Vehicle {
    let attrs = AttributeMap::from_attributes(&item.attributes);
    let title = item.title.clone().unwrap_or_default();

    let brand = attrs
        .first_of(BRAND_KEYS)
        .map(str::to_string)
        .or_else(|| title.split_whitespace().next().map(str::to_string))
        .unwrap_or_default();

    let pictures: Vec<Picture> = item
        .pictures
        .iter()
        .filter_map(|p| {
            let url = p.url.clone().or_else(|| p.secure_url.clone())?;
            Some(Picture {
                url,
                secure_url: p.secure_url.clone(),
            })
        })
        .collect();

    let thumbnail_url = item.thumbnail.clone().unwrap_or_default();
    let image_url = item
        .pictures
        .first()
        .and_then(|p| {
            p.secure_url
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| p.url.clone().filter(|u| !u.is_empty()))
        })
        .unwrap_or_else(|| thumbnail_url.clone());

    Vehicle {
        id: item.id.clone(),
        slug: String::new(),
        brand,
        model: attrs.resolve(MODEL_KEYS),
        version: attrs.resolve(VERSION_KEYS),
        year: attrs.resolve(YEAR_KEYS),
        km: attrs.resolve(KM_KEYS),
        color: attrs.resolve(COLOR_KEYS),
        transmission: attrs.resolve(TRANSMISSION_KEYS),
        engine: attrs.resolve(ENGINE_KEYS),
        price: parse_price(item.price.as_ref()),
        title,
        thumbnail_url,
        image_url,
        pictures,
        permalink: item.permalink.clone().unwrap_or_default(),
        raw_attributes: passthrough_attributes(&item.attributes),
    }
}

/// Numeric prices only; anything else is unknown rather than zero.
fn parse_price(price: Option<&Value>) -> Option<f64> {
    price.and_then(Value::as_f64).filter(|p| p.is_finite())
}

/// Attributes not consumed by a canonical field, stored under both their
/// upstream id and their name. Later duplicates win.
fn passthrough_attributes(attributes: &[RawAttribute]) -> BTreeMap<String, String> {
    let mut passthrough = BTreeMap::new();
    for attr in attributes {
        let Some(value) = attr.value_name.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        let id = attr.id.as_deref().filter(|k| !k.is_empty());
        let name = attr.name.as_deref().filter(|k| !k.is_empty());
        if id.is_some_and(is_known_key) || name.is_some_and(is_known_key) {
            continue;
        }
        for key in [id, name].into_iter().flatten() {
            passthrough.insert(key.to_string(), value.to_string());
        }
    }
    passthrough
}
