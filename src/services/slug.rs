// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! URL slugs for catalog entries.
//!
//! Slugs look like `ford-fiesta-2020-45000`: brand, model, year and
//! mileage. Both functions here are pure and never fail.

use crate::models::Vehicle;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const BRAND_PLACEHOLDER: &str = "auto";
const MODEL_PLACEHOLDER: &str = "modelo";
const YEAR_PLACEHOLDER: &str = "s-a";

/// Lowercase, strip diacritics, and collapse everything that is not an ASCII
/// letter or digit into single hyphens. Leading/trailing hyphens are trimmed.
pub fn to_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Slug for `vehicle`, using `index` (its position in the catalog) only for
/// the `vehiculo-N` fallback.
///
/// Missing parts get placeholders (`auto`, `modelo`, `s-a`). A vehicle with
/// none of brand, model, year or mileage gets the fallback directly.
pub fn vehicle_slug(vehicle: &Vehicle, index: usize) -> String {
    let brand = first_token(&vehicle.brand);
    let model = first_token(&vehicle.model).or_else(|| first_token(&vehicle.version));
    let year = digits(&vehicle.year);
    let km = digits(&vehicle.km);

    if brand.is_none() && model.is_none() && year.is_empty() && km.is_empty() {
        return fallback_slug(index);
    }

    let year = if year.is_empty() {
        YEAR_PLACEHOLDER.to_string()
    } else {
        year
    };
    let parts = [
        brand.unwrap_or(BRAND_PLACEHOLDER),
        model.unwrap_or(MODEL_PLACEHOLDER),
        year.as_str(),
        km.as_str(),
    ];
    let base = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let slug = to_slug(&base);
    if slug.is_empty() {
        fallback_slug(index)
    } else {
        slug
    }
}

fn fallback_slug(index: usize) -> String {
    format!("vehiculo-{}", index + 1)
}

fn first_token(value: &str) -> Option<&str> {
    value.split_whitespace().next()
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}
