// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod tokens;
pub mod vehicle;

pub use tokens::Tokens;
pub use vehicle::{CatalogSnapshot, Picture, Vehicle};
