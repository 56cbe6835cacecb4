use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timezone {
    pub name: String,
    pub utc_offset: String,
}

/// Read-only reference data keyed by the `country` field.
pub trait GeographyLookup {
    fn list_countries(&self) -> Result<Vec<Country>, LookupError>;
    fn timezones_for(&self, country_id: &str) -> Result<Vec<Timezone>, LookupError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CountryEntry {
    id: String,
    name: String,
    #[serde(default)]
    timezones: Vec<Timezone>,
}

/// In-memory geography dataset, loaded from JSON:
/// `[{ "id": "FR", "name": "France", "timezones": [{ "name": ..., "utc_offset": ... }] }]`.
#[derive(Debug, Clone, Default)]
pub struct StaticGeography {
    countries: Vec<Country>,
    timezones: BTreeMap<String, Vec<Timezone>>,
}

impl StaticGeography {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CountryEntry> = serde_json::from_str(json)?;
        let mut geography = Self::default();
        for entry in entries {
            geography.countries.push(Country {
                id: entry.id.clone(),
                name: entry.name,
            });
            geography.timezones.insert(entry.id, entry.timezones);
        }
        Ok(geography)
    }
}

impl GeographyLookup for StaticGeography {
    fn list_countries(&self) -> Result<Vec<Country>, LookupError> {
        Ok(self.countries.clone())
    }

    /// Accepts either the country id or its display name.
    fn timezones_for(&self, country_id: &str) -> Result<Vec<Timezone>, LookupError> {
        let id = self
            .countries
            .iter()
            .find(|country| country.id == country_id || country.name == country_id)
            .map(|country| country.id.as_str())
            .ok_or_else(|| LookupError::UnknownCountry(country_id.to_string()))?;
        Ok(self.timezones.get(id).cloned().unwrap_or_default())
    }
}

/// Handle for one in-flight timezone lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    seq: u64,
    country: String,
}

impl LookupTicket {
    pub fn country(&self) -> &str {
        &self.country
    }
}

/// Derived timezone options for the currently selected country.
///
/// A newer request supersedes older ones: responses for a stale ticket are
/// dropped. Failed lookups leave an empty option list.
#[derive(Debug, Clone, Default)]
pub struct TimezoneOptions {
    next_seq: u64,
    pending: Option<LookupTicket>,
    country: Option<String>,
    options: Vec<Timezone>,
}

impl TimezoneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &[Timezone] {
        &self.options
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Starts a lookup for `country`, superseding any pending one.
    pub fn request(&mut self, country: &str) -> LookupTicket {
        self.next_seq += 1;
        let ticket = LookupTicket {
            seq: self.next_seq,
            country: country.to_string(),
        };
        if self.country.as_deref() != Some(country) {
            self.options.clear();
        }
        self.country = Some(country.to_string());
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Applies a lookup response. Returns `false` when the ticket is stale.
    pub fn resolve(
        &mut self,
        ticket: &LookupTicket,
        result: Result<Vec<Timezone>, LookupError>,
    ) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            tracing::warn!(country = %ticket.country, "discarding stale timezone lookup");
            return false;
        }
        self.pending = None;
        self.options = match result {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!(country = %ticket.country, error = %err, "timezone lookup failed");
                Vec::new()
            }
        };
        true
    }

    /// Request and resolve in one go against a synchronous lookup.
    pub fn refresh(&mut self, lookup: &dyn GeographyLookup, country: &str) -> &[Timezone] {
        let ticket = self.request(country);
        let result = lookup.timezones_for(country);
        self.resolve(&ticket, result);
        &self.options
    }
}
