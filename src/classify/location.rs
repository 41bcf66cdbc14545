//! Location filter.

use crate::model::PrefixedId;

/// True when no locations are configured, or when some associated id ends with
/// one of the configured location suffixes.
pub fn passes(associated: &[PrefixedId], locations: &[String]) -> bool {
    if locations.is_empty() {
        return true;
    }

    associated
        .iter()
        .any(|id| locations.iter().any(|loc| id.as_str().ends_with(loc.as_str())))
}

/// Location filter bound to the configured suffixes.
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    locations: Vec<String>,
}

impl LocationFilter {
    pub fn new(locations: Vec<String>) -> Self {
        Self { locations }
    }

    pub fn passes(&self, associated: &[PrefixedId]) -> bool {
        passes(associated, &self.locations)
    }
}
