//! Distribution list naming convention.

/// The two addresses a unit's distribution list may live under.
///
/// Directory mail attributes are matched exactly, and existing lists were
/// created with either the unit's own capitalisation or all lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionListNames {
    /// `{prefix}{name as written}@{domain}`
    pub primary: String,
    /// `{prefix}{lowercased name}@{domain}`
    pub lowercase: String,
}

impl DistributionListNames {
    /// Build both candidate addresses for a unit name.
    ///
    /// Spaces become `_` and `&` becomes `and`. Returns `None` for a blank
    /// name, which has no list under the convention.
    pub fn for_unit(unit_name: &str, prefix: &str, domain: &str) -> Option<Self> {
        if unit_name.trim().is_empty() {
            return None;
        }

        let normalized = unit_name.replace(' ', "_").replace('&', "and");
        let lowered = normalized.to_lowercase();

        Some(Self {
            primary: format!("{}{}@{}", prefix, normalized, domain),
            lowercase: format!("{}{}@{}", prefix, lowered, domain),
        })
    }

    /// Whether the lowercase form adds a second address worth searching.
    pub fn forms_differ(&self) -> bool {
        self.primary != self.lowercase
    }

    /// Addresses in search order, without duplicates.
    pub fn search_order(&self) -> Vec<&str> {
        if self.forms_differ() {
            vec![self.primary.as_str(), self.lowercase.as_str()]
        } else {
            vec![self.primary.as_str()]
        }
    }
}
