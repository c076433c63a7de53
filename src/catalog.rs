//! Static hazard reference data.
//!
//! The catalog maps a normalized e-waste class name to hazard metadata. It is
//! built once at startup, validated, and shared read-only for the process
//! lifetime. Callers normalize keys (lower-case, trimmed) before lookup; the
//! catalog itself does no normalization.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Fallback class used when no detection matches the catalog.
pub const SENTINEL_CLASS: &str = "no e-waste detected";

const MIN_HAZARD_LEVEL: u8 = 1;
const MAX_HAZARD_LEVEL: u8 = 5;

/// Hazard metadata for one e-waste category.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HazardEntry {
    /// Hazardous substances present in this category.
    pub materials: String,
    /// Health/environmental risk description.
    pub details: String,
    /// Severity score, 1 (benign / not e-waste) to 5 (most hazardous).
    pub hazard_level: u8,
}

/// Immutable class-name → hazard-metadata table.
pub struct HazardCatalog {
    entries: HashMap<String, HazardEntry>,
    sentinel: HazardEntry,
}

impl HazardCatalog {
    /// Build the built-in catalog.
    pub fn builtin() -> Self {
        let sentinel = HazardEntry {
            materials: "N/A (Not E-Waste)".to_string(),
            details: "This item was not identified as e-waste. While not containing specific \
                      e-waste hazards, please ensure proper disposal according to local waste \
                      management guidelines to prevent general pollution."
                .to_string(),
            hazard_level: 1,
        };
        let mut entries = HashMap::with_capacity(BUILTIN_ENTRIES.len() + 1);
        entries.insert(SENTINEL_CLASS.to_string(), sentinel.clone());
        for (class, materials, details, hazard_level) in BUILTIN_ENTRIES {
            entries.insert(
                (*class).to_string(),
                HazardEntry {
                    materials: (*materials).to_string(),
                    details: (*details).to_string(),
                    hazard_level: *hazard_level,
                },
            );
        }
        Self { entries, sentinel }
    }

    /// Exact-key lookup. Callers must normalize the class name first.
    pub fn lookup(&self, class_name: &str) -> Option<&HazardEntry> {
        self.entries.get(class_name)
    }

    /// The guaranteed fallback entry for [`SENTINEL_CLASS`].
    pub fn sentinel(&self) -> &HazardEntry {
        &self.sentinel
    }

    /// Classes known to the catalog, excluding the sentinel.
    pub fn detector_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.as_str() != SENTINEL_CLASS)
            .cloned()
            .collect();
        classes.sort();
        classes
    }

    /// Check catalog invariants: every key lower-case and trimmed, every
    /// hazard level in range, sentinel key present and matching the stored
    /// sentinel entry.
    pub fn validate(&self) -> Result<()> {
        for (key, entry) in &self.entries {
            if key.trim() != key || key.to_lowercase() != *key {
                return Err(anyhow!("catalog key '{}' is not normalized", key));
            }
            if !(MIN_HAZARD_LEVEL..=MAX_HAZARD_LEVEL).contains(&entry.hazard_level) {
                return Err(anyhow!(
                    "catalog entry '{}' has hazard level {} outside {}..={}",
                    key,
                    entry.hazard_level,
                    MIN_HAZARD_LEVEL,
                    MAX_HAZARD_LEVEL
                ));
            }
        }
        match self.entries.get(SENTINEL_CLASS) {
            Some(entry) if *entry == self.sentinel => Ok(()),
            Some(_) => Err(anyhow!("sentinel entry diverges from catalog entry")),
            None => Err(anyhow!("catalog is missing the '{}' entry", SENTINEL_CLASS)),
        }
    }
}

impl Default for HazardCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// (class, materials, details, hazard_level). The sentinel entry is added
/// separately so its presence is structural, not data-dependent.
const BUILTIN_ENTRIES: &[(&str, &str, &str, u8)] = &[
    (
        "lcd monitor",
        "Lead, Mercury, Cadmium, Brominated Flame Retardants (BFRs)",
        "LCD monitors contain mercury in their backlights, which is a neurotoxin. Lead in \
         solder can harm the nervous system. Cadmium is a carcinogen and damages kidneys. BFRs \
         are persistent organic pollutants.",
        4,
    ),
    (
        "crt monitor",
        "High levels of Lead, Barium, Mercury",
        "CRT monitors are particularly hazardous due to high concentrations of lead in their \
         glass (up to 5-8 pounds per unit), which is a severe neurotoxin. They also contain \
         barium and mercury, posing significant environmental and health risks if improperly \
         disposed of.",
        5,
    ),
    (
        "printer",
        "Lead, Mercury, Cadmium, Toner residue",
        "Printers can contain lead in solder, mercury in some components, and cadmium. Toner \
         cartridges contain fine plastic particles and heavy metals that can be harmful if \
         inhaled or released into the environment.",
        3,
    ),
    (
        "battery",
        "Lithium, Lead, Cadmium, Mercury, Nickel (depending on type)",
        "Batteries pose significant risks. Lithium-ion batteries can cause fires if damaged \
         and contain cobalt and nickel. Lead-acid batteries contain corrosive sulfuric acid \
         and lead, a neurotoxin. Cadmium and mercury in other battery types are highly toxic \
         and bioaccumulate.",
        5,
    ),
    (
        "cable",
        "PVC (Polyvinyl Chloride), Lead, Cadmium, Brominated Flame Retardants",
        "Cables often contain PVC, which releases dioxins when burned. Lead and cadmium are \
         sometimes used in insulation and solder, posing neurotoxic and carcinogenic risks. \
         BFRs are used as flame retardants and are persistent environmental pollutants.",
        2,
    ),
    (
        "computer",
        "Lead, Mercury, Cadmium, Chromium, Brominated Flame Retardants (BFRs), PVC",
        "Computers are complex and contain numerous hazardous materials. Lead in solder, \
         mercury in LCD backlights, and cadmium are highly toxic. Chromium can be \
         carcinogenic. BFRs are persistent environmental pollutants. PVC releases dioxins \
         upon incineration.",
        5,
    ),
    (
        "dryer",
        "Lead (solder), some PCBs, occasional Mercury switches, various plastics",
        "While less electronic than computers, dryers can contain lead in solder, small \
         printed circuit boards (PCBs) with heavy metals, and older models might have mercury \
         switches. Plastics and other metals should also be recycled responsibly.",
        3,
    ),
    (
        "electronics",
        "Lead, Mercury, Cadmium, Brominated Flame Retardants (BFRs), PVC, Lithium",
        "This general category of electronics can contain a wide array of hazardous \
         substances including heavy metals like lead, mercury, and cadmium which are toxic to \
         human health and the environment. Brominated Flame Retardants (BFRs) are persistent \
         pollutants, and lithium from batteries poses fire risks and environmental \
         contamination.",
        4,
    ),
    (
        "headphone",
        "Plastics, Lead (solder), small PCBs, trace rare earth metals",
        "Headphones primarily consist of plastics and metals. Small amounts of lead may be \
         present in solder on internal PCBs. They also contain tiny amounts of rare earth \
         metals, which are valuable but mining can be environmentally intensive.",
        2,
    ),
    (
        "keyboard",
        "Plastics, Lead (solder), small PCBs, some metals",
        "Keyboards are mainly plastics, but also contain small circuit boards with lead \
         solder and other metals. While the individual hazard level is lower, the sheer \
         volume of discarded keyboards contributes to e-waste accumulation.",
        2,
    ),
    (
        "mobile",
        "Lithium-ion battery, Lead, Mercury, Cadmium, Arsenic, BFRs, rare earth metals",
        "Mobile phones are highly complex and contain numerous toxic elements. Lithium-ion \
         batteries pose fire hazards and contain cobalt and nickel. Lead, mercury, cadmium, \
         and arsenic are severe neurotoxins and carcinogens. BFRs and valuable rare earth \
         metals are also present.",
        5,
    ),
    (
        "modem",
        "Lead (solder), Brominated Flame Retardants (BFRs), PVC, various plastics",
        "Modems contain PCBs with lead solder. Brominated Flame Retardants (BFRs) are often \
         used in their plastic casings and internal components. PVC plastic can also be \
         present, which creates dioxins if incinerated.",
        3,
    ),
    (
        "mouse",
        "Plastics, Lead (solder), small PCBs",
        "Computer mice are mostly plastics, but like keyboards, they contain small printed \
         circuit boards (PCBs) that utilize lead solder. Proper recycling prevents these \
         metals from leaching into the environment.",
        2,
    ),
    (
        "pcb",
        "Lead, Mercury, Cadmium, Brominated Flame Retardants (BFRs), Chromium, Arsenic, Beryllium",
        "Printed Circuit Boards are the core of most electronics and are highly hazardous. \
         They contain a cocktail of heavy metals like lead, mercury, cadmium, and chromium, \
         all of which are toxic. Beryllium and arsenic are also present, along with BFRs, \
         making PCBs a major environmental concern.",
        5,
    ),
    (
        "pendrive",
        "Small PCB, flash memory (silicon, trace metals), plastics",
        "Pendrives contain a small printed circuit board with lead solder and flash memory \
         chips with various trace metals. While small, the cumulative effect of improper \
         disposal of many such devices contributes to environmental pollution.",
        2,
    ),
    (
        "remote",
        "Plastics, Lead (solder), small PCBs, batteries (often alkaline)",
        "Remote controls are largely plastic with a small internal PCB. Lead is present in \
         solder. While they often use less hazardous alkaline batteries, any battery should \
         be disposed of properly.",
        1,
    ),
    (
        "other_ewaste",
        "Various, depends on specific components",
        "Generic e-waste can contain a mix of plastics, metals, and various hazardous \
         substances depending on the specific components. Proper disposal is crucial to \
         prevent environmental contamination.",
        3,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = HazardCatalog::builtin();
        catalog.validate().unwrap();
    }

    #[test]
    fn sentinel_is_always_present() {
        let catalog = HazardCatalog::builtin();
        let entry = catalog.lookup(SENTINEL_CLASS).unwrap();
        assert_eq!(entry, catalog.sentinel());
        assert_eq!(entry.hazard_level, 1);
    }

    #[test]
    fn lookup_is_exact_key() {
        let catalog = HazardCatalog::builtin();
        assert!(catalog.lookup("battery").is_some());
        assert!(catalog.lookup("Battery").is_none());
        assert!(catalog.lookup(" battery ").is_none());
    }

    #[test]
    fn detector_classes_exclude_sentinel() {
        let catalog = HazardCatalog::builtin();
        let classes = catalog.detector_classes();
        assert_eq!(classes.len(), BUILTIN_ENTRIES.len());
        assert!(!classes.iter().any(|class| class == SENTINEL_CLASS));
        assert!(classes.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
