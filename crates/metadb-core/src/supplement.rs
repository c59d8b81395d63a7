//! Supplemental schema resolution.
//!
//! A supplemental schema overlays custom-attribute instances onto a
//! primary schema. Resolution selects the eligible candidates for a
//! primary, picks a winner per overlay purpose, and merges winners in
//! ascending priority order so the highest priority lands last.

use std::collections::HashMap;
use std::sync::Arc;

use metadb_model::{SchemaDef, SchemaKey};
use tracing::debug;

/// Select the supplementals that apply to a primary, in merge order.
///
/// Eligibility: the marker names the primary, the declared major
/// version equals the primary's, and the declared minor version is at
/// or above the primary's. Among eligible candidates of one purpose
/// the one with the highest minor version wins. Winners come back
/// sorted by ascending priority; the last applied takes precedence.
pub fn eligible_supplementals<'a>(
    primary: &SchemaKey,
    candidates: &'a [Arc<SchemaDef>],
) -> Vec<&'a SchemaDef> {
    let mut by_purpose: HashMap<&str, &SchemaDef> = HashMap::new();

    for candidate in candidates {
        let Some(info) = &candidate.supplemental else {
            continue;
        };
        if info.primary_name != primary.name {
            continue;
        }
        if info.primary_major != primary.version_major || info.primary_minor < primary.version_minor
        {
            debug!(
                supplemental = %candidate.key,
                primary = %primary,
                "supplemental version gate not met, skipping"
            );
            continue;
        }
        match by_purpose.get(info.purpose.as_str()) {
            Some(current) if overlay_rank(current) >= overlay_rank(candidate) => {}
            _ => {
                by_purpose.insert(&info.purpose, candidate);
            }
        }
    }

    let mut winners: Vec<&SchemaDef> = by_purpose.into_values().collect();
    winners.sort_by(|a, b| {
        let pa = a.supplemental.as_ref().map(|i| i.priority).unwrap_or(0);
        let pb = b.supplemental.as_ref().map(|i| i.priority).unwrap_or(0);
        pa.cmp(&pb).then_with(|| a.key.cmp(&b.key))
    });
    winners
}

/// Ranking within one purpose: the supplemental's own minor version,
/// then the minor version it declares for the primary. Names play no
/// part in the ordering.
fn overlay_rank(schema: &SchemaDef) -> (u32, u32) {
    let declared = schema
        .supplemental
        .as_ref()
        .map(|i| i.primary_minor)
        .unwrap_or(0);
    (schema.key.version_minor, declared)
}

/// Compute the effective schema: the primary with every eligible
/// supplemental's attributes merged in.
///
/// Merging matches classes and properties by name; supplemental
/// elements without a counterpart in the primary contribute nothing.
/// An instance of an attribute class already present on the element
/// replaces it, other attribute classes accumulate.
pub fn supplement_schema(primary: &SchemaDef, candidates: &[Arc<SchemaDef>]) -> SchemaDef {
    let winners = eligible_supplementals(&primary.key, candidates);
    if winners.is_empty() {
        return primary.clone();
    }

    let mut merged = primary.clone();
    for supplemental in winners {
        debug!(
            supplemental = %supplemental.key,
            primary = %primary.key,
            "applying supplemental overlay"
        );
        for overlay_class in &supplemental.classes {
            let Some(class) = merged.class_mut(&overlay_class.name) else {
                continue;
            };
            for attr in &overlay_class.attributes {
                class.set_attribute(attr.clone());
            }
            for overlay_prop in &overlay_class.properties {
                let Some(prop) = class.get_property_mut(&overlay_prop.name) else {
                    continue;
                };
                for attr in &overlay_prop.attributes {
                    prop.set_attribute(attr.clone());
                }
            }
        }
    }
    merged
}
