//! Standard attribute tag resolution.
//!
//! Resolves `includefield` tokens either as literal hex tags (`GGGGEEEE` or
//! `GGGG,EEEE`) or via a fixed keyword dictionary of well-known attributes.
//! The dictionary is a closed set built once at first use.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use voxel_core::{AttributeTag, TagResolver};

/// Well-known attribute keywords, keyed by lowercased name.
static KEYWORDS: Lazy<HashMap<&'static str, AttributeTag>> = Lazy::new(|| {
    let entries: &[(&str, u16, u16)] = &[
        ("sopclassuid", 0x0008, 0x0016),
        ("sopinstanceuid", 0x0008, 0x0018),
        ("studydate", 0x0008, 0x0020),
        ("studytime", 0x0008, 0x0030),
        ("accessionnumber", 0x0008, 0x0050),
        ("modality", 0x0008, 0x0060),
        ("modalitiesinstudy", 0x0008, 0x0061),
        ("referringphysicianname", 0x0008, 0x0090),
        ("studydescription", 0x0008, 0x1030),
        ("seriesdescription", 0x0008, 0x103E),
        ("patientname", 0x0010, 0x0010),
        ("patientid", 0x0010, 0x0020),
        ("patientbirthdate", 0x0010, 0x0030),
        ("patientsex", 0x0010, 0x0040),
        ("studyinstanceuid", 0x0020, 0x000D),
        ("seriesinstanceuid", 0x0020, 0x000E),
        ("studyid", 0x0020, 0x0010),
        ("seriesnumber", 0x0020, 0x0011),
        ("instancenumber", 0x0020, 0x0013),
        ("numberofstudyrelatedinstances", 0x0020, 0x1208),
        ("performedprocedurestepstartdate", 0x0040, 0x0244),
        ("performedprocedurestepstarttime", 0x0040, 0x0245),
    ];
    entries
        .iter()
        .map(|&(name, group, element)| (name, AttributeTag::new(group, element)))
        .collect()
});

/// Resolver over literal hex tags plus the standard keyword dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTagResolver;

impl StandardTagResolver {
    pub fn new() -> Self {
        Self
    }
}

impl TagResolver for StandardTagResolver {
    fn resolve(&self, token: &str) -> Option<AttributeTag> {
        if let Some(tag) = AttributeTag::parse(token) {
            return Some(tag);
        }
        KEYWORDS.get(token.to_ascii_lowercase().as_str()).copied()
    }
}
