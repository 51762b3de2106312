//! Visibility resolution — composes section-level and field-level toggles into the
//! final render decision for each piece of document content.
//!
//! # Rules
//! - A field is displayable iff its own flag is on, its owning section's flag is on,
//!   and its value is non-empty after trimming.
//! - A section flag that is off suppresses its fields without clearing their flags,
//!   so switching the section back on restores the earlier field choices.
//! - Sections without fields (summary, experience, education, skills) are governed
//!   by their section flag plus content presence.
//!
//! Every function here is pure and cheap enough to run on each render.

use serde::{Deserialize, Serialize};

use crate::models::document::{Document, ThemeConfig, VisibilityConfig};

// ────────────────────────────────────────────────────────────────────────────
// Keys
// ────────────────────────────────────────────────────────────────────────────

/// A logical grouping of document content with one master visibility flag.
///
/// `Contact` groups job title, phone and email. It has no configurable flag and is
/// always enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Contact,
    Address,
    PersonalDetails,
    Links,
    Summary,
    Experience,
    Education,
    Skills,
}

impl Section {
    /// Member fields in display order. Empty for sections without field granularity.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Section::Contact => &[Field::JobTitle, Field::Email, Field::Phone],
            Section::Address => &[
                Field::Address,
                Field::City,
                Field::State,
                Field::Country,
                Field::PostalCode,
            ],
            Section::PersonalDetails => &[
                Field::DateOfBirth,
                Field::PlaceOfBirth,
                Field::Nationality,
                Field::MaritalStatus,
                Field::Gender,
                Field::DrivingLicense,
            ],
            Section::Links => &[Field::Linkedin, Field::Website],
            Section::Summary | Section::Experience | Section::Education | Section::Skills => &[],
        }
    }

    pub fn has_fields(self) -> bool {
        !self.fields().is_empty()
    }
}

/// A single leaf data item with its own visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    JobTitle,
    Phone,
    Email,
    Address,
    City,
    State,
    Country,
    PostalCode,
    DateOfBirth,
    PlaceOfBirth,
    Nationality,
    MaritalStatus,
    Gender,
    DrivingLicense,
    Linkedin,
    Website,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::JobTitle,
        Field::Phone,
        Field::Email,
        Field::Address,
        Field::City,
        Field::State,
        Field::Country,
        Field::PostalCode,
        Field::DateOfBirth,
        Field::PlaceOfBirth,
        Field::Nationality,
        Field::MaritalStatus,
        Field::Gender,
        Field::DrivingLicense,
        Field::Linkedin,
        Field::Website,
    ];

    /// The section that owns this field. Each field belongs to exactly one section.
    pub fn section(self) -> Section {
        match self {
            Field::JobTitle | Field::Phone | Field::Email => Section::Contact,
            Field::Address | Field::City | Field::State | Field::Country | Field::PostalCode => {
                Section::Address
            }
            Field::DateOfBirth
            | Field::PlaceOfBirth
            | Field::Nationality
            | Field::MaritalStatus
            | Field::Gender
            | Field::DrivingLicense => Section::PersonalDetails,
            Field::Linkedin | Field::Website => Section::Links,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::JobTitle => "Job Title",
            Field::Phone => "Phone",
            Field::Email => "Email",
            Field::Address => "Address",
            Field::City => "City",
            Field::State => "State",
            Field::Country => "Country",
            Field::PostalCode => "Postal Code",
            Field::DateOfBirth => "Date of Birth",
            Field::PlaceOfBirth => "Place of Birth",
            Field::Nationality => "Nationality",
            Field::MaritalStatus => "Marital Status",
            Field::Gender => "Gender",
            Field::DrivingLicense => "Driving License",
            Field::Linkedin => "LinkedIn",
            Field::Website => "Website",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Returns true iff the owning section is enabled, the field flag is on, and the
/// value is non-empty after trimming.
pub fn is_field_visible(config: &VisibilityConfig, field: Field, raw_value: &str) -> bool {
    config.section_visibility.get(field.section())
        && config.field_visibility.get(field)
        && !raw_value.trim().is_empty()
}

/// The photo has no flag of its own; it shows whenever one is set.
pub fn is_photo_visible(theme: &ThemeConfig) -> bool {
    theme.photo.is_some()
}

/// Whether the section's underlying content is non-empty.
///
/// For sections with fields this ignores visibility flags and checks raw values only.
pub fn section_has_content(document: &Document, section: Section) -> bool {
    match section {
        Section::Summary => !document.summary.trim().is_empty(),
        Section::Experience => !document.experience.is_empty(),
        Section::Education => !document.education.is_empty(),
        Section::Skills => !document.skills.is_empty(),
        _ => section
            .fields()
            .iter()
            .any(|f| !document.personal_info.value(*f).trim().is_empty()),
    }
}

/// Whether anything of the section would be drawn.
///
/// Field-less sections collapse to `flag && has content`; sections with fields are
/// visible when at least one member field is visible.
pub fn is_section_visible(document: &Document, section: Section) -> bool {
    let config = &document.theme_config.visibility;
    if !config.section_visibility.get(section) {
        return false;
    }
    if section.has_fields() {
        section.fields().iter().any(|f| {
            is_field_visible(config, *f, document.personal_info.value(*f))
        })
    } else {
        section_has_content(document, section)
    }
}

/// Displayable `(field, value)` pairs of a section in display order.
pub fn visible_fields(document: &Document, section: Section) -> Vec<(Field, &str)> {
    let config = &document.theme_config.visibility;
    section
        .fields()
        .iter()
        .filter_map(|f| {
            let value = document.personal_info.value(*f);
            is_field_visible(config, *f, value).then_some((*f, value.trim()))
        })
        .collect()
}

/// Composes the one-line location shown in template headers:
/// `address, city, state, country postal` with hidden or empty parts dropped.
pub fn location_line(document: &Document) -> String {
    let parts: Vec<&str> = visible_fields(document, Section::Address)
        .into_iter()
        .filter(|(f, _)| *f != Field::PostalCode)
        .map(|(_, v)| v)
        .collect();
    let location = parts.join(", ");

    let config = &document.theme_config.visibility;
    let postal = document.personal_info.postal_code.trim();
    if is_field_visible(config, Field::PostalCode, postal) {
        format!("{location} {postal}").trim().to_string()
    } else {
        location
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
