use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::visibility::{Field, Section};

/// The full user content of one resume. Serialized camelCase so stored blobs keep
/// the shape the editor front end reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub theme_config: ThemeConfig,
    pub personal_info: PersonalInfo,
    pub summary: String,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    pub primary_color: String,
    pub accent_color: String,
    /// Data URL of the uploaded photo.
    pub photo: Option<String>,
    pub photo_shape: PhotoShape,
    #[serde(flatten)]
    pub visibility: VisibilityConfig,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: "#0f172a".to_string(),
            accent_color: "#4f46e5".to_string(),
            photo: None,
            photo_shape: PhotoShape::Circle,
            visibility: VisibilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoShape {
    #[default]
    Circle,
    Square,
    Rounded,
}

/// Two-layer show/hide configuration. Everything starts visible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityConfig {
    pub section_visibility: SectionFlags,
    pub field_visibility: FieldFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionFlags {
    pub address: bool,
    pub personal_details: bool,
    pub links: bool,
    pub summary: bool,
    pub experience: bool,
    pub education: bool,
    pub skills: bool,
}

impl Default for SectionFlags {
    fn default() -> Self {
        Self {
            address: true,
            personal_details: true,
            links: true,
            summary: true,
            experience: true,
            education: true,
            skills: true,
        }
    }
}

impl SectionFlags {
    pub fn get(&self, section: Section) -> bool {
        match section {
            Section::Contact => true,
            Section::Address => self.address,
            Section::PersonalDetails => self.personal_details,
            Section::Links => self.links,
            Section::Summary => self.summary,
            Section::Experience => self.experience,
            Section::Education => self.education,
            Section::Skills => self.skills,
        }
    }

    /// Setting `Contact` is a no-op: that section has no flag.
    pub fn set(&mut self, section: Section, on: bool) {
        let slot = match section {
            Section::Contact => return,
            Section::Address => &mut self.address,
            Section::PersonalDetails => &mut self.personal_details,
            Section::Links => &mut self.links,
            Section::Summary => &mut self.summary,
            Section::Experience => &mut self.experience,
            Section::Education => &mut self.education,
            Section::Skills => &mut self.skills,
        };
        *slot = on;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldFlags {
    pub job_title: bool,
    pub phone: bool,
    pub email: bool,
    pub address: bool,
    pub city: bool,
    pub state: bool,
    pub country: bool,
    pub postal_code: bool,
    pub date_of_birth: bool,
    pub place_of_birth: bool,
    pub nationality: bool,
    pub marital_status: bool,
    pub gender: bool,
    pub driving_license: bool,
    pub linkedin: bool,
    pub website: bool,
}

impl Default for FieldFlags {
    fn default() -> Self {
        Self {
            job_title: true,
            phone: true,
            email: true,
            address: true,
            city: true,
            state: true,
            country: true,
            postal_code: true,
            date_of_birth: true,
            place_of_birth: true,
            nationality: true,
            marital_status: true,
            gender: true,
            driving_license: true,
            linkedin: true,
            website: true,
        }
    }
}

impl FieldFlags {
    fn slot(&mut self, field: Field) -> &mut bool {
        match field {
            Field::JobTitle => &mut self.job_title,
            Field::Phone => &mut self.phone,
            Field::Email => &mut self.email,
            Field::Address => &mut self.address,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::Country => &mut self.country,
            Field::PostalCode => &mut self.postal_code,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::PlaceOfBirth => &mut self.place_of_birth,
            Field::Nationality => &mut self.nationality,
            Field::MaritalStatus => &mut self.marital_status,
            Field::Gender => &mut self.gender,
            Field::DrivingLicense => &mut self.driving_license,
            Field::Linkedin => &mut self.linkedin,
            Field::Website => &mut self.website,
        }
    }

    pub fn get(&self, field: Field) -> bool {
        match field {
            Field::JobTitle => self.job_title,
            Field::Phone => self.phone,
            Field::Email => self.email,
            Field::Address => self.address,
            Field::City => self.city,
            Field::State => self.state,
            Field::Country => self.country,
            Field::PostalCode => self.postal_code,
            Field::DateOfBirth => self.date_of_birth,
            Field::PlaceOfBirth => self.place_of_birth,
            Field::Nationality => self.nationality,
            Field::MaritalStatus => self.marital_status,
            Field::Gender => self.gender,
            Field::DrivingLicense => self.driving_license,
            Field::Linkedin => self.linkedin,
            Field::Website => self.website,
        }
    }

    pub fn set(&mut self, field: Field, on: bool) {
        *self.slot(field) = on;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub driving_license: String,
    pub date_of_birth: String,
    pub place_of_birth: String,
    pub nationality: String,
    pub marital_status: String,
    pub gender: String,
    pub linkedin: String,
    pub website: String,
}

impl PersonalInfo {
    /// Raw value backing a visibility-controlled field.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::JobTitle => &self.job_title,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
            Field::Address => &self.address,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::Country => &self.country,
            Field::PostalCode => &self.postal_code,
            Field::DateOfBirth => &self.date_of_birth,
            Field::PlaceOfBirth => &self.place_of_birth,
            Field::Nationality => &self.nationality,
            Field::MaritalStatus => &self.marital_status,
            Field::Gender => &self.gender,
            Field::DrivingLicense => &self.driving_license,
            Field::Linkedin => &self.linkedin,
            Field::Website => &self.website,
        }
    }

    /// `first last`, trimmed; empty when both are blank.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub id: Uuid,
    pub company: String,
    pub role: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

impl Default for Experience {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            company: String::new(),
            role: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            description: String::new(),
        }
    }
}

/// Partial update of an experience entry; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperiencePatch {
    pub company: Option<String>,
    pub role: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

impl ExperiencePatch {
    fn apply(self, entry: &mut Experience) {
        if let Some(v) = self.company {
            entry.company = v;
        }
        if let Some(v) = self.role {
            entry.role = v;
        }
        if let Some(v) = self.start_date {
            entry.start_date = v;
        }
        if let Some(v) = self.end_date {
            entry.end_date = v;
        }
        if let Some(v) = self.description {
            entry.description = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub id: Uuid,
    pub school: String,
    pub degree: String,
    pub year: String,
    pub percentage: String,
    pub grade: String,
    pub cgpa: String,
    pub gpa: String,
}

impl Default for Education {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            school: String::new(),
            degree: String::new(),
            year: String::new(),
            percentage: String::new(),
            grade: String::new(),
            cgpa: String::new(),
            gpa: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationPatch {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub year: Option<String>,
    pub percentage: Option<String>,
    pub grade: Option<String>,
    pub cgpa: Option<String>,
    pub gpa: Option<String>,
}

impl EducationPatch {
    fn apply(self, entry: &mut Education) {
        let pairs = [
            (self.school, &mut entry.school),
            (self.degree, &mut entry.degree),
            (self.year, &mut entry.year),
            (self.percentage, &mut entry.percentage),
            (self.grade, &mut entry.grade),
            (self.cgpa, &mut entry.cgpa),
            (self.gpa, &mut entry.gpa),
        ];
        for (value, slot) in pairs {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

impl Document {
    /// True when the user has entered anything worth rendering.
    pub fn has_entered_data(&self) -> bool {
        let info = &self.personal_info;
        [
            &info.first_name,
            &info.last_name,
            &info.email,
            &info.job_title,
            &self.summary,
        ]
        .iter()
        .any(|s| !s.trim().is_empty())
            || !self.experience.is_empty()
            || !self.education.is_empty()
            || !self.skills.is_empty()
            || self.theme_config.photo.is_some()
    }

    /// Prepends a blank experience entry and returns its id.
    pub fn add_experience(&mut self) -> Uuid {
        let entry = Experience::default();
        let id = entry.id;
        self.experience.insert(0, entry);
        id
    }

    pub fn experience_mut(&mut self, id: Uuid) -> Option<&mut Experience> {
        self.experience.iter_mut().find(|e| e.id == id)
    }

    pub fn update_experience(&mut self, id: Uuid, patch: ExperiencePatch) -> bool {
        match self.experience_mut(id) {
            Some(entry) => {
                patch.apply(entry);
                true
            }
            None => false,
        }
    }

    pub fn remove_experience(&mut self, id: Uuid) -> bool {
        let before = self.experience.len();
        self.experience.retain(|e| e.id != id);
        self.experience.len() != before
    }

    /// Prepends a blank education entry and returns its id.
    pub fn add_education(&mut self) -> Uuid {
        let entry = Education::default();
        let id = entry.id;
        self.education.insert(0, entry);
        id
    }

    pub fn update_education(&mut self, id: Uuid, patch: EducationPatch) -> bool {
        match self.education.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                patch.apply(entry);
                true
            }
            None => false,
        }
    }

    pub fn remove_education(&mut self, id: Uuid) -> bool {
        let before = self.education.len();
        self.education.retain(|e| e.id != id);
        self.education.len() != before
    }

    /// Replaces skills from comma-separated text, dropping blank items.
    pub fn set_skills_from_text(&mut self, text: &str) {
        self.skills = text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    pub fn skills_text(&self) -> String {
        self.skills.join(", ")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

/// Closed set of visual templates. Adding a template means adding a variant here and
/// its layout in `render`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Modern,
    Classic,
    #[default]
    Minimalist,
    Bold,
    Tech,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::Modern,
        TemplateKind::Classic,
        TemplateKind::Minimalist,
        TemplateKind::Bold,
        TemplateKind::Tech,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Modern => "modern",
            TemplateKind::Classic => "classic",
            TemplateKind::Minimalist => "minimalist",
            TemplateKind::Bold => "bold",
            TemplateKind::Tech => "tech",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown template '{s}'"))
    }
}
