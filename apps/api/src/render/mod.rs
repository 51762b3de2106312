//! Render view — maps a document plus its visibility rules into the data structure a
//! template renderer consumes. Markup and styling live with the renderer; this module
//! only decides what is shown, in which order, under which headings.

use serde::Serialize;
use uuid::Uuid;

use crate::models::document::{Document, PhotoShape, TemplateKind};
use crate::visibility::{
    is_photo_visible, is_section_visible, location_line, visible_fields, Field, Section,
};

pub mod rich_text;

pub use rich_text::{parse_rich_text, RichLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletStyle {
    Dot,
    Arrow,
    Check,
    Star,
}

/// Per-template layout decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateLayout {
    pub template: TemplateKind,
    pub bullet_style: BulletStyle,
    /// Sections drawn in a side column, if the template has one.
    pub sidebar: &'static [Section],
    /// Body sections in display order.
    pub body: &'static [Section],
    pub summary_heading: &'static str,
    pub experience_heading: &'static str,
    pub education_heading: &'static str,
    pub skills_heading: &'static str,
}

impl TemplateLayout {
    pub fn heading(&self, section: Section) -> Option<&'static str> {
        match section {
            Section::Summary => Some(self.summary_heading),
            Section::Experience => Some(self.experience_heading),
            Section::Education => Some(self.education_heading),
            Section::Skills => Some(self.skills_heading),
            _ => None,
        }
    }
}

const STANDARD_BODY: &[Section] = &[
    Section::Summary,
    Section::Experience,
    Section::Education,
    Section::Skills,
];

pub fn layout_for(template: TemplateKind) -> TemplateLayout {
    match template {
        TemplateKind::Minimalist => TemplateLayout {
            template,
            bullet_style: BulletStyle::Dot,
            sidebar: &[],
            body: STANDARD_BODY,
            summary_heading: "Professional Summary",
            experience_heading: "Experience",
            education_heading: "Education",
            skills_heading: "Skills",
        },
        TemplateKind::Classic => TemplateLayout {
            template,
            bullet_style: BulletStyle::Dot,
            sidebar: &[],
            body: STANDARD_BODY,
            summary_heading: "Professional Profile",
            experience_heading: "Work Experience",
            education_heading: "Education",
            skills_heading: "Skills",
        },
        TemplateKind::Modern => TemplateLayout {
            template,
            bullet_style: BulletStyle::Arrow,
            sidebar: &[
                Section::Contact,
                Section::Address,
                Section::Links,
                Section::PersonalDetails,
                Section::Skills,
                Section::Education,
            ],
            body: &[Section::Summary, Section::Experience],
            summary_heading: "Profile",
            experience_heading: "Experience",
            education_heading: "Education",
            skills_heading: "Skills",
        },
        TemplateKind::Bold => TemplateLayout {
            template,
            bullet_style: BulletStyle::Dot,
            sidebar: &[Section::Skills, Section::Address],
            body: &[Section::Summary, Section::Experience, Section::Education],
            summary_heading: "Profile",
            experience_heading: "Experience",
            education_heading: "Education",
            skills_heading: "Expertise",
        },
        TemplateKind::Tech => TemplateLayout {
            template,
            bullet_style: BulletStyle::Dot,
            sidebar: &[],
            body: &[
                Section::Summary,
                Section::Experience,
                Section::Skills,
                Section::Education,
            ],
            summary_heading: "about.md",
            experience_heading: "experience.log",
            education_heading: "education.log",
            skills_heading: "skills.array",
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// View model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub field: Field,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceView {
    pub id: Uuid,
    pub role: String,
    pub company: String,
    /// `start - end`, either side omitted when blank.
    pub period: String,
    pub description: Vec<RichLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationView {
    pub id: Uuid,
    pub school: String,
    pub degree: String,
    pub year: String,
    /// Non-empty score lines such as `GPA: 3.9`.
    pub scores: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionBody {
    Fields { fields: Vec<FieldView> },
    Text { lines: Vec<RichLine> },
    Experience { entries: Vec<ExperienceView> },
    Education { entries: Vec<EducationView> },
    Skills { items: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub heading: Option<&'static str>,
    pub in_sidebar: bool,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderView {
    pub full_name: String,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub photo: Option<String>,
    pub photo_shape: PhotoShape,
}

/// Everything a renderer needs for one document in one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub layout: TemplateLayout,
    pub primary_color: String,
    pub accent_color: String,
    pub header: HeaderView,
    pub sections: Vec<SectionView>,
}

pub fn build_view(document: &Document, template: TemplateKind) -> DocumentView {
    let layout = layout_for(template);
    let theme = &document.theme_config;

    let job_title: Vec<_> = visible_fields(document, Section::Contact)
        .into_iter()
        .filter(|(f, _)| *f == Field::JobTitle)
        .map(|(_, v)| v.to_string())
        .collect();
    let location = location_line(document);

    let header = HeaderView {
        full_name: document.personal_info.full_name(),
        job_title: job_title.into_iter().next(),
        location: (!location.is_empty()).then_some(location),
        photo: is_photo_visible(theme).then(|| theme.photo.clone()).flatten(),
        photo_shape: theme.photo_shape,
    };

    let ordered = layout
        .sidebar
        .iter()
        .map(|s| (*s, true))
        .chain(
            layout
                .body
                .iter()
                .filter(|s| !layout.sidebar.contains(s))
                .map(|s| (*s, false)),
        )
        .chain(
            // Field sections a template does not place explicitly go after the body.
            [Section::Contact, Section::Links, Section::PersonalDetails]
                .into_iter()
                .filter(|s| !layout.sidebar.contains(s) && !layout.body.contains(s))
                .map(|s| (s, false)),
        );

    let sections = ordered
        .filter(|(section, _)| is_section_visible(document, *section))
        .map(|(section, in_sidebar)| SectionView {
            section,
            heading: layout.heading(section),
            in_sidebar,
            body: section_body(document, section),
        })
        .collect();

    DocumentView {
        layout,
        primary_color: theme.primary_color.clone(),
        accent_color: theme.accent_color.clone(),
        header,
        sections,
    }
}

fn section_body(document: &Document, section: Section) -> SectionBody {
    match section {
        Section::Summary => SectionBody::Text {
            lines: parse_rich_text(&document.summary),
        },
        Section::Experience => SectionBody::Experience {
            entries: document
                .experience
                .iter()
                .map(|e| ExperienceView {
                    id: e.id,
                    role: e.role.trim().to_string(),
                    company: e.company.trim().to_string(),
                    period: join_non_empty(&[&e.start_date, &e.end_date], " - "),
                    description: parse_rich_text(&e.description),
                })
                .collect(),
        },
        Section::Education => SectionBody::Education {
            entries: document
                .education
                .iter()
                .map(|e| EducationView {
                    id: e.id,
                    school: e.school.trim().to_string(),
                    degree: e.degree.trim().to_string(),
                    year: e.year.trim().to_string(),
                    scores: [
                        ("Percentage", &e.percentage),
                        ("Grade", &e.grade),
                        ("CGPA", &e.cgpa),
                        ("GPA", &e.gpa),
                    ]
                    .into_iter()
                    .filter(|(_, v)| !v.trim().is_empty())
                    .map(|(label, v)| format!("{label}: {}", v.trim()))
                    .collect(),
                })
                .collect(),
        },
        Section::Skills => SectionBody::Skills {
            items: document.skills.clone(),
        },
        _ => SectionBody::Fields {
            fields: visible_fields(document, section)
                .into_iter()
                .map(|(field, value)| FieldView {
                    field,
                    label: field.label(),
                    value: value.to_string(),
                })
                .collect(),
        },
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

// ────────────────────────────────────────────────────────────────────────────
// Export
// ────────────────────────────────────────────────────────────────────────────

/// `{First|My}_{Last|Resume}.{extension}`. Anything outside ASCII letters, digits,
/// `-` and `_` becomes `_` so the name is safe inside a quoted header parameter.
pub fn export_file_name(document: &Document, extension: &str) -> String {
    format!(
        "{}_{}.{extension}",
        file_name_part(&document.personal_info.first_name, "My"),
        file_name_part(&document.personal_info.last_name, "Resume")
    )
}

fn file_name_part(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Markdown rendering of a view, used as the downloadable artifact.
pub fn render_markdown(view: &DocumentView) -> String {
    let mut md = String::new();
    let header = &view.header;
    if !header.full_name.is_empty() {
        md.push_str(&format!("# {}\n\n", header.full_name));
    }
    if let Some(title) = &header.job_title {
        md.push_str(&format!("**{title}**\n\n"));
    }
    if let Some(location) = &header.location {
        md.push_str(&format!("{location}\n\n"));
    }

    let bullet = match view.layout.bullet_style {
        BulletStyle::Dot => "-",
        BulletStyle::Arrow => "➢",
        BulletStyle::Check => "✓",
        BulletStyle::Star => "★",
    };

    for section in &view.sections {
        if let Some(heading) = section.heading {
            md.push_str(&format!("## {heading}\n\n"));
        }
        match &section.body {
            SectionBody::Fields { fields } => {
                for f in fields {
                    md.push_str(&format!("- **{}:** {}\n", f.label, f.value));
                }
            }
            SectionBody::Text { lines } => push_rich_lines(&mut md, lines, bullet),
            SectionBody::Experience { entries } => {
                for e in entries {
                    let title = join_non_empty(&[&e.role, &e.company], " — ");
                    md.push_str(&format!("### {title}\n"));
                    if !e.period.is_empty() {
                        md.push_str(&format!("*{}*\n", e.period));
                    }
                    md.push('\n');
                    push_rich_lines(&mut md, &e.description, bullet);
                }
            }
            SectionBody::Education { entries } => {
                for e in entries {
                    let title = join_non_empty(&[&e.degree, &e.school], ", ");
                    md.push_str(&format!("### {title}\n"));
                    if !e.year.is_empty() {
                        md.push_str(&format!("*{}*\n", e.year));
                    }
                    for score in &e.scores {
                        md.push_str(&format!("- {score}\n"));
                    }
                    md.push('\n');
                }
            }
            SectionBody::Skills { items } => {
                md.push_str(&items.join(", "));
                md.push('\n');
            }
        }
        md.push('\n');
    }
    md
}

fn push_rich_lines(md: &mut String, lines: &[RichLine], bullet: &str) {
    for line in lines {
        match line {
            RichLine::Bullet(text) => md.push_str(&format!("{bullet} {text}\n")),
            RichLine::Plain(text) => md.push_str(&format!("{text}\n")),
        }
    }
    if !lines.is_empty() {
        md.push('\n');
    }
}
