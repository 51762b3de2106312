// Prompt builders for the rewrite provider.

use super::{ContentKind, EnhancementOption};

/// Appended to every rewrite prompt so the output can be dropped straight into a field.
pub const OUTPUT_ONLY_INSTRUCTION: &str =
    "Output: Return ONLY the rewritten text. Do not include quotes or preambles.";

pub fn instruction(option: EnhancementOption) -> &'static str {
    match option {
        EnhancementOption::Professional => {
            "Rewrite this to be more professional, impactful, and use strong action verbs. \
             Keep the same meaning but elevate the tone."
        }
        EnhancementOption::Grammar => {
            "Fix all grammar, spelling, and punctuation errors. \
             Do not change the tone or structure significantly, just correct the mistakes."
        }
        EnhancementOption::Concise => {
            "Make this more concise and to the point. \
             Remove fluff and unnecessary words while keeping key achievements."
        }
        EnhancementOption::Expand => {
            "Expand on this text with relevant professional details and keywords. \
             Make it more descriptive and comprehensive."
        }
    }
}

pub fn build_prompt(text: &str, kind: ContentKind, option: EnhancementOption) -> String {
    match kind {
        ContentKind::Summary => format!(
            "Act as a professional resume writer.\n\
             Context: Professional Summary section.\n\
             Task: {}\n\
             Input Text: \"{text}\"\n\
             {OUTPUT_ONLY_INSTRUCTION}",
            instruction(option)
        ),
        ContentKind::Experience => format!(
            "Act as a professional resume writer.\n\
             Context: Job Description bullet points.\n\
             Task: {}\n\
             Maintain bullet point formatting if present.\n\
             Input Text: \"{text}\"\n\
             {OUTPUT_ONLY_INSTRUCTION}",
            instruction(option)
        ),
        // Skills are a flat list; the option does not apply.
        ContentKind::Skill => format!(
            "Suggest 10 relevant technical skills separated by commas based on this input: \
             \"{text}\". Just return the comma separated list."
        ),
    }
}
