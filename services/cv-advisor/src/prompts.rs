//! Prompt construction for the two request kinds
//!
//! Both prompts ask for Markdown in the configured response language. Inputs
//! are trimmed here; an empty profile or interest list never reaches the
//! dispatcher.

use crate::error::{Error, Result};

/// Review prompt for a CV or filled-in profile.
pub fn analysis_prompt(profile: &str, target_field: Option<&str>, language: &str) -> Result<String> {
    let profile = profile.trim();
    if profile.is_empty() {
        return Err(Error::InvalidRequest("cvText must not be empty".into()));
    }
    let target = target_field.map(str::trim).filter(|t| !t.is_empty());

    let emphasis = match target {
        Some(field) => format!(
            "\n**IMPORTANT**: The candidate wants to build a career in **\"{field}\"**. \
             Focus the review on how well the profile fits that direction.\n"
        ),
        None => String::new(),
    };
    let strengths_fit = match target {
        Some(field) => {
            format!("\n   - Judge whether these strengths support the goal \"{field}\".")
        }
        None => String::new(),
    };
    let industry = target.unwrap_or("relevant");
    let projects_for = match target {
        Some(field) => format!(" in {field}"),
        None => String::new(),
    };

    Ok(format!(
        "You are a career counsellor and recruitment specialist (HR Specialist). \
Analyse the following CV / profile and give detailed feedback written in **{language}**.
{emphasis}
Produce a report with 4 main sections, formatted as Markdown:

1. **Strengths**
   - List the 5-7 most notable strengths in skills, experience or mindset.{strengths_fit}

2. **Weaknesses & Improvements**
   - Point out 3-5 gaps or weaknesses in the CV (especially against the standards of the {industry} industry).
   - Suggest concrete fixes that would make the profile stand out.

3. **Recommended Projects & Learning Path**
   - Propose 3-5 concrete side-project ideas that would impress recruiters{projects_for}.
   - Suggest keywords, tech stacks or short courses worth exploring.

4. **Suitable Jobs**
   - Propose 5-7 specific positions that match the current skill set.
   - Briefly explain why each one fits.

---
CV / profile:
{profile}
---
"
    ))
}

/// Orientation prompt for a student who only knows their areas of interest.
pub fn exploration_prompt(interests: &[String], language: &str) -> Result<String> {
    let interests: Vec<&str> = interests
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();
    if interests.is_empty() {
        return Err(Error::InvalidRequest(
            "cvText must list at least one interest".into(),
        ));
    }

    Ok(format!(
        "I am a student without a clear direction yet, but I am interested in the following fields: {}.

Act as a mentor and give me short advice written in **{language}**:
1. **Overview**: What these fields involve and what the career opportunities look like.
2. **Starter projects**: Suggest 3 mini-projects or concrete topics I can try to see whether they suit me.
3. **Courses & skills**: Which courses (keywords) or tools I should start learning.

Answer in Markdown, in a friendly and encouraging tone.
",
        interests.join(", ")
    ))
}
