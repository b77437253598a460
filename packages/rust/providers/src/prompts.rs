//! Prompt text sent to the generation provider.

use crate::generation::{AugmentRequest, EmailRequest};

const NOT_PROVIDED: &str = "not provided";

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(NOT_PROVIDED)
}

/// Hierarchy inference plus an outreach draft, answered in marker form.
pub(crate) fn augmentation_prompt(request: &AugmentRequest) -> String {
    let degree = request
        .connection_degree
        .map(|d| d.as_str())
        .unwrap_or(NOT_PROVIDED);

    format!(
        "You are helping with a Product Manager job search.\n\
         \n\
         Prospect:\n\
         - Name: {name}\n\
         - Title: {title}\n\
         - Company: {company}\n\
         - Connection degree: {degree}\n\
         - Email: {email}\n\
         - Phone: {phone}\n\
         \n\
         Given the title, infer the prospect's hierarchy level (VP, Director, etc.) \
         and who they likely report to and manage. Then draft a short, personalized \
         outreach email to them.\n\
         \n\
         Return exactly this format:\n\
         Hierarchy: <one or two sentences>\n\
         Email: Subject: <subject line>\n\
         \n\
         <email body>",
        name = request.name,
        title = or_missing(request.title.as_deref()),
        company = or_missing(request.company.as_deref()),
        email = or_missing(request.email.as_deref()),
        phone = or_missing(request.phone.as_deref()),
    )
}

/// Email-only draft, answered as a JSON object.
pub(crate) fn email_prompt(request: &EmailRequest) -> String {
    let context = request
        .context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("Additional context: {c}\n\n"))
        .unwrap_or_default();

    format!(
        "Generate a personalized outreach email for this lead:\n\
         \n\
         Name: {name}\n\
         Title: {title}\n\
         Company: {company}\n\
         \n\
         {context}\
         Create a professional, personalized email that:\n\
         1. Shows research about their role and company\n\
         2. Provides value or insight\n\
         3. Has a clear but soft call-to-action\n\
         4. Is concise (under 150 words)\n\
         \n\
         Return a JSON object with:\n\
         - subject: email subject line\n\
         - content: email body\n\
         \n\
         Return only valid JSON, no additional text.",
        name = request.name,
        title = or_missing(request.title.as_deref()),
        company = or_missing(request.company.as_deref()),
    )
}
