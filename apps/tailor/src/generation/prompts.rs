// Prompt constants for resume and cover-letter generation.
// Placeholders in `{braces}` are filled with `.replace` before sending.

/// Resume system prompt. Replace: {preserve_instruction}, {json_instruction}
pub const RESUME_SYSTEM: &str = r#"You are an expert resume writer. Your task is to customize a resume for a specific job application.
You will be given the existing content of the resume along with a job description and company information.

Focus on:
1. Summary/Profile: highlight the skills and experience most relevant to this job
2. Experience: emphasize achievements and responsibilities that match the requirements
3. Skills: prioritize skills that the job description mentions

{preserve_instruction}
Do NOT modify the education section.
If additional relevant experience is provided, incorporate it naturally into the appropriate sections.
Keep the tone professional and consistent with the original resume.

{json_instruction}"#;

/// Cover-letter system prompt. Replace: {preserve_instruction}, {json_instruction}
pub const COVER_LETTER_SYSTEM: &str = r#"You are an expert cover letter writer. Your task is to customize a cover letter for a specific job application.
You will be given the existing content of the cover letter along with a job description and company information.

First decide from the company overview and job description whether the company is:
  a) the actual employer (direct hiring), or
  b) a recruitment or staffing agency hiring on behalf of a client.
For an agency, address the recruiter and express interest in the CLIENT company named in the job description, not in joining the agency.
For direct hiring, address the hiring manager and focus on joining their company.

{preserve_instruction}
If a hiring manager name is given, address them appropriately for the stated gender (Mr./Ms.); for an unknown gender use their full name.
If no hiring manager is given, use a suitable general greeting.
If additional relevant experience is provided, incorporate it naturally.
Keep the tone professional, enthusiastic and specific to this job and company.

{json_instruction}"#;

/// Shared user prompt. Replace: {job_title}, {company_name}, {hiring_manager},
/// {job_description}, {company_overview}, {relevant_experience},
/// {payload_label}, {payload}, {key_instruction}
pub const USER_PROMPT_TEMPLATE: &str = r#"Job Title: {job_title}
Company: {company_name}
{hiring_manager}
Job Description:
{job_description}

Company Overview:
{company_overview}

Additional Relevant Experience:
{relevant_experience}

{payload_label}:
{payload}

{key_instruction}"#;

/// Hiring-manager lines, cover letters only. Replace: {hirer_name}, {hirer_gender}
pub const HIRING_MANAGER_LINES: &str = "Hiring Manager: {hirer_name}\nHiring Manager Gender: {hirer_gender}\n";

pub const SECTIONS_KEY_INSTRUCTION: &str = "Return a JSON object whose keys are the section names above \
    and whose values are arrays of strings, one string per paragraph of updated content. \
    Include every section that has content, headings included.";

pub const PLACEHOLDERS_KEY_INSTRUCTION: &str = "Return a JSON object whose keys are exactly the placeholder \
    names above (without braces) and whose values are the replacement text for each placeholder.";
