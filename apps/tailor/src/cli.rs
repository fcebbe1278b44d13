use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::document::TemplateMode;
use crate::pipeline::stages::default_output_name;
use crate::pipeline::ApplicationInput;

#[derive(Parser)]
#[command(name = "tailor")]
#[command(version)]
#[command(about = "Tailor a resume and cover letter to a job posting", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a tailored resume and cover letter (.docx and .pdf)
    Generate(GenerateArgs),

    /// Run the HTTP service
    Serve,

    /// Write example resume and cover letter templates
    ExampleTemplates {
        /// Directory to write the templates into
        #[arg(short, long, value_name = "DIR", default_value = "templates")]
        dir: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Path to the resume .docx template
    #[arg(long, value_name = "FILE")]
    pub resume_template: Option<PathBuf>,

    /// Path to the cover letter .docx template
    #[arg(long, value_name = "FILE")]
    pub cover_letter_template: Option<PathBuf>,

    #[arg(long)]
    pub job_title: Option<String>,

    #[arg(long)]
    pub company_name: Option<String>,

    #[arg(long)]
    pub job_description: Option<String>,

    #[arg(long)]
    pub company_overview: Option<String>,

    /// Name of the hiring manager
    #[arg(long)]
    pub hirer_name: Option<String>,

    /// male, female or unknown
    #[arg(long)]
    pub hirer_gender: Option<String>,

    /// Additional experience to draw on
    #[arg(long)]
    pub relevant_experience: Option<String>,

    /// Output directory name (default: "<company>_<title>")
    #[arg(long)]
    pub output_file_name: Option<String>,

    /// sections or placeholders (default: TEMPLATE_MODE)
    #[arg(long, value_parser = clap::value_parser!(TemplateMode))]
    pub mode: Option<TemplateMode>,

    /// Prompt on stdin for missing values
    #[arg(long)]
    pub interactive: bool,

    /// Resume an interrupted session instead of starting a new one
    #[arg(long, value_name = "SESSION_ID", conflicts_with = "interactive")]
    pub session: Option<String>,
}

/// Line-oriented prompts; an empty answer takes the default.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn ask(&mut self, label: &str, default: Option<&str>) -> io::Result<String> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{label} [{d}]: ")?,
            _ => write!(self.output, "{label}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim();
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer.to_string())
        }
    }
}

fn fill(
    prompter: &mut Prompter<impl BufRead, impl Write>,
    value: &mut Option<String>,
    label: &str,
    default: Option<&str>,
) -> io::Result<()> {
    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
        *value = Some(prompter.ask(label, default)?);
    }
    Ok(())
}

fn path_string(path: Option<PathBuf>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

impl GenerateArgs {
    /// Builds the pipeline input. In interactive mode every missing value is
    /// asked for first; otherwise absent required values are left empty for
    /// validation to report.
    pub fn into_input(
        self,
        prompter: Option<&mut Prompter<impl BufRead, impl Write>>,
    ) -> io::Result<ApplicationInput> {
        let mut resume = path_string(self.resume_template);
        let mut cover_letter = path_string(self.cover_letter_template);
        let mut job_title = self.job_title;
        let mut company_name = self.company_name;
        let mut job_description = self.job_description;
        let mut company_overview = self.company_overview;
        let mut hirer_name = self.hirer_name;
        let mut hirer_gender = self.hirer_gender;
        let mut relevant_experience = self.relevant_experience;
        let mut output_file_name = self.output_file_name;

        if let Some(p) = prompter {
            fill(p, &mut resume, "Path to source resume", None)?;
            fill(p, &mut cover_letter, "Path to source cover letter", None)?;
            fill(p, &mut job_title, "Job title", None)?;
            fill(p, &mut company_name, "Company name", None)?;
            fill(p, &mut job_description, "Job description", None)?;
            fill(p, &mut company_overview, "Company overview", None)?;
            fill(p, &mut hirer_name, "Hirer name (optional)", None)?;
            fill(p, &mut hirer_gender, "Hirer gender (male/female/unknown)", Some("unknown"))?;
            fill(p, &mut relevant_experience, "Relevant experience (optional)", None)?;
            let default_name = default_output_name(
                company_name.as_deref().unwrap_or_default(),
                job_title.as_deref().unwrap_or_default(),
            );
            fill(
                p,
                &mut output_file_name,
                "Output file name (without extension)",
                Some(&default_name),
            )?;
        }

        Ok(ApplicationInput {
            resume_source_path: resume.unwrap_or_default(),
            cover_letter_source_path: cover_letter.unwrap_or_default(),
            job_title: job_title.unwrap_or_default(),
            company_name: company_name.unwrap_or_default(),
            job_description,
            company_overview,
            hirer_name,
            hirer_gender,
            relevant_experience,
            output_file_name,
            mode: self.mode,
        })
    }
}
