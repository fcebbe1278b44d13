// Content generation: prompt construction, the model call, and parsing of
// the reply. All model traffic goes through llm_client::TextGenerator.

pub mod generator;
pub mod parse;
pub mod prompts;

pub use generator::{ContentGenerator, HirerGender, JobContext};
