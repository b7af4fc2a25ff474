//! Generation request arguments shared by `job submit` and `generate`

use clap::Args;
use quill_core::domain::request::{GenerationRequest, StructureFlags, Tone};

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Topic of the article
    pub topic: String,

    /// Target keyword, highest ranked first (repeatable)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Target word count
    #[arg(short, long, default_value_t = 1200)]
    pub words: u32,

    /// Writing tone (professional, conversational, technical, friendly, persuasive)
    #[arg(long, default_value = "professional")]
    pub tone: Tone,

    /// Ask for a FAQ section
    #[arg(long)]
    pub faq: bool,

    /// Skip the closing conclusion section
    #[arg(long)]
    pub no_conclusion: bool,
}

impl From<RequestArgs> for GenerationRequest {
    fn from(args: RequestArgs) -> Self {
        GenerationRequest {
            tone: args.tone,
            flags: StructureFlags {
                include_faq: args.faq,
                include_conclusion: !args.no_conclusion,
            },
            ..GenerationRequest::new(args.topic, args.keywords, args.words)
        }
    }
}
