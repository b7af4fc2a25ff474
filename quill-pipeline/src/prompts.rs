//! Prompt builders for the provider-backed stages
//!
//! Every prompt starts with a fixed instruction line so that the stage a
//! prompt belongs to can be recognized from its first line.

use quill_core::domain::request::GenerationRequest;

use crate::config::PipelineConfig;

pub const RESEARCH_INSTRUCTION: &str = "Prepare a research outline for a blog article.";
pub const DRAFT_INSTRUCTION: &str = "Write a blog article in Markdown.";
pub const SEO_INSTRUCTION: &str = "Write the SEO title and meta description for a blog article.";

pub fn research(request: &GenerationRequest, context: &[String]) -> String {
    let mut prompt = format!(
        "{}\n\nTopic: {}\nKeywords: {}\nTone: {}\n",
        RESEARCH_INSTRUCTION,
        request.topic,
        keyword_list(request),
        request.tone
    );

    if !context.is_empty() {
        prompt.push_str("\nBackground material:\n");
        for snippet in context {
            prompt.push_str("- ");
            prompt.push_str(snippet);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nList the main sections with a short note on what each covers, \
         the questions readers are likely to ask, and facts worth citing.\n",
    );
    prompt
}

pub fn draft(request: &GenerationRequest, outline: Option<&str>, config: &PipelineConfig) -> String {
    let (min, max) = config.word_band(request.target_word_count);

    let mut prompt = format!(
        "{}\n\nTopic: {}\nKeywords: {}\nTone: {}\nLength: about {} words (between {} and {}).\n",
        DRAFT_INSTRUCTION,
        request.topic,
        keyword_list(request),
        request.tone,
        request.target_word_count,
        min,
        max
    );

    if let Some(outline) = outline.filter(|o| !o.trim().is_empty()) {
        prompt.push_str("\nOutline:\n");
        prompt.push_str(outline.trim());
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nStart with a single '# ' title line. Use at least {} '## ' section headings. \
         Use the keywords naturally in the text.\n",
        config.min_h2_headings
    ));
    if request.flags.include_faq {
        prompt.push_str("Include a '## FAQ' section with three short questions and answers.\n");
    }
    if request.flags.include_conclusion {
        prompt.push_str("End with a '## Conclusion' section.\n");
    }
    prompt.push_str("Return only the article.\n");
    prompt
}

pub fn seo(request: &GenerationRequest, body: &str) -> String {
    format!(
        "{}\n\nTopic: {}\nPrimary keyword: {}\n\n\
         Answer with exactly two lines:\n\
         TITLE: <title, 30 to 65 characters, containing the primary keyword>\n\
         META: <meta description, 70 to 160 characters>\n\n\
         Article:\n{}\n",
        SEO_INSTRUCTION,
        request.topic,
        request.primary_keyword().unwrap_or(&request.topic),
        body
    )
}

fn keyword_list(request: &GenerationRequest) -> String {
    let keywords = request.ranked_keywords();
    if keywords.is_empty() {
        "(none)".to_string()
    } else {
        keywords.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_start_with_instruction() {
        let request = GenerationRequest::new("Async Rust", vec!["tokio".into()], 300);
        let config = PipelineConfig::default();

        assert!(research(&request, &[]).starts_with(RESEARCH_INSTRUCTION));
        assert!(draft(&request, None, &config).starts_with(DRAFT_INSTRUCTION));
        assert!(seo(&request, "body").starts_with(SEO_INSTRUCTION));
    }

    #[test]
    fn test_draft_prompt_mentions_flags_and_band() {
        let mut request = GenerationRequest::new("Async Rust", vec!["tokio".into()], 300);
        request.flags.include_faq = true;
        let prompt = draft(&request, Some("1. Intro"), &PipelineConfig::default());

        assert!(prompt.contains("between 225 and 375"));
        assert!(prompt.contains("## FAQ"));
        assert!(prompt.contains("1. Intro"));
    }

    #[test]
    fn test_research_prompt_includes_context() {
        let request = GenerationRequest::new("Async Rust", vec![], 300);
        let prompt = research(&request, &["Tokio 1.0 shipped in 2020".to_string()]);
        assert!(prompt.contains("- Tokio 1.0 shipped in 2020"));
        assert!(prompt.contains("Keywords: (none)"));
    }
}
