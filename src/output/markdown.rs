/// Two fixed sections: the documentation verbatim, then one bullet per
/// recommendation in the given order. Inputs are trusted plain text and are
/// not escaped.
pub fn render_code_generation_markdown(documentation: &str, recommendations: &[String]) -> String {
    let mut markdown = String::from("## Documentation\n\n");
    markdown.push_str(documentation);
    markdown.push_str("\n\n");

    markdown.push_str("## Optimization Recommendations\n\n");
    for recommendation in recommendations {
        markdown.push_str("- ");
        markdown.push_str(recommendation);
        markdown.push('\n');
    }

    markdown
}

/// Fenced code block tagged with a lowercase language hint ("Embedded C" -> "c").
pub fn render_source_block(language: &str, source_code: &str) -> String {
    let hint = fence_language(language);
    let mut block = format!("```{}\n{}", hint, source_code);
    if !source_code.ends_with('\n') {
        block.push('\n');
    }
    block.push_str("```\n");
    block
}

fn fence_language(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    match lower.as_str() {
        "embedded c" | "c" => "c".to_string(),
        "c++" | "embedded c++" | "cpp" => "cpp".to_string(),
        "micropython" | "circuitpython" | "python" => "python".to_string(),
        "embedded rust" | "rust" => "rust".to_string(),
        "arduino" => "cpp".to_string(),
        _ => lower
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '#')
            .collect(),
    }
}
