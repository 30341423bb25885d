use super::*;

fn recommendations(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_exact_code_generation_document() {
    let markdown = render_code_generation_markdown("Doc body", &recommendations(&["r1", "r2"]));
    assert_eq!(
        markdown,
        "## Documentation\n\nDoc body\n\n## Optimization Recommendations\n\n- r1\n- r2\n"
    );
}

#[test]
fn test_empty_inputs_still_render_both_sections() {
    let markdown = render_code_generation_markdown("", &[]);
    assert_eq!(markdown, "## Documentation\n\n\n\n## Optimization Recommendations\n\n");
}

#[test]
fn test_markdown_special_characters_are_not_escaped() {
    let markdown = render_code_generation_markdown(
        "Uses `HAL_Delay` and *volatile* flags",
        &recommendations(&["Prefer `-Os` over `-O2`", "| keep | tables |"]),
    );
    assert!(markdown.contains("Uses `HAL_Delay` and *volatile* flags"));
    assert!(markdown.contains("- Prefer `-Os` over `-O2`\n"));
    assert!(markdown.contains("- | keep | tables |\n"));
}

#[test]
fn test_recommendation_order_is_preserved() {
    let items = recommendations(&["third", "first", "second"]);
    let markdown = render_code_generation_markdown("doc", &items);

    let third = markdown.find("- third").unwrap();
    let first = markdown.find("- first").unwrap();
    let second = markdown.find("- second").unwrap();
    assert!(third < first && first < second);
}

#[test]
fn test_source_block() {
    assert_eq!(
        render_source_block("Embedded C", "int main(void) { return 0; }"),
        "```c\nint main(void) { return 0; }\n```\n"
    );
    assert_eq!(render_source_block("Rust", "fn main() {}\n"), "```rust\nfn main() {}\n```\n");
    assert_eq!(render_source_block("Ada/SPARK", "null;"), "```adaspark\nnull;\n```\n");
}

#[tokio::test]
async fn test_write_markdown_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports").join("code_model.md");

    write_markdown(&path, "## Documentation\n").await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, "## Documentation\n");
}
