// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_article(sections: usize) -> String {
    let mut content = String::from("# Article\n\n");
    for section in 0..sections {
        content.push_str(&format!("## Section {section}\n\n"));
        content.push_str(
            "The city is **obviously** the best place to live. \
             Its museums are world famous and draw *millions* of visitors.\n\n",
        );
        content.push_str("- First point\n- Second point\n  - Nested detail\n\n");
    }
    content
}

#[allow(dead_code)]
pub fn last_sentence() -> &'static str {
    "Its museums are world famous and draw millions of visitors."
}
