/// Strip markdown code fences (```json, ```html or bare ```) from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```html")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
