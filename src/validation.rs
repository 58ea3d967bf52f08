//! GLSL validation using the naga library.

use anyhow::{Context, Result, anyhow};

/// Parse and validate a GLSL fragment shader with naga's front end.
///
/// Returns the parsed naga Module on success, or an error carrying the
/// numbered source dump on failure so the offending generated line is easy
/// to find.
pub fn validate_fragment(source: &str) -> Result<naga::Module> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: naga::ShaderStage::Fragment,
        defines: Default::default(),
    };

    let module = frontend
        .parse(&options, source)
        .map_err(|e| anyhow!("GLSL parse failed: {e:?}\n{}", numbered_source(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed: {e:?}\n{}", numbered_source(source)))?;

    Ok(module)
}

/// Validate and say which graph target generated the program on failure.
pub fn validate_fragment_with_context(source: &str, context: &str) -> Result<naga::Module> {
    validate_fragment(source).with_context(|| format!("{context} generated invalid GLSL"))
}

/// Source with line numbers, for error messages.
fn numbered_source(source: &str) -> String {
    let mut output = String::from("---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_minimal_fragment_shader() {
        let source = r#"#version 450
layout(location = 0) in vec2 v_coords;
layout(location = 0) out vec4 f_color;
void main() {
    f_color = vec4(v_coords, 0.0, 1.0);
}
"#;
        assert!(validate_fragment(source).is_ok());
    }

    #[test]
    fn rejects_a_syntax_error_with_the_source_dump() {
        let source = "#version 450\nvoid main() { float x = ; }\n";
        let err = validate_fragment(source).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("   2 | "));
    }

    #[test]
    fn context_names_the_generator() {
        let result = validate_fragment_with_context("not glsl", "socket 3");
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("socket 3"));
    }
}
