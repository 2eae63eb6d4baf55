//! Error rendering using ariadne
//!
//! Errors that carry their source text (interface JSON, typed input) are
//! shown as a report pointing into it; the rest as a single line.

use crate::{Error, InterfaceError};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;
use std::ops::Range;

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use knot::{load_interface, render_error};
///
/// if let Err(e) = load_interface("{ \"types\": ") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for logs, UIs, etc.)
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Interface {
            error: InterfaceError::Json(e),
            json,
        } => {
            let at = json_offset(json, e.line(), e.column());
            render_snippet(
                "<interface>",
                json,
                at..at + 1,
                &error.to_string(),
                &e.to_string(),
                writer,
                use_color,
            )
        }
        Error::Interface { error: e, .. } => {
            writeln!(writer, "Interface error: {}", e)
        }
        Error::Input { error: e, input, .. } => render_snippet(
            "<input>",
            input,
            char_span(input, e.span.clone()),
            &error.to_string(),
            &e.to_string(),
            writer,
            use_color,
        ),
        Error::Encode(e) => writeln!(writer, "Encode error: {}", e),
        Error::Decode(e) => writeln!(writer, "Decode error: {}", e),
        Error::Form(e) => writeln!(writer, "Form error: {}", e),
        Error::Type(e) => writeln!(writer, "Type error: {}", e),
    }
}

/// Character offset of a 1-based line and column, clamped to the text.
fn json_offset(json: &str, line: usize, column: usize) -> usize {
    let before: usize = json
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(|l| l.chars().count())
        .sum();
    (before + column.saturating_sub(1)).min(json.chars().count().saturating_sub(1))
}

/// Character range of a byte range, widened to at least one character.
fn char_span(text: &str, bytes: Range<usize>) -> Range<usize> {
    let chars = |at: usize| text.get(..at).map_or(0, |s| s.chars().count());
    let start = chars(bytes.start.min(text.len()));
    let end = chars(bytes.end.min(text.len())).max(start + 1);
    start..end
}

fn render_snippet(
    id: &str,
    source: &str,
    span: Range<usize>,
    message: &str,
    label: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let report = Report::build(ReportKind::Error, (id, span.clone()))
        .with_message(message)
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new((id, span))
                .with_message(label)
                .with_color(colors.next()),
        );

    report.finish().write((id, Source::from(source)), &mut *writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeManager, load_interface, parse_input};

    #[test]
    fn test_json_offset() {
        let json = "{\n  \"a\": ?\n}";
        assert_eq!(json_offset(json, 1, 1), 0);
        assert_eq!(json_offset(json, 2, 8), 9);
        assert_eq!(json_offset(json, 9, 9), json.chars().count() - 1);
    }

    #[test]
    fn test_render_json_error() {
        let source = "{ \"types\": { \"A\": [1, 2] } }";
        let err = load_interface(source).unwrap_err();
        let output = render_error_to_string_no_color(&err);

        assert!(output.contains("Error"));
        assert!(output.contains("invalid interface description"));
        assert!(output.contains("\"types\""));
    }

    #[test]
    fn test_char_span() {
        assert_eq!(char_span("vec {1; 2", 9..9), 9..10);
        assert_eq!(char_span("\"é\" x", 5..6), 4..5);
        assert_eq!(char_span("", 0..0), 0..1);
    }

    #[test]
    fn test_render_input_error() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let err = parse_input(&mgr, nat, "twelve").unwrap_err();
        let output = render_error_to_string_no_color(&err);

        assert!(output.contains("invalid input for nat"));
        assert!(output.contains("twelve"));
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_plain_error() {
        let err = load_interface(r#"{ "service": { "m": { "args": ["Missing"] } } }"#).unwrap_err();
        assert_eq!(
            render_error_to_string_no_color(&err),
            "Interface error: unknown type `Missing`\n"
        );
    }
}
