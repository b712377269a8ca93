// Pretty error reporting with source highlighting using ariadne

use super::error::BindError;
use ariadne::{Color, Label, Report, ReportKind, Source};

/// Report a binding error with source highlighting
pub fn report_bind_error(filename: &str, source: &str, error: &BindError) {
    let report = build_report(error);
    report
        .eprint(Source::from(source))
        .expect("Failed to print error report");

    // Print filename for context
    let span = error.span();
    eprintln!("  --> {}:{}", filename, get_line_col(source, span.start));
}

fn get_line_col(source: &str, offset: usize) -> String {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.chars().enumerate() {
        if i == offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    format!("{}:{}", line, col)
}

/// Build an ariadne Report from a BindError
fn build_report(error: &BindError) -> Report<'static, std::ops::Range<usize>> {
    let span = error.span();
    let range = span.start..span.end;

    match error {
        BindError::DuplicateFunction { name, .. } => Report::build(ReportKind::Error, range.clone())
            .with_code("E001")
            .with_message(format!("function `@{}` is defined more than once", name))
            .with_label(
                Label::new(range)
                    .with_message("second definition here")
                    .with_color(Color::Red),
            )
            .with_help("every function name must be unique within the program")
            .finish(),

        BindError::DuplicateLabel { function, name, .. } => {
            Report::build(ReportKind::Error, range.clone())
                .with_code("E002")
                .with_message(format!(
                    "label `:{}` is defined more than once in `@{}`",
                    name, function
                ))
                .with_label(
                    Label::new(range)
                        .with_message("second definition here")
                        .with_color(Color::Red),
                )
                .with_help("label names must be unique within their function")
                .finish()
        }

        BindError::UndefinedLabel { function, name, .. } => {
            Report::build(ReportKind::Error, range.clone())
                .with_code("E003")
                .with_message(format!(
                    "label `:{}` is never defined in `@{}`",
                    name, function
                ))
                .with_label(
                    Label::new(range)
                        .with_message("referenced here")
                        .with_color(Color::Red),
                )
                .with_help("add the label definition or fix the jump target")
                .finish()
        }

        BindError::UndefinedFunction { name, .. } => {
            Report::build(ReportKind::Error, range.clone())
                .with_code("E004")
                .with_message(format!("function `@{}` is never defined", name))
                .with_label(
                    Label::new(range)
                        .with_message("referenced here")
                        .with_color(Color::Red),
                )
                .with_help("define the function or fix the reference")
                .finish()
        }

        BindError::UnknownExternal { name, .. } => {
            Report::build(ReportKind::Error, range.clone())
                .with_code("E005")
                .with_message(format!("`{}` is not a known external function", name))
                .with_label(
                    Label::new(range)
                        .with_message("called here")
                        .with_color(Color::Red),
                )
                .with_help(
                    "external callees are print, input, allocate, tuple-error, tensor-error",
                )
                .finish()
        }
    }
}
