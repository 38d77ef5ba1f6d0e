use crate::driver::DriverError;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};

fn label_message(err: &DriverError) -> &'static str {
    match err {
        DriverError::Parse(_) => "while reading this",
        DriverError::Type { .. } => "in this form",
        DriverError::Eval { .. } => "while evaluating this form",
    }
}

/// Render `err` against the source text it came from.
pub fn render(err: &DriverError, filename: &str, source: &str, color: bool) -> String {
    let span = err.span();
    // Clamp to the text so spans at end of input still point somewhere.
    let start = span.start.min(source.len());
    let end = span.end.clamp(start, source.len());

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, filename, start)
        .with_config(Config::default().with_color(color))
        .with_message(err.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_message(label_message(err))
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut out);

    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("{}: {}\n", filename, err),
    }
}
