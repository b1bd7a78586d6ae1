use crate::runtime::error::RuntimeError;
use miette::{Diagnostic, LabeledSpan, NamedSource, Report, SourceCode, SourceSpan};
use std::fmt;
use thiserror::Error;

/// Program-boundary rendering of an uncaught [`RuntimeError`]. The code is
/// `kiwi::runtime::<Kind>`; the source label appears only when the program
/// text is supplied.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuntimeDiagnostic {
    message: String,
    code: String,
    help: Option<String>,
    src: Option<NamedSource>,
    span: Option<SourceSpan>,
    label: String,
}

impl RuntimeDiagnostic {
    pub fn from_error(error: &RuntimeError, source: Option<&str>) -> Self {
        let location = error.span();
        let (src, span) = match source {
            Some(text) => {
                let span = location.offset_in(text).map(|start| {
                    let len = text
                        .get(start..)
                        .and_then(|rest| rest.chars().next())
                        .map(char::len_utf8)
                        .unwrap_or(0);
                    SourceSpan::from((start, len))
                });
                let named = NamedSource::new(location.file.to_string(), text.to_string());
                (Some(named), span)
            }
            None => (None, None),
        };
        Self {
            message: format!("{} at {location}", error),
            code: format!("kiwi::runtime::{}", error.kind()),
            help: help_for(error),
            src,
            span,
            label: error.kind().to_string(),
        }
    }
}

impl Diagnostic for RuntimeDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.src.as_ref().map(|src| src as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label.clone()),
            span,
        ))))
    }
}

fn help_for(error: &RuntimeError) -> Option<String> {
    let help = match error {
        RuntimeError::DivideByZero { .. } => "check the divisor before dividing",
        RuntimeError::Range { .. } => "indices must fall within the list length",
        RuntimeError::StackOverflow { .. } => {
            "raise KIWI_MAX_CALL_DEPTH or add a base case to the recursion"
        }
        RuntimeError::UnknownBuiltin { .. } => "builtin names are case-sensitive",
        RuntimeError::Raised { .. } => "wrap the call in a try block to handle it",
        _ => return None,
    };
    Some(help.to_string())
}

/// Reports an uncaught error to stderr. Pass the program text to get a
/// labelled source excerpt.
pub fn report_runtime_error(error: &RuntimeError, source: Option<&str>) {
    tracing::error!(kind = error.kind(), at = %error.span(), "uncaught runtime error");
    let diagnostic = RuntimeDiagnostic::from_error(error, source);
    eprintln!("{:?}", Report::new(diagnostic));
}
