/// Corpus-wide reference integrity checking.
pub mod checker;

/// Markdown rendering of link reports.
pub mod formatter;

pub use checker::LinkChecker;
pub use formatter::format_report_as_markdown;
