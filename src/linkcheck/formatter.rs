use crate::registry::Registry;
use crate::types::LinkReport;

/// Formats a link report as a Markdown summary, one section per broken
/// target listing the entries that reference it.
///
/// Identifiers are shown in their compact registry form.
pub fn format_report_as_markdown(report: &LinkReport, registry: &Registry) -> String {
    let mut out = String::new();

    out.push_str("## Link Check\n");
    out.push_str(&format!(
        "**Entries:** {} | **Broken links:** {} | **Failed documents:** {}\n\n",
        report.entries.len(),
        report.broken_count(),
        report.failures.len()
    ));

    let reverse = report.broken_by_target();
    if reverse.is_empty() {
        out.push_str("_No broken links._\n");
    } else {
        for (target, referrers) in &reverse {
            out.push_str(&format!("#### Broken: {}\n", registry.compact(target)));
            for referrer in referrers {
                out.push_str(&format!(" - Referenced by: {}\n", registry.compact(referrer)));
            }
            out.push('\n');
        }
    }

    if !report.failures.is_empty() {
        out.push_str("\n### Failed Documents\n");
        for failure in &report.failures {
            out.push_str(&format!("- {}: {}\n", failure.location, failure.message));
        }
    }

    out
}
