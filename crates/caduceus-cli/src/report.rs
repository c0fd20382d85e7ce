//! `caduceus audit` support: summary and timeline over the local journal.

use std::collections::BTreeMap;

use caduceus_audit::log::AuditEntry;
use caduceus_audit::report::AuditReport;
use color_eyre::Result;

use crate::cli::AuditCommand;
use crate::config::Config;
use crate::context;

pub fn run(cmd: AuditCommand, config: &Config) -> Result<()> {
    let log = context::audit_log(config)?;
    let entries = log.read_all().map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    let rendered = match cmd {
        AuditCommand::Report => render_report(&AuditReport::from_entries(&entries)),
        AuditCommand::Timeline => render_timeline(&entries),
    };
    print!("{rendered}");
    Ok(())
}

fn render_report(report: &AuditReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Audit entries: {}\n", report.total));
    if let (Some(first), Some(last)) = (report.first_ts, report.last_ts) {
        out.push_str(&format!("Window: {} .. {}\n", first.to_rfc3339(), last.to_rfc3339()));
    }
    render_counts(&mut out, "By actor", &report.by_actor);
    render_counts(&mut out, "By role", &report.by_role);
    render_counts(&mut out, "By action", &report.by_action);
    out
}

fn render_counts(out: &mut String, heading: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    out.push_str(&format!("{heading}:\n"));
    for (name, count) in counts {
        out.push_str(&format!("  {name}: {count}\n"));
    }
}

fn render_timeline(entries: &[AuditEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{} {} ({}) {} {}\n",
            entry.ts.to_rfc3339(),
            entry.actor,
            entry.role,
            entry.action,
            entry.resource
        ));
    }
    out
}
