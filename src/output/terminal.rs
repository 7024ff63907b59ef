//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::timeslide::PipelineSummary;
use crate::vt::VtEstimate;

/// Effective sample size below which an estimate is flagged as unreliable.
const LOW_N_EFF: f64 = 10.0;

/// Format a VT estimate for human-readable terminal output.
pub fn format_vt(estimate: &VtEstimate) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("volume-time estimate\n");
    output.push_str(&sep);
    output.push_str("\n\n");

    output.push_str(&format!(
        "  VT:     {:.4e} Mpc\u{b3} yr\n",
        estimate.volume_time
    ));
    output.push_str(&format!("  Std:    {:.4e}\n", estimate.std));
    let rel = if estimate.volume_time != 0.0 {
        estimate.std / estimate.volume_time * 100.0
    } else {
        f64::NAN
    };
    output.push_str(&format!("  Rel:    {:.1}%\n", rel));
    output.push_str(&format!("  N_eff:  {}\n", format_n_eff(estimate.n_eff)));
    output.push('\n');

    if estimate.variance_clamped {
        output.push_str(&format!(
            "  {}\n",
            "\u{26A0} Variance was clamped to zero (rounding)".yellow().bold()
        ));
    }
    if estimate.volume_time == 0.0 {
        output.push_str(&format!("  {}\n", "\u{26A0} No injections recovered".red().bold()));
    }

    output.push_str(&sep);
    output.push('\n');
    output
}

fn format_n_eff(n_eff: f64) -> String {
    let text = if n_eff.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.1}", n_eff)
    };
    if n_eff < LOW_N_EFF {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

/// Format a pipeline summary for terminal output.
pub fn format_summary(summary: &PipelineSummary) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("timeslide generation\n");
    output.push_str(&sep);
    output.push_str("\n\n");
    output.push_str(&format!(
        "  Segments: {} processed, {} skipped, {}\n",
        summary.segments_processed,
        summary.segments_skipped,
        count_failed(summary.segments_failed)
    ));
    output.push_str(&format!(
        "  Shifts:   {} written, {} existing, {}\n",
        summary.shifts_written,
        summary.shifts_existing,
        count_failed(summary.shifts_failed)
    ));
    output.push_str(&format!(
        "  Injections: {} ({} rejected draws)\n",
        summary.injections, summary.n_rejected
    ));
    output.push_str(&format!("  Livetime:   {:.1} s\n", summary.livetime));
    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    output
}

fn count_failed(n: usize) -> String {
    let text = format!("{} failed", n);
    if n == 0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}
