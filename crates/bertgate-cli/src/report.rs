//! Plain-text rendering of bench results.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::bench::{BenchStats, Outcome, Sample};

const WIDE_RULE: usize = 60;

pub fn header(base_url: &str, now: DateTime<Local>) -> String {
    let rule = "=".repeat(WIDE_RULE);
    format!(
        "bertgate bench\n{rule}\nstarted: {}\ntarget:  {base_url}\n{rule}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn format_sample(n: usize, sample: &Sample, text: &str) -> String {
    let ms = sample.latency.as_secs_f64() * 1000.0;
    match &sample.outcome {
        Outcome::Ok { confidence } => format!(
            "request {n:2}: {ms:8.2}ms | confidence {confidence:.3} | {} chars",
            text.chars().count()
        ),
        Outcome::Failed(err) => format!("request {n:2}: failed - {err}"),
    }
}

pub fn format_stats(name: &str, stats: &BenchStats) -> String {
    let mut out = String::new();
    if stats.successful == 0 {
        let _ = writeln!(out, "{name}: all {} requests failed", stats.total);
        return out;
    }
    let _ = writeln!(out, "\n{name} results:");
    let _ = writeln!(out, "  total:      {}", stats.total);
    let _ = writeln!(out, "  successful: {}", stats.successful);
    let _ = writeln!(out, "  failed:     {}", stats.failed);
    let _ = writeln!(out, "  error rate: {:.2}%", stats.error_rate * 100.0);
    let _ = writeln!(out, "  mean:       {:.2}ms", stats.mean_ms);
    let _ = writeln!(out, "  median:     {:.2}ms", stats.median_ms);
    let _ = writeln!(out, "  p95:        {:.2}ms", stats.p95_ms);
    let _ = writeln!(out, "  min:        {:.2}ms", stats.min_ms);
    let _ = writeln!(out, "  max:        {:.2}ms", stats.max_ms);
    if stats.throughput > 0.0 {
        let _ = writeln!(out, "  throughput: {:.2} req/s", stats.throughput);
    }
    out
}

/// Level with the highest throughput; the lowest level wins ties.
pub fn best_concurrency(levels: &[(usize, BenchStats)]) -> Option<(usize, &BenchStats)> {
    levels.iter().fold(None, |best, (level, stats)| match best {
        Some((_, b)) if b.throughput >= stats.throughput => best,
        _ => Some((*level, stats)),
    })
}

pub fn format_stress_summary(levels: &[(usize, BenchStats)]) -> String {
    let rule = "=".repeat(WIDE_RULE);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}\nsummary\n{rule}");

    let Some((best, best_stats)) = best_concurrency(levels) else {
        let _ = writeln!(out, "stress run did not complete");
        return out;
    };

    let _ = writeln!(
        out,
        "{:<12} {:>12} {:>12} {:>14} {:>10}",
        "concurrency", "mean(ms)", "p95(ms)", "req/s", "errors"
    );
    let _ = writeln!(out, "{}", "-".repeat(64));
    for (level, s) in levels {
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>12.2} {:>14.2} {:>9.2}%",
            level,
            s.mean_ms,
            s.p95_ms,
            s.throughput,
            s.error_rate * 100.0
        );
    }
    let _ = writeln!(
        out,
        "\nbest concurrency: {best} ({:.2} req/s)",
        best_stats.throughput
    );
    out
}
