//! User-facing console output: progress, summary and failures

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::io::Write;

use crate::aggregate::{group_by_category, summarize, RunSummary};
use crate::context::RunContext;
use crate::executor::{Outcome, TestResult};

const RULE_WIDTH: usize = 50;

/// Render one result as it completes
pub fn print_progress(result: &TestResult, context: &RunContext) {
    if context.verbose {
        println!("{}", verbose_line(result, context.decorated));
        if let Some(error) = result.error.as_deref() {
            println!("  {}", error);
        }
    } else {
        print!("{}", progress_mark(result.outcome, context.decorated));
        let _ = std::io::stdout().flush();
    }
}

/// Terminate the progress line
pub fn finish_progress(context: &RunContext) {
    if !context.verbose {
        println!();
    }
}

pub fn print_banner(context: &RunContext) {
    let title = "LWS Protocol Conformance Test Suite";
    if context.decorated {
        println!("{}\n", title.bold());
    } else {
        println!("{}\n", title);
    }
}

/// Final summary block, per-category table and the failed-test list
pub fn print_summary(results: &[TestResult], context: &RunContext) {
    let summary = summarize(results);
    println!();
    println!("{}", summary_block(&summary, context.decorated));

    if !results.is_empty() {
        println!("{}", category_table(results));
        println!();
    }

    let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
    if !failed.is_empty() {
        println!("Failed tests:");
        for result in failed {
            let line = format!(
                "  - {}: {}",
                result.test.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
            if context.decorated {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
        println!();
    }
}

fn progress_mark(outcome: Outcome, decorated: bool) -> String {
    let mark = match outcome {
        Outcome::Passed => ".",
        Outcome::Failed => "F",
        Outcome::Inapplicable => "-",
    };
    if !decorated {
        return mark.to_string();
    }
    match outcome {
        Outcome::Passed => mark.green().to_string(),
        Outcome::Failed => mark.red().bold().to_string(),
        Outcome::Inapplicable => mark.yellow().to_string(),
    }
}

fn verbose_line(result: &TestResult, decorated: bool) -> String {
    let symbol = match result.outcome {
        Outcome::Passed => "✓",
        Outcome::Failed => "✗",
        Outcome::Inapplicable => "○",
    };
    let line = format!("{} {} ({}ms)", symbol, result.test.name, result.duration_ms);
    if !decorated {
        return line;
    }
    match result.outcome {
        Outcome::Passed => line.green().to_string(),
        Outcome::Failed => line.red().to_string(),
        Outcome::Inapplicable => line.yellow().to_string(),
    }
}

fn summary_block(summary: &RunSummary, decorated: bool) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let title = if decorated {
        "TEST SUMMARY".bold().to_string()
    } else {
        "TEST SUMMARY".to_string()
    };
    let rate = format!("{:.1}%", summary.pass_percent());
    let rate = match (decorated, summary.all_passed()) {
        (false, _) => rate,
        (true, true) => rate.green().to_string(),
        (true, false) => rate.red().to_string(),
    };

    format!(
        "{rule}\n{title}\n{rule}\n\
         Total:      {}\n\
         Passed:     {}\n\
         Failed:     {}\n\
         Skipped:    {}\n\
         Pass Rate:  {}\n\
         {rule}",
        summary.total, summary.passed, summary.failed, summary.skipped, rate,
    )
}

fn category_table(results: &[TestResult]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Category", "Total", "Passed", "Failed", "Skipped", "Pass Rate"]);

    for (category, bucket) in group_by_category(results).iter() {
        let s = RunSummary::from_outcomes(bucket.iter().map(|r| r.outcome));
        table.add_row(vec![
            Cell::new(category),
            Cell::new(s.total),
            Cell::new(s.passed),
            Cell::new(s.failed),
            Cell::new(s.skipped),
            Cell::new(format!("{:.1}%", s.pass_percent())),
        ]);
    }
    table
}
