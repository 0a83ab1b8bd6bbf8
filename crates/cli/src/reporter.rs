use colored::Colorize;
use orchestrator::{Reporter, Summary, Verdict};

/// Prints live step results to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

/// Split a step title into its command and the rest.
fn split_title(title: &str) -> (&str, &str) {
    title.split_once(": ").unwrap_or((title, ""))
}

fn format_title(title: &str) -> String {
    match split_title(title) {
        (cmd, "") => cmd.cyan().to_string(),
        (cmd, rest) => format!("{} {}", format!("{cmd}:").cyan(), rest),
    }
}

fn format_step(indent: &str, title: &str, verdict: &Verdict) -> String {
    match verdict {
        Verdict::Passed => format!("{indent}{} {}", "✔".green(), format_title(title)),
        Verdict::Unchecked => format!("{indent}{} {}", "•".dimmed(), format_title(title)),
        Verdict::Failed(reason) => format!(
            "{indent}{} {}\n{indent}    {}",
            "✖".red(),
            format_title(title),
            reason.red()
        ),
    }
}

fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    if summary.checked {
        let failed = if summary.failed > 0 {
            summary.failed.to_string().red().bold().to_string()
        } else {
            summary.failed.to_string().green().to_string()
        };
        out.push_str(&format!(
            "{} steps, {} passed, {} failed",
            summary.total.to_string().bold(),
            summary.passed.to_string().green(),
            failed
        ));
    } else {
        out.push_str(&format!(
            "{} steps recorded, {}",
            summary.total.to_string().bold(),
            "not checked".yellow()
        ));
    }
    if let Some(path) = &summary.output {
        out.push_str(&format!("\nScript saved to {}", path.display().to_string().bold()));
    }
    out
}

impl Reporter for ConsoleReporter {
    fn step_finished(&self, title: &str, verdict: &Verdict) {
        println!("{}", format_step("", title, verdict));
    }

    fn module_started(&self, name: &str) {
        println!("  {} {}", "module".magenta(), name);
    }

    fn module_step(&self, _name: &str, title: &str, verdict: &Verdict) {
        println!("{}", format_step("    ", title, verdict));
    }

    fn module_finished(&self, name: &str, success: bool) {
        if !success {
            println!("  {} {}", "module failed:".red(), name);
        }
    }

    fn summary(&self, summary: &Summary) {
        println!();
        println!("{}", format_summary(summary));
    }
}
