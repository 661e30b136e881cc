use console::{Emoji, style};

use crate::core::execution::{ExecutionRecord, ExecutionStatus};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_launch(crew_id: &str, execution_id: &str) {
    println!(
        "{} crew {} started execution {}",
        ROCKET,
        style(crew_id).bold(),
        style(execution_id).cyan()
    );
}

/// One line per registry update, plus the result or error once terminal.
pub fn print_record(crew_id: &str, record: &ExecutionRecord) {
    let execution = record.execution_id().unwrap_or("-");
    let status = record.status().as_str();
    let status = match record.status() {
        ExecutionStatus::NotStarted => style(status).dim(),
        ExecutionStatus::Running => style(status).yellow(),
        ExecutionStatus::Completed => style(status).green().bold(),
        ExecutionStatus::Failed => style(status).red().bold(),
    };
    let icon = if record.is_running() {
        &HOURGLASS
    } else {
        &GEAR
    };
    println!(
        "{}{} [{}] {}",
        icon,
        style(crew_id).bold(),
        execution,
        status
    );

    if let Some(result) = record.result() {
        let pretty = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
        println!("{}", pretty);
    }
    if let Some(detail) = record.error_detail() {
        print_error(detail);
    }
    if let Some(detail) = record.launch_error() {
        print_error(detail);
    }
}

/// Titled block of command/description rows, used for help output.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, command: &str, description: &str) -> Self {
        self.rows.push((command.to_string(), description.to_string()));
        self
    }

    pub fn print(&self) {
        println!("\n {}", style(&self.title).bold().underlined());
        let width = self.rows.iter().map(|(c, _)| c.len()).max().unwrap_or(0);
        for (command, description) in &self.rows {
            println!(
                "   {:<width$}  {}",
                style(command).green(),
                description,
                width = width
            );
        }
    }
}

pub fn print_banner() {
    println!(
        "\n{} {}",
        style("crewdeck").bold().cyan(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
    println!("{}", style("Configure crews. Kick them off. Watch them land.").dim());
}
