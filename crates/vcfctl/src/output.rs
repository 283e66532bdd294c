//! Output formatting

use crate::error::Result;
use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use vcfctl_core::{SubTask, Task, TaskStatus};

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(data).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Render an API timestamp in local time, or as-is when it doesn't parse
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

/// Status with a leading icon
pub fn format_status(raw: &str) -> String {
    match TaskStatus::parse(raw) {
        TaskStatus::InProgress => format!("\u{21bb} {raw}"),
        TaskStatus::Pending => format!("\u{2026} {raw}"),
        TaskStatus::NotApplicable => format!("- {raw}"),
        TaskStatus::Failed => format!("\u{2717} {raw}"),
        TaskStatus::Cancelled => format!("\u{2298} {raw}"),
        TaskStatus::Other(_) => format!("\u{2713} {raw}"),
    }
}

pub fn print_task(task: &Task) {
    println!("ID:        {}", task.id);
    println!("Name:      {}", task.name);
    println!("Type:      {}", task.task_type);
    println!("Status:    {}", format_status(&task.status));
    if let Some(created) = &task.creation_timestamp {
        println!("Created:   {}", format_timestamp(created));
    }
    if let Some(completed) = &task.completion_timestamp {
        println!("Completed: {}", format_timestamp(completed));
    }
    if let Some(description) = task.description() {
        println!("Summary:   {description}");
    }

    if !task.sub_tasks.is_empty() {
        println!("Subtasks:");
        print_sub_tasks(&task.sub_tasks, 1);
    }

    if !task.resources.is_empty() {
        println!("Resources:");
        for resource in &task.resources {
            match &resource.fqdn {
                Some(fqdn) => println!(
                    "  {:<12} {} ({fqdn})",
                    resource.resource_type, resource.resource_id
                ),
                None => println!("  {:<12} {}", resource.resource_type, resource.resource_id),
            }
        }
    }

    if let Some(failure) = task.first_failure() {
        println!("Error:     {failure}");
    }
}

fn print_sub_tasks(sub_tasks: &[SubTask], depth: usize) {
    for sub in sub_tasks {
        let label = sub.description().unwrap_or(&sub.name);
        println!(
            "{:indent$}{}  {label}",
            "",
            format_status(&sub.status),
            indent = depth * 2
        );
        print_sub_tasks(&sub.sub_tasks, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_icons() {
        assert!(format_status("IN_PROGRESS").starts_with('\u{21bb}'));
        assert!(format_status("Failed").starts_with('\u{2717}'));
        assert!(format_status("SUCCESSFUL").starts_with('\u{2713}'));
        assert!(format_status("Successful").ends_with("Successful"));
    }

    #[test]
    fn test_format_timestamp_falls_back_to_raw() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_ne!(
            format_timestamp("2024-01-01T00:00:00Z"),
            "2024-01-01T00:00:00Z"
        );
    }
}
