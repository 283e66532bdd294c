//! Task command implementations

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vcfctl_core::{ProgressCallback, ProgressEvent, TaskTracker, get_resource_id};

use crate::cli::{OutputFormat, TaskCommands};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{format_status, format_timestamp, print_json, print_task};

pub async fn handle_task_command(
    task_cmd: &TaskCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match task_cmd {
        TaskCommands::Get { task_id } => {
            handle_get(conn_mgr, profile_name, task_id, output_format).await
        }
        TaskCommands::Wait {
            task_id,
            interval,
            timeout,
        } => {
            handle_wait(
                conn_mgr,
                profile_name,
                task_id,
                *interval,
                *timeout,
                output_format,
            )
            .await
        }
        TaskCommands::Resource {
            task_id,
            resource_type,
        } => handle_resource(conn_mgr, profile_name, task_id, resource_type, output_format).await,
    }
}

async fn handle_get(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    task_id: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (client, _) = conn_mgr.create_client(profile_name).await?;
    let task = client.get_task(task_id).await?.into_result()?;

    if output_format.is_json() {
        print_json(&task)
    } else {
        print_task(&task);
        Ok(())
    }
}

async fn handle_wait(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    task_id: &str,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (client, resolved) = conn_mgr.create_client(profile_name).await?;
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or(resolved.poll_interval);
    debug!("Polling task {} every {:?}", task_id, interval);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no longer waiting");
            on_interrupt.cancel();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Waiting for task {task_id}"));

    let mut tracker = TaskTracker::new(&client, task_id)
        .with_interval(interval)
        .with_progress(spinner_callback(pb.clone()));
    if let Some(secs) = timeout_secs {
        tracker = tracker.with_timeout(Duration::from_secs(secs));
    }

    let result = tracker.wait(&cancel).await;
    if !pb.is_finished() {
        pb.abandon();
    }
    let task = result?;

    if output_format.is_json() {
        print_json(&task)
    } else {
        print_task(&task);
        Ok(())
    }
}

/// Progress callback that drives the spinner
fn spinner_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |event| match event {
        ProgressEvent::Started { task_id } => {
            pb.set_message(format!("Task {task_id} started"));
        }
        ProgressEvent::Polling {
            task_id, status, ..
        } => {
            pb.set_message(format!("Task {task_id}: {}", format_status(&status)));
        }
        ProgressEvent::Message { message, .. } => {
            pb.println(format!(
                "  {} {message}",
                chrono::Local::now().format("%H:%M:%S")
            ));
        }
        ProgressEvent::Completed {
            task_id,
            completion_timestamp,
        } => {
            let at = completion_timestamp
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "unknown time".to_string());
            pb.finish_with_message(format!("Task {task_id} completed at {at}"));
        }
        ProgressEvent::Failed { task_id, error } => {
            pb.finish_with_message(format!("Task {task_id} failed: {error}"));
        }
    })
}

async fn handle_resource(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    task_id: &str,
    resource_type: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (client, _) = conn_mgr.create_client(profile_name).await?;
    let resource_id = get_resource_id(&client, task_id, resource_type).await?;

    if output_format.is_json() {
        print_json(&json!({
            "task_id": task_id,
            "resource_type": resource_type,
            "resource_id": resource_id,
        }))
    } else {
        println!("{resource_id}");
        Ok(())
    }
}
