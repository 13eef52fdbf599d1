use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use crate::cli::Command;
use crate::config::ConfigManager;
use crate::faults::{Fault, FaultClassifier, FaultKind, MessagePresenter, MessageQueue, PendingNotification};
use crate::navigation::{
    InstanceResolver, Locator, Navigable, NavigationContext, NavigationEvent, NavigationService,
};

/// Run one command, writing its report to `out`
pub async fn execute(command: &Command, config: &ConfigManager, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Locator { uri } => describe_locator(uri, out),
        Command::Replay { steps, unresolvable } => replay(steps, unresolvable, config, out).await,
        Command::Classify { kind, operation, detail } => {
            classify(kind, operation, detail, config, out).await
        }
    }
}

fn describe_locator(uri: &str, out: &mut dyn Write) -> Result<()> {
    let locator = Locator::parse(uri)?;
    let report = json!({
        "canonical": locator.to_string(),
        "locator": locator,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

async fn replay(
    steps: &[String],
    unresolvable: &[String],
    config: &ConfigManager,
    out: &mut dyn Write,
) -> Result<()> {
    let resolver = Arc::new(ReplayResolver::new(unresolvable.iter().cloned()));
    let service = NavigationService::with_event_capacity(resolver, config.get_event_capacity()?);
    let mut events = service.events();

    for step in steps {
        let outcome = match step.as_str() {
            "back" => service.go_back().await.map(|moved| moved.then_some(()).ok_or("nothing to go back to")),
            "forward" => service
                .go_forward()
                .await
                .map(|moved| moved.then_some(()).ok_or("nothing to go forward to")),
            "clear" => {
                service.clear();
                Ok(Ok(()))
            }
            locator => service.navigate(locator).await.map(Ok),
        };

        let active = service
            .active_locator()
            .map(|locator| locator.to_string())
            .unwrap_or_else(|| "(none)".to_string());
        match outcome {
            Ok(Ok(())) => writeln!(out, "{}: ok, active {}", step, active)?,
            Ok(Err(reason)) => writeln!(out, "{}: skipped, {}", step, reason)?,
            Err(error) => writeln!(out, "{}: failed, {}", step, error)?,
        }
    }

    let (mut navigated, mut failed) = (0usize, 0usize);
    loop {
        match events.try_recv() {
            Ok(NavigationEvent::Navigated { .. }) => navigated += 1,
            Ok(NavigationEvent::NavigationFailed { .. }) => failed += 1,
            Ok(NavigationEvent::ActiveInstanceChanged { .. }) => {}
            Err(TryRecvError::Lagged(skipped)) => debug!("Missed {} navigation events", skipped),
            Err(_) => break,
        }
    }
    writeln!(out, "events: {} navigated, {} failed", navigated, failed)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&service.snapshot())?)?;
    Ok(())
}

async fn classify(
    kind: &str,
    operation: &str,
    detail: &str,
    config: &ConfigManager,
    out: &mut dyn Write,
) -> Result<()> {
    let kind: FaultKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let fault = Fault::sample(kind, detail);

    let presenter = Arc::new(ConsolePresenter::new(config.get_message_title()));
    let queue = MessageQueue::from_current(presenter).context("Classification needs a tokio runtime")?;
    let classifier = FaultClassifier::builtin(queue.clone());

    let decision = classifier.classify(&fault, operation);
    queue.wait_idle().await;
    info!("Classified {:?} fault in '{}' as {:?}", kind, operation, decision);
    let retry_policy = config.get_retry_policy()?;

    let report = json!({
        "kind": kind,
        "operation": operation,
        "fault": fault.to_string(),
        "decision": decision,
        "should_retry": decision.should_retry(),
        "messages_shown": queue.shown_count(),
        "retry_policy": retry_policy,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

/// Prints each message to stdout and dismisses it immediately
#[derive(Debug, Clone)]
pub struct ConsolePresenter {
    window_title: String,
}

impl ConsolePresenter {
    pub fn new<S: Into<String>>(window_title: S) -> Self {
        Self {
            window_title: window_title.into(),
        }
    }

    pub fn render(&self, notification: &PendingNotification) -> String {
        format!(
            "[{}] {}\n    {}",
            self.window_title, notification.title, notification.content
        )
    }
}

#[async_trait]
impl MessagePresenter for ConsolePresenter {
    async fn present(&self, notification: PendingNotification) {
        println!("{}", self.render(&notification));
    }
}

/// Resolver that produces a placeholder view for any type id except the
/// ones marked unresolvable
#[derive(Debug, Default)]
pub struct ReplayResolver {
    unresolvable: HashSet<String>,
}

impl ReplayResolver {
    pub fn new<I: IntoIterator<Item = String>>(unresolvable: I) -> Self {
        Self {
            unresolvable: unresolvable.into_iter().collect(),
        }
    }
}

#[async_trait]
impl InstanceResolver for ReplayResolver {
    async fn resolve(&self, locator: &Locator) -> Result<Arc<dyn Navigable>> {
        if self.unresolvable.contains(locator.type_id()) {
            anyhow::bail!("Type '{}' is marked unresolvable", locator.type_id());
        }
        Ok(Arc::new(ReplayView {
            name: format!("{}.{}", locator.module_id(), locator.type_id()),
        }))
    }
}

struct ReplayView {
    name: String,
}

impl Navigable for ReplayView {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn on_navigated_to(&self, context: &NavigationContext) {
        debug!("{} shown ({:?})", self.name, context.mode());
    }

    fn on_navigated_from(&self, context: &NavigationContext) {
        debug!("{} leaving for {}", self.name, context.locator());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(command: Command) -> String {
        let mut out = Vec::new();
        execute(&command, &ConfigManager::default(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_locator_report() {
        let output = run(Command::Locator {
            uri: "/Orders;/OrderDetail?id=42&mode=edit".to_string(),
        })
        .await;
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["locator"]["module_id"], "Orders");
        assert_eq!(report["locator"]["type_id"], "OrderDetail");
        assert_eq!(report["locator"]["parameters"]["id"], "42");
        assert_eq!(report["canonical"], "/Orders;/OrderDetail?id=42&mode=edit");
    }

    #[tokio::test]
    async fn test_locator_report_rejects_garbage() {
        let mut out = Vec::new();
        let command = Command::Locator {
            uri: "nonsense".to_string(),
        };
        assert!(execute(&command, &ConfigManager::default(), &mut out).await.is_err());
    }

    #[tokio::test]
    async fn test_replay_reports_each_step() {
        let output = run(Command::Replay {
            steps: vec![
                "/M;/A".to_string(),
                "/M;/B".to_string(),
                "/M;/Broken".to_string(),
                "back".to_string(),
                "forward".to_string(),
                "forward".to_string(),
            ],
            unresolvable: vec!["Broken".to_string()],
        })
        .await;

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "/M;/A: ok, active /M;/A");
        assert_eq!(lines[1], "/M;/B: ok, active /M;/B");
        assert!(lines[2].starts_with("/M;/Broken: failed"));
        assert_eq!(lines[3], "back: ok, active /M;/A");
        assert_eq!(lines[4], "forward: ok, active /M;/B");
        assert_eq!(lines[5], "forward: skipped, nothing to go forward to");
        assert_eq!(lines[6], "events: 4 navigated, 1 failed");
        assert!(output.contains("\"can_go_back\": true"));
    }

    #[tokio::test]
    async fn test_classify_terminal_fault() {
        let output = run(Command::Classify {
            kind: "not-found".to_string(),
            operation: "Load customer".to_string(),
            detail: "C-42".to_string(),
        })
        .await;
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["decision"], "Abort");
        assert_eq!(report["should_retry"], false);
        assert_eq!(report["messages_shown"], 1);
    }

    #[tokio::test]
    async fn test_classify_transient_fault() {
        let output = run(Command::Classify {
            kind: "busy".to_string(),
            operation: "Load orders".to_string(),
            detail: "orders".to_string(),
        })
        .await;
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["decision"], "Retry");
        assert_eq!(report["should_retry"], true);
        assert_eq!(report["messages_shown"], 0);
        assert!(report["retry_policy"]["max_attempts"].is_null());
    }

    #[test]
    fn test_console_presenter_render() {
        let presenter = ConsolePresenter::new("Order Desk");
        let rendered = presenter.render(&PendingNotification::new("Try again later.", "Save failed"));
        assert_eq!(rendered, "[Order Desk] Save failed\n    Try again later.");
    }
}
