use std::collections::BTreeMap;

use crate::board::models::{BuildConfig, DetailValue, Message, Suggestion};
use crate::registry::{Affinity, Agent, Catalog};

/// One slot of the scripted sequence, before an actor is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub action: &'static str,
    pub details: BTreeMap<String, DetailValue>,
    pub affinity: Affinity,
}

impl PlannedStep {
    fn new(action: &'static str, affinity: Affinity) -> Self {
        Self {
            action,
            details: BTreeMap::new(),
            affinity,
        }
    }

    fn detail(mut self, key: &str, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Expand a build configuration into the ordered step sequence.
///
/// The skeleton is fixed; the middle slots appear only when the matching
/// option is chosen. Catalog ids resolve to display names where the
/// registry knows them, otherwise the raw id passes through.
pub fn build_plan(config: &BuildConfig, catalog: &Catalog) -> Vec<PlannedStep> {
    let mut steps = Vec::new();

    steps.push(
        PlannedStep::new("create-container", Affinity::Both)
            .detail("status", "Container initialized"),
    );
    steps.push(PlannedStep::new("command", Affinity::Both).detail("command", "npm install"));

    if let Some(template) = &config.template {
        steps.push(
            PlannedStep::new("assemble-frontend", Affinity::Alpha)
                .detail("template", catalog.template_name(template)),
        );
    }
    if !config.ui.is_empty() {
        steps.push(
            PlannedStep::new("ui-update", Affinity::Alpha)
                .detail("componentsAdded", catalog.ui_names(&config.ui)),
        );
    }
    if let Some(service) = &config.service {
        steps.push(
            PlannedStep::new("service-setup", Affinity::Bravo)
                .detail("service", catalog.service_name(service)),
        );
    }
    if let Some(datastore) = &config.datastore {
        steps.push(
            PlannedStep::new("datastore-integration", Affinity::Bravo)
                .detail("datastore", catalog.datastore_name(datastore)),
        );
    }
    if !config.env.is_empty() {
        let mut step = PlannedStep::new("configure-environment", Affinity::Bravo);
        for (key, value) in &config.env {
            // Secret-bearing keys are acknowledged, never echoed.
            if key.contains("API_KEY") {
                step = step.detail(&format!("{key}_STATUS"), "Set and secured");
            } else {
                step = step.detail(key, value.as_str());
            }
        }
        steps.push(step);
    }

    steps.push(PlannedStep::new("command", Affinity::Both).detail("command", "npm run build"));
    steps.push(
        PlannedStep::new("finalize-handover", Affinity::Both)
            .detail("status", "Deployment to local environment complete"),
    );

    steps
}

/// System message announcing the run.
pub fn opening_message(coordinator: &Agent, title: &str) -> Message {
    Message::system(format!(
        "**Orchestration Initiated by {}**\n*The crew is assembling the container for \"{}\".*",
        coordinator.name, title
    ))
}

/// Transcript mirror for one executed step.
pub fn mirror_message(
    action: &str,
    actor: &Agent,
    details: &BTreeMap<String, DetailValue>,
) -> Message {
    Message::system(format!(
        "**Action:** `{action}`\n**By:** *{} ({})*\n**Details:**\n{}",
        actor.name,
        actor.domain.label(),
        detail_lines(details)
    ))
}

/// Transcript mirror for a step that failed and halted the run.
pub fn failure_message(action: &str, actor: &Agent) -> Message {
    Message::system(format!(
        "**Action:** `{action}` **failed**\n**By:** *{} ({})*\nThe run has halted. Edit the configuration to rebuild.",
        actor.name,
        actor.domain.label()
    ))
}

/// Closing model message with next-action suggestions that vary by which
/// options the configuration carried.
pub fn closing_message(title: &str, config: &BuildConfig) -> Message {
    let mut suggestions = Vec::new();
    if !config.ui.is_empty() {
        suggestions.push(Suggestion {
            text: "Refine Component UI/UX".to_string(),
            prompt: "Let's refine the UI/UX of the main components.".to_string(),
        });
    }
    if let Some(service) = &config.service {
        suggestions.push(Suggestion {
            text: "Add API Endpoint".to_string(),
            prompt: format!(
                "What's the first API endpoint we should build for the {service} service?"
            ),
        });
    }
    suggestions.push(Suggestion {
        text: "Deploy to Production".to_string(),
        prompt: "What are the steps to deploy this to a production environment?".to_string(),
    });

    Message {
        suggestions: Some(suggestions),
        ..Message::model(format!(
            "Build complete. The container for **{title}** was successfully orchestrated by the crew and is now running. What's our next move?"
        ))
    }
}

/// Render details as indented Markdown bullets.
pub fn detail_lines(details: &BTreeMap<String, DetailValue>) -> String {
    details
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                DetailValue::Text(text) => format!("\"{text}\""),
                DetailValue::List(items) => format!("[{}]", items.join(", ")),
            };
            format!("  - **{}:** {}", humanize_key(key), rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn a config key into a display label: camelCase boundaries and
/// underscores become spaces, first letter uppercased. Runs of capitals
/// stay intact, so `componentsAdded` becomes `Components Added` and
/// `API_KEY_STATUS` becomes `API KEY STATUS`.
fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '_' {
            out.push(' ');
            prev_lower = false;
        } else if c.is_uppercase() && prev_lower {
            out.push(' ');
            out.push(c);
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => out,
    }
}
