//! Static configuration: agent roster, stage templates, build catalog.
//!
//! Everything here is fixed data compiled into the binary and validated once
//! at startup by [`Registry::load`]. Runtime code looks agents and catalog
//! entries up by stable id; a failed lookup is a caller error, never a
//! silent fallback to the wrong persona.
//!
//! Core types:
//! - [`Affinity`] — which track an agent or build step belongs to
//! - [`Agent`] — a chat persona with instruction text and track affinity
//! - [`CatalogEntry`] — one template/UI/service/datastore build option
//! - [`StageTemplate`] — the per-track stage scaffold used for seeding

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::board::models::{Snapshot, Stage, TrackId};

mod data;

/// Roster id of the agent used when a request names none.
pub const DEFAULT_AGENT_ID: &str = "lyra";

/// Roster id of the build coordinator announced at the start of a run.
pub const COORDINATOR_ID: &str = "maestro";

/// Track affinity of an agent or a build step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    Alpha,
    Bravo,
    Both,
}

impl Affinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Bravo => "bravo",
            Self::Both => "both",
        }
    }

    /// Whether a step with this affinity accepts the given agent affinity.
    /// `Both` steps accept any agent; track-bound steps require an exact
    /// match (a `Both` agent does not qualify for a track-bound step).
    pub fn admits(&self, agent: &Affinity) -> bool {
        match self {
            Self::Both => true,
            _ => self == agent,
        }
    }

    /// Name used in transcript attributions, e.g. `Lyra (Alpha)`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Alpha => "Alpha",
            Self::Bravo => "Bravo",
            Self::Both => "Both",
        }
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Affinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(Self::Alpha),
            "bravo" => Ok(Self::Bravo),
            "both" => Ok(Self::Both),
            _ => Err(format!("Invalid affinity: {}", s)),
        }
    }
}

/// A chat persona. `personality_prompt` is the system instruction handed to
/// the completion service; the rest is descriptive roster data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub role: String,
    pub skills: Vec<String>,
    pub voice_style: String,
    pub personality: String,
    pub personality_prompt: String,
    pub domain: Affinity,
}

/// One selectable build option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub domain_affinity: Affinity,
}

/// The build option catalog, grouped by slot.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub templates: Vec<CatalogEntry>,
    pub ui: Vec<CatalogEntry>,
    pub services: Vec<CatalogEntry>,
    pub datastores: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn template(&self, id: &str) -> Option<&CatalogEntry> {
        self.templates.iter().find(|e| e.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&CatalogEntry> {
        self.services.iter().find(|e| e.id == id)
    }

    pub fn datastore(&self, id: &str) -> Option<&CatalogEntry> {
        self.datastores.iter().find(|e| e.id == id)
    }

    /// Display name for a template id, falling back to the raw id when the
    /// id is not in the catalog.
    pub fn template_name(&self, id: &str) -> String {
        self.template(id).map_or_else(|| id.to_string(), |e| e.name.clone())
    }

    pub fn service_name(&self, id: &str) -> String {
        self.service(id).map_or_else(|| id.to_string(), |e| e.name.clone())
    }

    pub fn datastore_name(&self, id: &str) -> String {
        self.datastore(id).map_or_else(|| id.to_string(), |e| e.name.clone())
    }

    /// Names of the chosen UI add-ons, in catalog order.
    pub fn ui_names(&self, chosen: &[String]) -> Vec<String> {
        self.ui
            .iter()
            .filter(|e| chosen.iter().any(|id| *id == e.id))
            .map(|e| e.name.clone())
            .collect()
    }
}

/// Scaffold for one stage of a track; instantiated with an empty spark list
/// when the board seeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub color: String,
}

impl StageTemplate {
    pub fn instantiate(&self) -> Stage {
        Stage {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            color: self.color.clone(),
            sparks: Vec::new(),
        }
    }
}

/// All static configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct Registry {
    agents: Vec<Agent>,
    catalog: Catalog,
    alpha_stages: Vec<StageTemplate>,
    bravo_stages: Vec<StageTemplate>,
}

impl Registry {
    /// Build the registry from compiled-in data and validate it: unique
    /// agent ids and names, the default agent and the coordinator present,
    /// non-empty stage lists with unique ids, unique catalog ids per slot.
    pub fn load() -> Result<Self> {
        let registry = Self {
            agents: data::roster(),
            catalog: Catalog {
                templates: data::templates(),
                ui: data::ui_addons(),
                services: data::services(),
                datastores: data::datastores(),
            },
            alpha_stages: data::alpha_stages(),
            bravo_stages: data::bravo_stages(),
        };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            bail!("Agent roster is empty");
        }
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for agent in &self.agents {
            if !ids.insert(agent.id.as_str()) {
                bail!("Duplicate agent id: {}", agent.id);
            }
            if !names.insert(agent.name.as_str()) {
                bail!("Duplicate agent name: {}", agent.name);
            }
        }
        if self.agent(DEFAULT_AGENT_ID).is_none() {
            bail!("Default agent '{}' missing from roster", DEFAULT_AGENT_ID);
        }
        match self.agent(COORDINATOR_ID) {
            None => bail!("Coordinator '{}' missing from roster", COORDINATOR_ID),
            Some(coordinator) if coordinator.domain != Affinity::Both => {
                bail!("Coordinator '{}' must have affinity 'both'", COORDINATOR_ID)
            }
            Some(_) => {}
        }

        for (track, stages) in [
            (TrackId::Alpha, &self.alpha_stages),
            (TrackId::Bravo, &self.bravo_stages),
        ] {
            if stages.is_empty() {
                bail!("Track {} has no stage templates", track);
            }
            let mut stage_ids = HashSet::new();
            for stage in stages {
                if !stage_ids.insert(stage.id.as_str()) {
                    bail!("Duplicate stage id in track {}: {}", track, stage.id);
                }
            }
        }

        for (slot, entries) in [
            ("template", &self.catalog.templates),
            ("ui", &self.catalog.ui),
            ("service", &self.catalog.services),
            ("datastore", &self.catalog.datastores),
        ] {
            let mut entry_ids = HashSet::new();
            for entry in entries {
                if !entry_ids.insert(entry.id.as_str()) {
                    bail!("Duplicate {} catalog id: {}", slot, entry.id);
                }
            }
        }

        Ok(())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn default_agent(&self) -> &Agent {
        // Validated present at load.
        self.agents
            .iter()
            .find(|a| a.id == DEFAULT_AGENT_ID)
            .unwrap_or(&self.agents[0])
    }

    pub fn coordinator(&self) -> &Agent {
        self.agents
            .iter()
            .find(|a| a.id == COORDINATOR_ID)
            .unwrap_or(&self.agents[0])
    }

    /// Agents qualified for a step of the given affinity.
    pub fn candidates_for(&self, affinity: &Affinity) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| affinity.admits(&a.domain))
            .collect()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stage_templates(&self, track: &TrackId) -> &[StageTemplate] {
        match track {
            TrackId::Alpha => &self.alpha_stages,
            TrackId::Bravo => &self.bravo_stages,
        }
    }

    /// Fresh snapshot with both tracks scaffolded and no sparks.
    pub fn seed_snapshot(&self) -> Snapshot {
        Snapshot {
            alpha: self.alpha_stages.iter().map(StageTemplate::instantiate).collect(),
            bravo: self.bravo_stages.iter().map(StageTemplate::instantiate).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_passes_validation() {
        let registry = Registry::load().unwrap();
        assert!(!registry.agents().is_empty());
        assert_eq!(registry.default_agent().name, "Lyra");
        assert_eq!(registry.coordinator().name, "Maestro");
        assert_eq!(registry.coordinator().domain, Affinity::Both);
    }

    #[test]
    fn test_affinity_roundtrip() {
        for s in &["alpha", "bravo", "both"] {
            let parsed: Affinity = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!("neither".parse::<Affinity>().is_err());
    }

    #[test]
    fn test_affinity_admits_rules() {
        // Both-steps accept anyone.
        assert!(Affinity::Both.admits(&Affinity::Alpha));
        assert!(Affinity::Both.admits(&Affinity::Bravo));
        assert!(Affinity::Both.admits(&Affinity::Both));
        // Track-bound steps require an exact match.
        assert!(Affinity::Alpha.admits(&Affinity::Alpha));
        assert!(!Affinity::Alpha.admits(&Affinity::Bravo));
        assert!(!Affinity::Alpha.admits(&Affinity::Both));
        assert!(!Affinity::Bravo.admits(&Affinity::Alpha));
    }

    #[test]
    fn test_candidates_respect_step_affinity() {
        let registry = Registry::load().unwrap();

        let alpha = registry.candidates_for(&Affinity::Alpha);
        assert!(!alpha.is_empty());
        assert!(alpha.iter().all(|a| a.domain == Affinity::Alpha));

        let bravo = registry.candidates_for(&Affinity::Bravo);
        assert!(!bravo.is_empty());
        assert!(bravo.iter().all(|a| a.domain == Affinity::Bravo));

        let both = registry.candidates_for(&Affinity::Both);
        assert_eq!(both.len(), registry.agents().len());
    }

    #[test]
    fn test_agent_lookup_is_by_stable_id() {
        let registry = Registry::load().unwrap();
        let lyra = registry.agent("lyra").unwrap();
        assert_eq!(lyra.name, "Lyra");
        assert_eq!(lyra.domain, Affinity::Alpha);
        assert!(!lyra.personality_prompt.is_empty());
        assert!(registry.agent("Lyra").is_none());
        assert!(registry.agent("nobody").is_none());
    }

    #[test]
    fn test_seed_snapshot_matches_templates() {
        let registry = Registry::load().unwrap();
        let snapshot = registry.seed_snapshot();

        assert_eq!(snapshot.alpha.len(), 5);
        assert_eq!(snapshot.bravo.len(), 5);
        assert_eq!(snapshot.alpha[0].id, "vision-quest");
        assert_eq!(snapshot.alpha[0].title, "1. Vision Quest");
        assert_eq!(snapshot.alpha[0].color, "border-red-500");
        assert_eq!(snapshot.bravo[0].id, "intel-sync");
        assert_eq!(snapshot.bravo[4].id, "cross-domain-debrief");
        assert!(snapshot.alpha.iter().all(|s| s.sparks.is_empty()));
        assert!(snapshot.bravo.iter().all(|s| s.sparks.is_empty()));
    }

    #[test]
    fn test_catalog_name_resolution_falls_back_to_id() {
        let registry = Registry::load().unwrap();
        let catalog = registry.catalog();

        assert_eq!(catalog.template_name("react"), "React + Vite");
        assert_eq!(catalog.service_name("node-express"), "Node.js Express API");
        assert_eq!(catalog.datastore_name("json-store"), "JSON Store");
        assert_eq!(catalog.template_name("mystery"), "mystery");
    }

    #[test]
    fn test_ui_names_follow_catalog_order() {
        let registry = Registry::load().unwrap();
        // Chosen order is reversed; resulting names follow catalog order.
        let chosen = vec!["tailwind".to_string(), "shadcn".to_string()];
        let names = registry.catalog().ui_names(&chosen);
        assert_eq!(names, vec!["shadcn/ui", "Tailwind CSS"]);
    }
}
