use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackId {
    Alpha,
    Bravo,
}

impl TrackId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Bravo => "bravo",
        }
    }

    /// Human name shown in transcripts and track headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Alpha => "Alpha Crew",
            Self::Bravo => "Bravo Ops",
        }
    }

    pub fn other(&self) -> TrackId {
        match self {
            Self::Alpha => Self::Bravo,
            Self::Bravo => Self::Alpha,
        }
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(Self::Alpha),
            "bravo" => Ok(Self::Bravo),
            _ => Err(format!("Invalid track: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SparkStatus {
    Unconfigured,
    Configured,
    Building,
    Built,
    Error,
}

impl SparkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Building => "building",
            Self::Built => "built",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SparkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SparkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfigured" => Ok(Self::Unconfigured),
            "configured" => Ok(Self::Configured),
            "building" => Ok(Self::Building),
            "built" => Ok(Self::Built),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid spark status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    Meta,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
            Self::Meta => "meta",
            Self::System => "system",
        }
    }

    /// Only user and model turns are forwarded as conversational context.
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::User | Self::Model)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "model" => Ok(Self::Model),
            "meta" => Ok(Self::Meta),
            "system" => Ok(Self::System),
            _ => Err(format!("Invalid message role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Success,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid step status: {}", s)),
        }
    }
}

/// A suggested follow-up action carried by the newest model turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub text: String,
    pub prompt: String,
}

/// One transcript entry. Suggestions live only on the newest model turn;
/// sending a new user message strips them from everything before it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            suggestions: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A build-step detail value: scalar text or a list of names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DetailValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for DetailValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

/// One executed entry in a spark's build history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildStep {
    pub id: String,
    pub action: String,
    pub details: BTreeMap<String, DetailValue>,
    pub status: StepStatus,
    pub timestamp: String,
    pub by: String,
}

/// Registry selections attached to a spark. Template, datastore, and
/// service hold catalog ids; `ui` holds zero or more; `env` is free-form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BuildConfig {
    pub template: Option<String>,
    pub ui: Vec<String>,
    pub datastore: Option<String>,
    pub service: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildConfig {
    pub fn is_empty(&self) -> bool {
        self.template.is_none()
            && self.ui.is_empty()
            && self.datastore.is_none()
            && self.service.is_none()
            && self.env.is_empty()
    }
}

/// Provenance stamped on a spark's first handoff and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Origin {
    pub domain_id: TrackId,
    pub stage_id: String,
    pub agent_name: String,
}

/// The central mutable entity: a unit of work moving through stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spark {
    pub id: String,
    pub title: String,
    pub history: Vec<Message>,
    pub current_domain_id: TrackId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub build_config: BuildConfig,
    pub build_history: Vec<BuildStep>,
    pub status: SparkStatus,
}

impl Spark {
    /// Fresh draft: empty title and transcript, unconfigured, empty
    /// build config and history.
    pub fn new(track: TrackId) -> Self {
        Self {
            id: new_spark_id(),
            title: String::new(),
            history: Vec::new(),
            current_domain_id: track,
            origin: None,
            build_config: BuildConfig::default(),
            build_history: Vec::new(),
            status: SparkStatus::Unconfigured,
        }
    }
}

pub fn new_spark_id() -> String {
    format!("spark-{}", uuid::Uuid::new_v4())
}

pub fn new_step_id() -> String {
    format!("step-{}", uuid::Uuid::new_v4())
}

/// A named phase within a track. The stage list per track is fixed
/// configuration; only the spark lists change at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    pub id: String,
    pub title: String,
    pub description: String,
    pub color: String,
    pub sparks: Vec<Spark>,
}

/// The unit of persistence: both tracks with their full stage lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    pub alpha: Vec<Stage>,
    pub bravo: Vec<Stage>,
}

impl Snapshot {
    pub fn track(&self, track: &TrackId) -> &[Stage] {
        match track {
            TrackId::Alpha => &self.alpha,
            TrackId::Bravo => &self.bravo,
        }
    }

    pub fn track_mut(&mut self, track: &TrackId) -> &mut Vec<Stage> {
        match track {
            TrackId::Alpha => &mut self.alpha,
            TrackId::Bravo => &mut self.bravo,
        }
    }

    /// True when either track is missing its stage scaffold.
    pub fn needs_seed(&self) -> bool {
        self.alpha.is_empty() || self.bravo.is_empty()
    }

    /// Locate a spark anywhere on the board.
    pub fn find_spark(&self, spark_id: &str) -> Option<(TrackId, &Stage, &Spark)> {
        for track in [TrackId::Alpha, TrackId::Bravo] {
            for stage in self.track(&track) {
                if let Some(spark) = stage.sparks.iter().find(|s| s.id == spark_id) {
                    return Some((track, stage, spark));
                }
            }
        }
        None
    }

    pub fn spark_count(&self) -> usize {
        self.alpha
            .iter()
            .chain(self.bravo.iter())
            .map(|stage| stage.sparks.len())
            .sum()
    }
}
