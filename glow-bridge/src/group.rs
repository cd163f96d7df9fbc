use std::sync::Arc;

use glow_entities::EntityDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::BridgeError,
    measurement::{
        catalog, MeasurementContext, MeasurementDefinition, MeasurementState, UpdateOutcome,
    },
    pipeline::EntitySink,
};

static STATE_TOPIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"/STATE$").expect("static topic pattern"));
static ELECTRICITY_TOPIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/SENSOR/electricitymeter$").expect("static topic pattern"));
static GAS_TOPIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"/SENSOR/gasmeter$").expect("static topic pattern"));

/// Predicate deciding whether a topic belongs to an update group.
#[derive(Debug, Clone)]
pub struct TopicRule {
    regex: Regex,
}

impl TopicRule {
    pub fn pattern(pattern: &str) -> Result<Self, BridgeError> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| BridgeError::InvalidTopicRule(e.to_string()))
    }

    /// Match topics ending in exactly `suffix`.
    pub fn suffix(suffix: &str) -> Result<Self, BridgeError> {
        Self::pattern(&format!("{}$", regex::escape(suffix)))
    }

    pub fn matches(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// The three groups every IHD publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    DeviceStatus,
    Electricity,
    Gas,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [Self::DeviceStatus, Self::Electricity, Self::Gas];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeviceStatus => "STATE",
            Self::Electricity => "electricitymeter",
            Self::Gas => "gasmeter",
        }
    }

    pub fn topic_rule(&self) -> TopicRule {
        let regex = match self {
            Self::DeviceStatus => &STATE_TOPIC,
            Self::Electricity => &ELECTRICITY_TOPIC,
            Self::Gas => &GAS_TOPIC,
        };
        TopicRule {
            regex: Regex::clone(regex),
        }
    }

    pub fn measurements(&self) -> &'static [MeasurementDefinition] {
        match self {
            Self::DeviceStatus => catalog::STATE_MEASUREMENTS,
            Self::Electricity => catalog::ELECTRICITY_MEASUREMENTS,
            Self::Gas => catalog::GAS_MEASUREMENTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    NotMatched,
    Applied { emitted: usize },
}

/// Measurements that are all fed from the same topic and payload shape.
#[derive(Debug)]
pub struct UpdateGroup {
    label: &'static str,
    rule: TopicRule,
    states: Vec<MeasurementState>,
}

impl UpdateGroup {
    pub fn new(
        label: &'static str,
        rule: TopicRule,
        definitions: &[MeasurementDefinition],
        ctx: MeasurementContext,
    ) -> Self {
        let states = definitions
            .iter()
            .map(|d| MeasurementState::new(d.clone(), ctx.clone()))
            .collect();
        Self { label, rule, states }
    }

    pub fn for_kind(kind: GroupKind, ctx: MeasurementContext) -> Self {
        Self::new(kind.label(), kind.topic_rule(), kind.measurements(), ctx)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn states(&self) -> &[MeasurementState] {
        &self.states
    }

    pub fn descriptors(&self) -> Vec<EntityDescriptor> {
        self.states.iter().map(MeasurementState::descriptor).collect()
    }

    pub fn attach_sink(&mut self, sink: &Arc<dyn EntitySink>) {
        for s in &mut self.states {
            s.attach_sink(Arc::clone(sink));
        }
    }

    /// Feed one message to every measurement, if the topic belongs here.
    ///
    /// The payload is decoded once per matching group. A payload that is not
    /// a JSON object fails with `MalformedPayload` before any state changes.
    pub fn process_update(&mut self, topic: &str, raw: &[u8]) -> Result<GroupOutcome, BridgeError> {
        if !self.rule.matches(topic) {
            return Ok(GroupOutcome::NotMatched);
        }
        tracing::debug!(group = self.label, topic, "matched on {}", self.rule.as_str());

        let payload: Value =
            serde_json::from_slice(raw).map_err(|e| BridgeError::MalformedPayload(e.to_string()))?;
        if !payload.is_object() {
            return Err(BridgeError::MalformedPayload("payload is not a JSON object".to_string()));
        }

        let emitted = self
            .states
            .iter_mut()
            .map(|s| s.update(&payload))
            .filter(|o| matches!(o, UpdateOutcome::Updated | UpdateOutcome::Faulted))
            .count();

        Ok(GroupOutcome::Applied { emitted })
    }
}
