// src/events.rs

//! Event names exchanged with the host engine's subscription mechanism.
//!
//! Compiled nodes carry these as plain strings (that is what the engine
//! stores); inside the crate they are handled as [`EngineEventName`].

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineEventName {
    /// A task finished at a node feeding a parallel gateway.
    TaskParallelNodePass,
    /// A task finished at a node feeding an inclusion gateway.
    TaskInclusionNodePass,
    /// A reject behind a condition → concurrent-gateway chain.
    ConcurrentRejectCleanup,
    /// A reject behind a concurrent-gateway → condition chain.
    GatewayConditionReject,
    TaskNodeStart,
    TaskNodeEnd,
    AutomationStart,
    Notify,
    NotifyCC,
    ProcessEnd,
}

impl EngineEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEventName::TaskParallelNodePass => "EventTaskParallelNodePass",
            EngineEventName::TaskInclusionNodePass => "EventTaskInclusionNodePass",
            EngineEventName::ConcurrentRejectCleanup => "EventConcurrentRejectCleanup",
            EngineEventName::GatewayConditionReject => "EventGatewayConditionReject",
            EngineEventName::TaskNodeStart => "EventTaskNodeStart",
            EngineEventName::TaskNodeEnd => "EventTaskNodeEnd",
            EngineEventName::AutomationStart => "EventAutomationStart",
            EngineEventName::Notify => "EventNotify",
            EngineEventName::NotifyCC => "EventNotifyCC",
            EngineEventName::ProcessEnd => "EventProcessEnd",
        }
    }
}

impl fmt::Display for EngineEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineEventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EventTaskParallelNodePass" => Ok(EngineEventName::TaskParallelNodePass),
            "EventTaskInclusionNodePass" => Ok(EngineEventName::TaskInclusionNodePass),
            "EventConcurrentRejectCleanup" => Ok(EngineEventName::ConcurrentRejectCleanup),
            "EventGatewayConditionReject" => Ok(EngineEventName::GatewayConditionReject),
            "EventTaskNodeStart" => Ok(EngineEventName::TaskNodeStart),
            "EventTaskNodeEnd" => Ok(EngineEventName::TaskNodeEnd),
            "EventAutomationStart" => Ok(EngineEventName::AutomationStart),
            "EventNotify" => Ok(EngineEventName::Notify),
            "EventNotifyCC" => Ok(EngineEventName::NotifyCC),
            "EventProcessEnd" => Ok(EngineEventName::ProcessEnd),
            other => Err(format!("unknown engine event '{other}'")),
        }
    }
}
