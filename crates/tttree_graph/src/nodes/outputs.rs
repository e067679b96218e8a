// SPDX-License-Identifier: MIT OR Apache-2.0
//! Presentation output.

use crate::evaluation::{NodeEvaluator, NodeInputs, NodeOutput, TickContext};
use crate::normalize::normalize;
use crate::presentation::PRESENTATION_CHANNEL;
use crate::protocol::ProtocolMessage;
use crate::payload::Value;
use serde::{Deserialize, Serialize};

/// Publishes whatever reaches its single input to a presentation channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlPresentation {
    /// Channel subscribers listen on
    pub channel: String,
}

impl Default for HtmlPresentation {
    fn default() -> Self {
        Self {
            channel: PRESENTATION_CHANNEL.to_string(),
        }
    }
}

impl HtmlPresentation {
    /// Protocol message for the current input
    pub fn message_for(payload: Option<&Value>) -> ProtocolMessage {
        match payload {
            None => ProtocolMessage::Clear,
            Some(value) => ProtocolMessage::Render {
                data: normalize(value),
            },
        }
    }
}

impl NodeEvaluator for HtmlPresentation {
    fn evaluate(&self, inputs: &NodeInputs, _output: &mut NodeOutput, ctx: &mut TickContext<'_>) {
        let message = Self::message_for(inputs.get(0).map(AsRef::as_ref));
        let reached = ctx.presentation.publish(&self.channel, message);
        tracing::debug!(node = ?ctx.node_id, channel = %self.channel, reached, "published scene");
    }
}
