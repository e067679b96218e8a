// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value sources. None of these read inputs; each tick they publish their
//! stored configuration unchanged.

use crate::evaluation::{NodeEvaluator, NodeInputs, NodeOutput, TickContext};
use crate::media::{Loaded, MediaError, MediaResource};
use crate::payload::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Single line of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextInput {
    /// Emitted text
    pub text: String,
}

impl Default for TextInput {
    fn default() -> Self {
        Self {
            text: "Hello TTTree".to_string(),
        }
    }
}

impl NodeEvaluator for TextInput {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        output.set(0, self.text.as_str());
    }
}

/// Checkbox
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanInput {
    /// Emitted flag
    pub value: bool,
}

impl NodeEvaluator for BooleanInput {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        output.set(0, self.value);
    }
}

/// Numeric slider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberInput {
    /// Emitted number
    pub value: f64,
}

impl NodeEvaluator for NumberInput {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        output.set(0, self.value);
    }
}

/// Brand palette with one output per color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    /// Primary color
    pub primary: String,
    /// Secondary color
    pub secondary: String,
    /// Accent color
    pub accent: String,
    /// Dark background
    pub dark: String,
    /// Light text
    pub light: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: "#008080".to_string(),
            secondary: "#FFA500".to_string(),
            accent: "#BD5E3E".to_string(),
            dark: "#333333".to_string(),
            light: "#F5F5F5".to_string(),
        }
    }
}

impl NodeEvaluator for ThemeColors {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        let colors = [
            &self.primary,
            &self.secondary,
            &self.accent,
            &self.dark,
            &self.light,
        ];
        for (index, color) in colors.into_iter().enumerate() {
            output.set(index, color.as_str());
        }
    }
}

/// Image or video loaded from disk.
///
/// Only `url` is persisted. The decoded resource lives for as long as the
/// node does and is replaced only when a newer load completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInput {
    /// Source of the currently loaded resource
    pub url: String,
    #[serde(skip)]
    resource: Option<Arc<MediaResource>>,
    #[serde(skip)]
    pending: Option<String>,
}

impl MediaInput {
    /// Currently loaded resource
    pub fn resource(&self) -> Option<&Arc<MediaResource>> {
        self.resource.as_ref()
    }

    /// Source of the load in flight, if any
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub(crate) fn begin_load(&mut self, source: &str) {
        self.pending = Some(source.to_string());
    }

    pub(crate) fn finish_load(
        &mut self,
        source: &str,
        result: Result<Loaded, MediaError>,
    ) -> Result<bool, MediaError> {
        if self.pending.as_deref() != Some(source) {
            return Ok(false);
        }
        self.pending = None;
        match result? {
            Loaded::Media(resource) => {
                self.url = source.to_string();
                self.resource = Some(resource);
                Ok(true)
            }
            Loaded::Text { .. } => Err(MediaError::UnsupportedFormat("text".to_string())),
        }
    }
}

impl NodeEvaluator for MediaInput {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        // Nothing loaded yet reads as a missing value downstream
        output.set_opt(0, self.resource.clone().map(Value::Media));
    }
}

/// Text loaded from a `.txt`, `.csv`, `.json` or `.md` file.
///
/// The file contents are persisted inline, so restoring a document does not
/// read the file again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataInput {
    /// File contents
    pub text: String,
    /// Name of the loaded file
    pub filename: String,
    #[serde(skip)]
    pending: Option<String>,
}

impl DataInput {
    pub(crate) fn begin_load(&mut self, source: &str) {
        self.pending = Some(source.to_string());
    }

    pub(crate) fn finish_load(
        &mut self,
        source: &str,
        result: Result<Loaded, MediaError>,
    ) -> Result<bool, MediaError> {
        if self.pending.as_deref() != Some(source) {
            return Ok(false);
        }
        self.pending = None;
        match result? {
            Loaded::Text { text, filename } => {
                self.text = text;
                self.filename = filename;
                Ok(true)
            }
            Loaded::Media(_) => Err(MediaError::UnsupportedFormat("media".to_string())),
        }
    }
}

impl NodeEvaluator for DataInput {
    fn evaluate(&self, _inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        output.set(0, self.text.as_str());
    }
}

/// Free-form scratchpad. Has no ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    /// Note text
    pub text: String,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            text: "Type your notes here...".to_string(),
        }
    }
}

impl NodeEvaluator for Note {
    fn evaluate(&self, _inputs: &NodeInputs, _output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {}
}
