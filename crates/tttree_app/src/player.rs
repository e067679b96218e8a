// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless playback loop.
//!
//! Each step installs finished media loads, runs one tick and drains the
//! presentation channel. Between steps the player keeps installing loads and
//! ticks early as soon as one of them changes the graph. The player is itself a presentation surface: it
//! subscribes like any other display would.

use anyhow::Context as _;
use std::path::Path;
use std::time::{Duration, Instant};
use tttree_graph::presentation::Subscription;
use tttree_graph::{
    load_into, Evaluator, Graph, LoadRequest, MediaLoader, PresentationHub, ProtocolMessage,
    TickReport,
};
use tokio::sync::broadcast::error::TryRecvError;

use crate::settings::RuntimeSettings;

/// How often the loader is checked while waiting for the next tick
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Plays one graph
pub struct Player {
    graph: Graph,
    evaluator: Evaluator,
    loader: MediaLoader,
    subscription: Subscription,
    last_sent: Option<ProtocolMessage>,
    settings: RuntimeSettings,
}

impl Player {
    /// Player for `graph`, with its pending media `requests`
    pub fn new(graph: Graph, requests: Vec<LoadRequest>, settings: RuntimeSettings) -> anyhow::Result<Self> {
        let hub = PresentationHub::with_capacity(settings.channel_capacity);
        let subscription = hub.subscribe(&settings.channel);
        let mut loader = MediaLoader::new();
        for request in requests {
            tracing::debug!(node = ?request.node, source = %request.source, "requesting media");
            loader
                .request(request)
                .context("media loader is not running")?;
        }

        Ok(Self {
            graph,
            evaluator: Evaluator::new(hub),
            loader,
            subscription,
            last_sent: None,
            settings,
        })
    }

    /// Open a saved graph
    pub fn open(path: &Path, settings: RuntimeSettings) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut graph = Graph::default();
        let requests = load_into(&mut graph, &text)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::new(graph, requests, settings)
    }

    /// Block until initial media is in, or the configured timeout passes
    pub fn wait_for_media(&mut self) {
        let outcomes = self.loader.wait_idle(self.settings.media_timeout());
        for outcome in outcomes {
            self.install(outcome);
        }
        if self.loader.pending_count() > 0 {
            tracing::warn!(
                "{} media loads still pending after {:?}",
                self.loader.pending_count(),
                self.settings.media_timeout()
            );
        }
    }

    fn install(&mut self, outcome: tttree_graph::LoadOutcome) {
        match self.graph.apply_load(outcome) {
            Ok(true) => tracing::debug!("media ready"),
            Ok(false) => {}
            Err(e) => tracing::warn!("{e}"),
        }
    }

    fn install_finished(&mut self) {
        for outcome in self.loader.poll() {
            self.install(outcome);
        }
    }

    /// Apply finished loads and run one tick
    pub fn step(&mut self) -> anyhow::Result<TickReport> {
        self.install_finished();
        if self.graph.take_dirty() {
            tracing::trace!("graph changed since the last tick");
        }
        Ok(self.evaluator.tick(&self.graph)?)
    }

    /// Wait until `deadline`, installing loads as they finish.
    /// Returns early once the graph has changed and needs a re-tick.
    pub fn idle_until(&mut self, deadline: Instant) {
        loop {
            self.install_finished();
            if self.graph.is_dirty() {
                return;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return;
            }
            std::thread::sleep(left.min(IDLE_POLL));
        }
    }

    /// Messages published since the last drain.
    ///
    /// Unless `repeats` is set, a message identical to the previous one is
    /// dropped. A lagging subscription only loses old messages.
    pub fn drain(&mut self, repeats: bool) -> Vec<ProtocolMessage> {
        let mut fresh = Vec::new();
        loop {
            match self.subscription.try_recv() {
                Ok(message) => {
                    if repeats || self.last_sent.as_ref() != Some(&message) {
                        self.last_sent = Some(message.clone());
                        fresh.push(message);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "presentation subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        fresh
    }

    /// Run at the configured rate, handing every new message to `sink`.
    /// Stops after `ticks` ticks, or never when `None`.
    pub fn run(
        &mut self,
        ticks: Option<u64>,
        repeats: bool,
        mut sink: impl FnMut(&ProtocolMessage) -> anyhow::Result<()>,
    ) -> anyhow::Result<u64> {
        let interval = self.settings.tick_interval();
        let mut run = 0;
        while ticks.map_or(true, |limit| run < limit) {
            let started = Instant::now();
            self.step()?;
            for message in self.drain(repeats) {
                sink(&message)?;
            }
            run += 1;

            if ticks.map_or(true, |limit| run < limit) {
                self.idle_until(started + interval);
            }
        }
        Ok(run)
    }

    /// The graph being played
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Channel being streamed
    pub fn channel(&self) -> &str {
        &self.settings.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tttree_graph::nodes::{type_ids, NodeKind, TextInput};
    use tttree_graph::{create_registry, GraphDocument};

    fn hello_graph(text: &str) -> Graph {
        let registry = create_registry();
        let mut graph = Graph::new("Hello");
        let source = graph.add_node(
            registry
                .create_node(type_ids::TEXT)
                .unwrap()
                .with_kind(NodeKind::Text(TextInput {
                    text: text.to_string(),
                })),
        );
        let out = graph.add_node(registry.create_node(type_ids::HTML_PRESENTATION).unwrap());
        graph.connect_indices(source, 0, out, 0).unwrap();
        graph
    }

    fn fast_settings() -> RuntimeSettings {
        RuntimeSettings {
            tick_rate_hz: 1000,
            ..RuntimeSettings::default()
        }
    }

    #[test]
    fn test_repeats_are_collapsed() {
        let mut player = Player::new(hello_graph("Hi"), Vec::new(), fast_settings()).unwrap();
        let mut seen = Vec::new();
        let ticks = player
            .run(Some(3), false, |m| {
                seen.push(m.to_json()?);
                Ok(())
            })
            .unwrap();

        assert_eq!(ticks, 3);
        assert_eq!(
            seen,
            [r#"{"type":"render","data":{"content":{"kind":"text","val":"Hi"},"style":{}}}"#]
        );
    }

    #[test]
    fn test_repeats_on_request() {
        let mut player = Player::new(hello_graph("Hi"), Vec::new(), fast_settings()).unwrap();
        let mut count = 0;
        player
            .run(Some(3), true, |_| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_finished_load_cuts_the_wait_short() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "loaded late").unwrap();

        let registry = create_registry();
        let mut graph = Graph::new("Data");
        let data = graph.add_node(registry.create_node(type_ids::DATA).unwrap());
        let out = graph.add_node(registry.create_node(type_ids::HTML_PRESENTATION).unwrap());
        graph.connect_indices(data, 0, out, 0).unwrap();
        let request = graph.begin_load(data, path.to_string_lossy()).unwrap();
        graph.take_dirty();

        let mut player = Player::new(graph, vec![request], fast_settings()).unwrap();
        let started = Instant::now();
        player.idle_until(started + Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(player.graph().is_dirty());

        player.step().unwrap();
        assert!(!player.graph().is_dirty());
        let messages = player.drain(false);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].to_json().unwrap().contains("loaded late"));

        // Nothing left to change: the full wait is spent.
        let started = Instant::now();
        player.idle_until(started + Duration::from_millis(20));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(!player.graph().is_dirty());
    }

    #[test]
    fn test_open_saved_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.json");
        GraphDocument::new(hello_graph("Saved")).save(&path).unwrap();

        let mut player = Player::open(&path, fast_settings()).unwrap();
        player.wait_for_media();
        player.step().unwrap();
        let messages = player.drain(false);
        assert_eq!(messages.len(), 1);
        assert_eq!(player.graph().node_count(), 2);
    }

    #[test]
    fn test_open_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not a graph").unwrap();
        assert!(Player::open(&path, fast_settings()).is_err());
    }
}
