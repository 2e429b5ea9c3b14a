use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use pipedag::exec::{CollaboratorFuture, CollaboratorRegistry, Persister, Producer, Transformer};
use pipedag::types::{Artifact, ArtifactMetadata, Parameters, PersistResult};

/// Shared observation point for fake collaborators.
///
/// - records `"start:<label>"` / `"end:<label>"` events in call order
/// - tracks how many calls are in flight, and the maximum ever observed
#[derive(Clone, Default)]
pub struct Probe {
    events: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    persisted: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Labels in the order their calls started.
    pub fn started(&self) -> Vec<String> {
        self.events_with_prefix("start:")
    }

    /// Labels in the order their calls finished.
    pub fn finished(&self) -> Vec<String> {
        self.events_with_prefix("end:")
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `(destination, bytes)` pairs stored by the memory persister.
    pub fn persisted(&self) -> Vec<(String, Vec<u8>)> {
        self.persisted.lock().unwrap().clone()
    }

    fn events_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    fn enter(&self, label: &str) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start:{label}"));
    }

    fn exit(&self, label: &str) {
        self.events.lock().unwrap().push(format!("end:{label}"));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Simulated collaborator call: enter, sleep, maybe fail, exit.
    async fn call(&self, label: &str, params: &Parameters) -> anyhow::Result<()> {
        self.enter(label);
        let delay = params.get("delay_ms").and_then(|v| v.as_i64()).unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        self.exit(label);

        if params.get("fail").and_then(|v| v.as_bool()).unwrap_or(false) {
            bail!("simulated failure in {label}");
        }
        Ok(())
    }
}

fn label_of(params: &Parameters, fallback: &str) -> String {
    params
        .get("label")
        .and_then(|v| v.as_str())
        .unwrap_or(fallback)
        .to_string()
}

/// Produces an artifact whose bytes are its label.
///
/// Parameters: `label`, `delay_ms`, `fail`.
pub struct FakeProducer {
    probe: Probe,
}

impl FakeProducer {
    pub fn new(probe: Probe) -> Self {
        Self { probe }
    }
}

impl Producer for FakeProducer {
    fn generate<'a>(&'a self, params: &'a Parameters) -> CollaboratorFuture<'a, Artifact> {
        Box::pin(async move {
            let label = label_of(params, "produce");
            self.probe.call(&label, params).await?;
            Ok(Artifact::new(label.into_bytes(), ArtifactMetadata::new("fake")))
        })
    }
}

/// Appends `+<suffix>` to the input bytes (suffix defaults to `"t"`).
///
/// Parameters: `label`, `suffix`, `delay_ms`, `fail`.
pub struct AppendTransformer {
    probe: Probe,
}

impl AppendTransformer {
    pub fn new(probe: Probe) -> Self {
        Self { probe }
    }
}

impl Transformer for AppendTransformer {
    fn transform<'a>(
        &'a self,
        input: &'a Artifact,
        params: &'a Parameters,
    ) -> CollaboratorFuture<'a, Artifact> {
        Box::pin(async move {
            let label = label_of(params, "transform");
            self.probe.call(&label, params).await?;

            let suffix = params.get("suffix").and_then(|v| v.as_str()).unwrap_or("t");
            let mut bytes = input.bytes().to_vec();
            bytes.push(b'+');
            bytes.extend_from_slice(suffix.as_bytes());
            Ok(Artifact::new(bytes, input.metadata.clone()))
        })
    }
}

/// Keeps persisted bytes in the probe instead of writing anywhere.
pub struct MemoryPersister {
    probe: Probe,
    fail: bool,
}

impl MemoryPersister {
    pub fn new(probe: Probe) -> Self {
        Self { probe, fail: false }
    }

    pub fn failing(probe: Probe) -> Self {
        Self { probe, fail: true }
    }
}

impl Persister for MemoryPersister {
    fn persist<'a>(
        &'a self,
        input: &'a Artifact,
        destination: &'a str,
    ) -> CollaboratorFuture<'a, PersistResult> {
        Box::pin(async move {
            self.probe.enter(destination);
            self.probe.exit(destination);
            if self.fail {
                bail!("simulated storage failure for {destination}");
            }
            self.probe
                .persisted
                .lock()
                .unwrap()
                .push((destination.to_string(), input.bytes().to_vec()));
            Ok(PersistResult::for_artifact(destination, input))
        })
    }
}

/// Registry with `fake` producer, `append` transformer and `mem` persister,
/// all reporting to `probe`.
pub fn fake_registry(probe: &Probe) -> CollaboratorRegistry {
    CollaboratorRegistry::new()
        .with_producer("fake", FakeProducer::new(probe.clone()))
        .with_transformer("append", AppendTransformer::new(probe.clone()))
        .with_persister("mem", MemoryPersister::new(probe.clone()))
}
