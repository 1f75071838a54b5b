//! # Cluster Driver
//!
//! Runs verifier workers as independent tasks on one bus and lets callers
//! start and kill them. Killing a verifier aborts its task without any
//! cleanup beyond what the bus does for a dead consumer, which is exactly
//! how a crashed process looks to the rest of the cluster.

use qc_verification_requestor::{RequestorConfig, RequestorError, VerificationRequestor};
use qc_verifier_worker::{attach_worker, TransactionVerifier, WorkerConfig, WorkerError, WorkerStats};
use shared_bus::{ConsumerId, MessageBus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One running verifier.
pub struct VerifierProcess {
    id: ConsumerId,
    name: String,
    stats: Arc<WorkerStats>,
    task: JoinHandle<Result<(), WorkerError>>,
}

impl VerifierProcess {
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Whether the worker loop has ended (killed, failed, or bus closed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the worker as if its process died. Any job it holds is
    /// redelivered once the bus notices the consumer is gone.
    pub fn kill(self) {
        warn!(verifier = %self.name, consumer = %self.id, "Killing verifier");
        self.task.abort();
    }
}

/// A pool of verifiers sharing one bus and one verification function.
pub struct VerifierCluster<B: MessageBus, V> {
    bus: Arc<B>,
    verifier: Arc<V>,
    worker: WorkerConfig,
    processes: Vec<VerifierProcess>,
    started: usize,
}

impl<B, V> VerifierCluster<B, V>
where
    B: MessageBus,
    V: TransactionVerifier,
{
    pub fn new(bus: Arc<B>, verifier: Arc<V>, worker: WorkerConfig) -> Self {
        Self {
            bus,
            verifier,
            worker,
            processes: Vec::new(),
            started: 0,
        }
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Start a requestor on this cluster's bus.
    ///
    /// # Errors
    ///
    /// Whatever [`VerificationRequestor::start`] returns.
    pub fn start_requestor(
        &self,
        config: RequestorConfig,
    ) -> Result<VerificationRequestor<B>, RequestorError> {
        VerificationRequestor::start(self.bus.clone(), config)
    }

    /// Attach and start one more verifier.
    ///
    /// # Errors
    ///
    /// * `WorkerError::Bus` - The verifier could not attach
    pub fn start_verifier(&mut self) -> Result<ConsumerId, WorkerError> {
        self.started += 1;
        let config = WorkerConfig {
            name: format!("{}-{}", self.worker.name, self.started),
            ..self.worker.clone()
        };

        let worker = attach_worker(&self.bus, self.verifier.clone(), &config)?;
        let id = worker.id();
        let stats = worker.stats();
        let task = tokio::spawn(worker.run());

        info!(verifier = %config.name, consumer = %id, "Verifier started");
        self.processes.push(VerifierProcess {
            id,
            name: config.name,
            stats,
            task,
        });
        Ok(id)
    }

    /// Start `count` verifiers.
    ///
    /// # Errors
    ///
    /// Stops at the first verifier that cannot attach.
    pub fn start_verifiers(&mut self, count: usize) -> Result<Vec<ConsumerId>, WorkerError> {
        (0..count).map(|_| self.start_verifier()).collect()
    }

    /// Kill the verifier with the given id. Returns `false` if it is not running.
    pub fn kill_verifier(&mut self, id: ConsumerId) -> bool {
        match self.processes.iter().position(|p| p.id == id) {
            Some(index) => {
                self.processes.remove(index).kill();
                true
            }
            None => false,
        }
    }

    /// Kill the oldest running verifier.
    pub fn kill_any(&mut self) -> Option<ConsumerId> {
        if self.processes.is_empty() {
            return None;
        }
        let process = self.processes.remove(0);
        let id = process.id;
        process.kill();
        Some(id)
    }

    /// Verifiers started and not killed. Some may have stopped on their own.
    pub fn processes(&self) -> &[VerifierProcess] {
        &self.processes
    }

    /// Number of verifiers started and not killed.
    pub fn running(&self) -> usize {
        self.processes.len()
    }

    /// Jobs answered by all verifiers still in the pool.
    pub fn processed(&self) -> u64 {
        self.processes.iter().map(|p| p.stats.processed()).sum()
    }

    /// Kill every verifier.
    pub fn shutdown(&mut self) {
        let count = self.processes.len();
        for process in self.processes.drain(..) {
            process.task.abort();
        }
        info!(verifiers = count, "Verifier cluster shut down");
    }
}

impl<B: MessageBus, V> Drop for VerifierCluster<B, V> {
    fn drop(&mut self) {
        for process in &self.processes {
            process.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_verifier_worker::LedgerRules;
    use shared_bus::InMemoryQueueBus;
    use std::time::Duration;

    fn cluster() -> VerifierCluster<InMemoryQueueBus, LedgerRules> {
        VerifierCluster::new(
            Arc::new(InMemoryQueueBus::new()),
            Arc::new(LedgerRules::default()),
            WorkerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_start_and_kill() {
        let mut cluster = cluster();
        let ids = cluster.start_verifiers(3).unwrap();
        assert_eq!(cluster.running(), 3);
        assert_eq!(cluster.bus().consumers(&WorkerConfig::default().request_queue), ids);
        assert_eq!(cluster.processes()[1].name(), "verifier-2");

        assert!(cluster.kill_verifier(ids[1]));
        assert!(!cluster.kill_verifier(ids[1]));
        assert_eq!(cluster.kill_any(), Some(ids[0]));
        assert_eq!(cluster.running(), 1);

        // The bus sees the dead consumers go once their tasks are torn down.
        tokio::time::timeout(Duration::from_secs(1), async {
            while cluster.bus().consumers(&WorkerConfig::default().request_queue).len() != 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("killed verifiers detached");
    }

    #[tokio::test]
    async fn test_requestor_sees_verifiers() {
        let mut cluster = cluster();
        let requestor = cluster.start_requestor(RequestorConfig::default()).unwrap();
        cluster.start_verifiers(2).unwrap();
        requestor
            .wait_until_number_of_verifiers(2, Duration::from_secs(1))
            .await
            .unwrap();

        cluster.shutdown();
        assert_eq!(cluster.running(), 0);
        assert_eq!(cluster.kill_any(), None);
    }
}
