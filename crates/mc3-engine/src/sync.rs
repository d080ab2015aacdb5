use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

use mc3_core::errors::ErrorInfo;
use mc3_core::Mc3Error;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Blocking transport between the workers of one run.
///
/// Implementations deliver payloads in order per directed pair. Everything
/// above this trait is structured as gather/decide/broadcast rounds with
/// worker 0 deciding, so a mismatch in who sends what is unrecoverable and
/// surfaces as a synchronization error.
pub trait SyncChannel {
    /// This worker's rank in `0..num_workers()`.
    fn rank(&self) -> usize;

    /// Fixed number of workers participating in the run.
    fn num_workers(&self) -> usize;

    /// Sends a payload to another worker.
    fn send(&self, to: usize, payload: Vec<u8>) -> Result<(), Mc3Error>;

    /// Receives the next payload from another worker, blocking.
    fn recv(&self, from: usize) -> Result<Vec<u8>, Mc3Error>;

    /// Blocks until every worker arrives.
    fn barrier(&self);
}

/// Collects `(chain, value)` contributions into a chain-indexed array on
/// worker 0. Every other worker sends exactly one message, even when it
/// leads no chain. Returns `None` everywhere but the coordinator.
pub fn gather<T, S>(
    channel: &S,
    contributions: Vec<(usize, T)>,
    chains: usize,
) -> Result<Option<Vec<T>>, Mc3Error>
where
    T: Serialize + DeserializeOwned,
    S: SyncChannel,
{
    if channel.rank() != 0 {
        channel.send(0, encode(&contributions)?)?;
        return Ok(None);
    }
    let mut assembled: Vec<Option<T>> = (0..chains).map(|_| None).collect();
    place(&mut assembled, contributions, 0)?;
    for worker in 1..channel.num_workers() {
        let incoming: Vec<(usize, T)> = decode(&channel.recv(worker)?)?;
        place(&mut assembled, incoming, worker)?;
    }
    let mut values = Vec::with_capacity(chains);
    for (chain, value) in assembled.into_iter().enumerate() {
        values.push(value.ok_or_else(|| {
            Mc3Error::Sync(
                ErrorInfo::new("gather-missing", "no worker reported a value for a chain")
                    .with_context("chain", chain.to_string()),
            )
        })?);
    }
    Ok(Some(values))
}

/// Publishes a value from `root` to every worker and returns it everywhere.
/// The root must supply `Some`; everyone else passes `None` and receives.
pub fn broadcast<T, S>(channel: &S, root: usize, value: Option<T>) -> Result<T, Mc3Error>
where
    T: Serialize + DeserializeOwned,
    S: SyncChannel,
{
    if channel.rank() == root {
        let value = value.ok_or_else(|| {
            Mc3Error::Sync(
                ErrorInfo::new("broadcast-missing", "broadcast root holds no value")
                    .with_context("root", root.to_string()),
            )
        })?;
        let bytes = encode(&value)?;
        for worker in 0..channel.num_workers() {
            if worker != root {
                channel.send(worker, bytes.clone())?;
            }
        }
        Ok(value)
    } else {
        decode(&channel.recv(root)?)
    }
}

fn place<T>(
    assembled: &mut [Option<T>],
    contributions: Vec<(usize, T)>,
    worker: usize,
) -> Result<(), Mc3Error> {
    for (chain, value) in contributions {
        let cell = assembled.get_mut(chain).ok_or_else(|| {
            Mc3Error::Sync(
                ErrorInfo::new("gather-range", "worker reported an unknown chain")
                    .with_context("chain", chain.to_string())
                    .with_context("worker", worker.to_string()),
            )
        })?;
        if cell.is_some() {
            return Err(Mc3Error::Sync(
                ErrorInfo::new("gather-duplicate", "two workers reported the same chain")
                    .with_context("chain", chain.to_string())
                    .with_context("worker", worker.to_string()),
            ));
        }
        *cell = Some(value);
    }
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Mc3Error> {
    bincode::serialize(value)
        .map_err(|err| Mc3Error::Serde(ErrorInfo::new("sync-encode", err.to_string())))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Mc3Error> {
    bincode::deserialize(bytes)
        .map_err(|err| Mc3Error::Serde(ErrorInfo::new("sync-decode", err.to_string())))
}

/// Single-process channel: one worker owns every chain, so gathers assemble
/// locally and broadcasts return the coordinator's own value.
#[derive(Debug, Default, Clone)]
pub struct LocalChannel;

impl LocalChannel {
    /// A channel for single-worker runs.
    pub fn new() -> Self {
        Self
    }
}

impl SyncChannel for LocalChannel {
    fn rank(&self) -> usize {
        0
    }

    fn num_workers(&self) -> usize {
        1
    }

    fn send(&self, to: usize, _payload: Vec<u8>) -> Result<(), Mc3Error> {
        Err(Mc3Error::Sync(
            ErrorInfo::new("no-peers", "single-worker channel has nobody to send to")
                .with_context("to", to.to_string()),
        ))
    }

    fn recv(&self, from: usize) -> Result<Vec<u8>, Mc3Error> {
        Err(Mc3Error::Sync(
            ErrorInfo::new("no-peers", "single-worker channel has nobody to receive from")
                .with_context("from", from.to_string()),
        ))
    }

    fn barrier(&self) {}
}

/// One endpoint of an in-process worker mesh built by [`mesh`].
///
/// Each ordered pair of workers gets its own queue, so sends never block and
/// receives see messages from one peer in send order. Endpoints are moved
/// into their worker threads.
#[derive(Debug)]
pub struct ThreadedChannel {
    rank: usize,
    workers: usize,
    senders: Vec<Option<Sender<Vec<u8>>>>,
    receivers: Vec<Option<Receiver<Vec<u8>>>>,
    barrier: Arc<Barrier>,
}

/// Builds a fully connected mesh of `workers` endpoints sharing one barrier.
pub fn mesh(workers: usize) -> Vec<ThreadedChannel> {
    let mut senders: Vec<Vec<Option<Sender<Vec<u8>>>>> = (0..workers)
        .map(|_| (0..workers).map(|_| None).collect())
        .collect();
    let mut receivers: Vec<Vec<Option<Receiver<Vec<u8>>>>> = (0..workers)
        .map(|_| (0..workers).map(|_| None).collect())
        .collect();
    for from in 0..workers {
        for to in 0..workers {
            if from == to {
                continue;
            }
            let (tx, rx) = channel();
            senders[from][to] = Some(tx);
            receivers[to][from] = Some(rx);
        }
    }
    let barrier = Arc::new(Barrier::new(workers.max(1)));
    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| ThreadedChannel {
            rank,
            workers,
            senders,
            receivers,
            barrier: Arc::clone(&barrier),
        })
        .collect()
}

impl SyncChannel for ThreadedChannel {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_workers(&self) -> usize {
        self.workers
    }

    fn send(&self, to: usize, payload: Vec<u8>) -> Result<(), Mc3Error> {
        let sender = self
            .senders
            .get(to)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| {
                Mc3Error::Sync(
                    ErrorInfo::new("peer-unknown", "no outgoing queue for that worker")
                        .with_context("to", to.to_string()),
                )
            })?;
        sender.send(payload).map_err(|_| {
            Mc3Error::Sync(
                ErrorInfo::new("peer-closed", "receiving worker has hung up")
                    .with_context("to", to.to_string()),
            )
        })
    }

    fn recv(&self, from: usize) -> Result<Vec<u8>, Mc3Error> {
        let receiver = self
            .receivers
            .get(from)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| {
                Mc3Error::Sync(
                    ErrorInfo::new("peer-unknown", "no incoming queue for that worker")
                        .with_context("from", from.to_string()),
                )
            })?;
        receiver.recv().map_err(|_| {
            Mc3Error::Sync(
                ErrorInfo::new("peer-closed", "sending worker has hung up")
                    .with_context("from", from.to_string()),
            )
        })
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
