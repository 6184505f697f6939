use std::{sync::mpsc, thread};

use tracing::{debug, error};

use crate::{
    checkpoint::Checkpoint,
    engine::Engine,
    error::Error,
    parallel::{CheckpointPart, MainMsg, Worker, WorkerMsg},
    potential::PairPotential,
};

/// The manager that runs a simulation over a set of worker threads.
///
/// Each worker owns one subdomain and executes the same run function; the
/// manager routes channel setup between workers, serves global reductions,
/// and assembles checkpoint files from per-worker parts.
pub struct Runtime<P: PairPotential> {
    rx: mpsc::Receiver<WorkerMsg>,
    tx: mpsc::Sender<WorkerMsg>,
    workers: Vec<mpsc::Sender<MainMsg<P>>>,
}

impl<P: PairPotential + 'static> Runtime<P> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            tx,
            workers: Vec::new(),
        }
    }

    /// Spawn `nworkers` threads, run `f` on each, and supervise until every
    /// worker completes or one fails.
    pub fn run(
        &mut self,
        nworkers: usize,
        f: fn(&mut Engine<P>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        assert!(nworkers > 0, "At least one worker is required");
        self.workers.clear();

        for index in 0..nworkers {
            let (tx_worker, rx_worker) = mpsc::channel();
            self.workers.push(tx_worker);
            let worker = Worker::new(rx_worker, self.tx.clone());
            let _detached = thread::Builder::new()
                .name(format!("rmd-worker-{}", index))
                .spawn(move || worker.run_thread())
                .map_err(Error::Io)?;
        }

        for (index, worker) in self.workers.iter().enumerate() {
            worker
                .send(MainMsg::Setup {
                    index,
                    count: nworkers,
                })
                .map_err(|_| Error::Disconnected)?;
            worker.send(MainMsg::Run(f)).map_err(|_| Error::Disconnected)?;
        }
        debug!(nworkers, "workers launched");

        self.supervise(nworkers)
    }

    fn supervise(&mut self, nworkers: usize) -> Result<(), Error> {
        let mut complete = 0;
        let mut reductions: Vec<Vec<f64>> = Vec::new();
        let mut checkpoint_parts: Vec<CheckpointPart> = Vec::new();

        loop {
            let message = self.rx.recv().map_err(|_| Error::Disconnected)?;
            match message {
                WorkerMsg::Link { to, from, sender } => {
                    self.workers[to]
                        .send(MainMsg::Link { from, sender })
                        .map_err(|_| Error::Disconnected)?;
                }
                WorkerMsg::Reduce(values) => {
                    reductions.push(values);
                    if reductions.len() == nworkers {
                        let sum = element_sum(&reductions);
                        reductions.clear();
                        for worker in &self.workers {
                            worker
                                .send(MainMsg::Reduced(sum.clone()))
                                .map_err(|_| Error::Disconnected)?;
                        }
                    }
                }
                WorkerMsg::Checkpoint(part) => {
                    checkpoint_parts.push(*part);
                    if checkpoint_parts.len() == nworkers {
                        let result = assemble_and_save(std::mem::take(&mut checkpoint_parts));
                        if let Err(reason) = &result {
                            error!(reason = %reason, "checkpoint assembly failed");
                        }
                        for worker in &self.workers {
                            worker
                                .send(MainMsg::CheckpointSaved(result.clone()))
                                .map_err(|_| Error::Disconnected)?;
                        }
                    }
                }
                WorkerMsg::Complete => {
                    complete += 1;
                    if complete == nworkers {
                        return Ok(());
                    }
                }
                WorkerMsg::Failed(e) => return Err(e),
            }
        }
    }
}

fn element_sum(parts: &[Vec<f64>]) -> Vec<f64> {
    let mut sum = vec![0.0; parts.iter().map(Vec::len).max().unwrap_or(0)];
    for part in parts {
        for (acc, v) in sum.iter_mut().zip(part.iter()) {
            *acc += v;
        }
    }
    sum
}

fn assemble_and_save(mut parts: Vec<CheckpointPart>) -> Result<(), String> {
    let meta = parts
        .iter_mut()
        .find_map(|p| p.meta.take())
        .ok_or_else(|| "no worker supplied checkpoint metadata".to_string())?;
    let path = parts[0].path.clone();

    let mut records: Vec<(usize, usize, [f64; 3], [f64; 3])> = parts
        .iter()
        .flat_map(|p| {
            p.ids
                .iter()
                .enumerate()
                .map(|(n, &id)| (id, p.species[n], p.positions[n], p.velocities[n]))
        })
        .collect();
    records.sort_unstable_by_key(|r| r.0);

    let checkpoint = Checkpoint {
        edges: meta.edges,
        periodic: meta.periodic,
        species: meta.species_table,
        atom_species: records.iter().map(|r| r.1).collect(),
        positions: records.iter().map(|r| r.2).collect(),
        velocities: records.iter().map(|r| r.3).collect(),
        time: meta.time,
        step: meta.step,
    };
    checkpoint.save(&path).map_err(|e| e.to_string())
}
