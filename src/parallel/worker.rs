use std::sync::mpsc;

use super::{MainMsg, WorkerMsg};
use crate::{engine::Engine, error::Error, potential::PairPotential};

/// One worker's channels to the manager, plus its place in the worker set.
///
/// A worker thread performs the setup handshake, builds an engine around
/// itself, and hands control to the user's run function. All communication
/// with other workers is routed through the manager at setup and flows over
/// direct channels afterwards.
pub struct Worker<P: PairPotential> {
    rx: mpsc::Receiver<MainMsg<P>>,
    tx: mpsc::Sender<WorkerMsg>,
    index: usize,
    count: usize,
}
impl<P: PairPotential> Worker<P> {
    pub(crate) fn new(rx: mpsc::Receiver<MainMsg<P>>, tx: mpsc::Sender<WorkerMsg>) -> Self {
        Self {
            rx,
            tx,
            index: 0,
            count: 1,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn send(&self, message: WorkerMsg) -> Result<(), Error> {
        self.tx.send(message).map_err(|_| Error::Disconnected)
    }
    pub fn recv(&self) -> Result<MainMsg<P>, Error> {
        self.rx.recv().map_err(|_| Error::Disconnected)
    }

    pub(crate) fn run_thread(mut self) {
        let (index, count) = match self.recv() {
            Ok(MainMsg::Setup { index, count }) => (index, count),
            _ => return,
        };
        self.index = index;
        self.count = count;

        let f = match self.recv() {
            Ok(MainMsg::Run(f)) => f,
            _ => return,
        };

        let report = self.tx.clone();
        let mut engine = Engine::new();
        engine.attach_worker(self);
        let message = match f(&mut engine) {
            Ok(()) => WorkerMsg::Complete,
            Err(e) => WorkerMsg::Failed(e),
        };
        // the manager may already be gone if another worker failed first
        let _ = report.send(message);
    }
}
