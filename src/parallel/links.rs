use std::sync::mpsc;

use super::Exchange;
use crate::utils::Direction;

/// Exchange transmitters to the workers on each adjacent face.
///
/// A face with no entry is either a non-periodic box wall or an axis the
/// whole box spans with a single subdomain, where minimum-image distances
/// stand in for halo copies.
#[derive(Default)]
pub(crate) struct NeighborLinks {
    senders: [Option<mpsc::Sender<Exchange>>; 6],
}
impl NeighborLinks {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set(&mut self, direction: Direction, sender: mpsc::Sender<Exchange>) {
        self.senders[direction.index()] = Some(sender);
    }
    pub fn get(&self, direction: Direction) -> Option<&mpsc::Sender<Exchange>> {
        self.senders[direction.index()].as_ref()
    }
    pub fn count(&self) -> usize {
        self.senders.iter().flatten().count()
    }
}
