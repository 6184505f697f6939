mod links;
mod message;
mod subdomain;
mod worker;

pub(crate) use links::NeighborLinks;
pub use message::{CheckpointMeta, CheckpointPart, Exchange, MainMsg, Phase, WorkerMsg};
pub use subdomain::Subdomain;
pub use worker::Worker;
