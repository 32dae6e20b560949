pub mod cooldown;
pub mod enrichment;
pub mod normalizer;
pub mod pipeline;
pub mod poller;
pub mod rules;
