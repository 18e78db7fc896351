//! Injection orchestration and the automation loop
//!
//! Composes the parsing, matching and planning layers into the
//! end-to-end cross-seed operation: pick an injection mode, drive the
//! qBittorrent add with the right options, run recheck-resume, and
//! schedule discovery runs that feed candidates through the pipeline.

pub mod automation;
pub mod cooldown;
pub mod inject;
pub mod pipeline;

pub use automation::{AutomationEngine, AutomationLimits};
pub use cooldown::CooldownRegistry;
pub use inject::{InjectionJob, InjectionOrchestrator, InstanceLinkSettings, OrchestratorConfig};
pub use pipeline::{CrossSeedPipeline, PipelineInput};
