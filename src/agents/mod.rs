pub mod dependency_extractor;
pub mod docker_updater;
pub mod interaction;
pub mod patch_applier;
pub mod update_checker;

pub use docker_updater::DockerUpdater;
pub use interaction::UpdateInteraction;
