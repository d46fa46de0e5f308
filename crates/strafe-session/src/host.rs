//! Starting a hosted session from a menu or console.

use std::time::Duration;

use strafe_net::PacketChannel;

use crate::content::ContentProvider;
use crate::loader::{SessionLoader, SessionSettings};
use crate::state::LoadOutcome;

/// Replace any running host session with a fresh one on `map_name`.
///
/// An `existing` loader is destroyed first and given the settle delay to
/// release its resources. `build` then creates the new loader, which gets
/// `settings` and runs the create sequence. On failure the new loader is
/// destroyed as well and the outcome is returned so the caller can fall back
/// to its idle screen.
pub async fn launch_host<N, C>(
    existing: Option<SessionLoader<N, C>>,
    build: impl FnOnce() -> SessionLoader<N, C>,
    settings: SessionSettings,
    map_name: &str,
    gamemode: &str,
) -> Result<SessionLoader<N, C>, LoadOutcome>
where
    N: PacketChannel,
    C: ContentProvider,
{
    if let Some(previous) = existing {
        tracing::info!("Shutting down the running host session");
        let settle = Duration::from_millis(previous.context().config.map_change_settle_ms);
        previous.destroy();
        drop(previous);
        tokio::time::sleep(settle).await;
    }

    let loader = build();
    tracing::info!("Hosting '{}' on {map_name} ({gamemode})", settings.name);
    loader.set_settings(settings);

    match loader.create_game(map_name, gamemode).await {
        LoadOutcome::Success => Ok(loader),
        outcome => {
            tracing::warn!("Failed to host on {map_name}: {outcome:?}");
            loader.destroy();
            Err(outcome)
        }
    }
}
