//! Dependencies shared by the loader and the router.

use std::cell::RefCell;
use std::rc::Rc;

use strafe_config::SessionConfig;

use crate::content::GamemodeLoader;
use crate::state::Role;

/// Explicit collaborators for one simulation instance.
///
/// Cloning shares the same channel, content provider and gamemode loader.
pub struct SessionContext<N, C> {
    /// Which side of the connection this process is.
    pub role: Role,
    /// Transport.
    pub network: Rc<N>,
    /// Map and content source.
    pub content: Rc<C>,
    /// Gamemode loader.
    pub gamemodes: Rc<RefCell<dyn GamemodeLoader>>,
    /// Timeouts, retry policy and host identity.
    pub config: SessionConfig,
}

impl<N, C> SessionContext<N, C> {
    /// Bundle collaborators with the default [`SessionConfig`].
    pub fn new(
        role: Role,
        network: Rc<N>,
        content: Rc<C>,
        gamemodes: Rc<RefCell<dyn GamemodeLoader>>,
    ) -> Self {
        Self {
            role,
            network,
            content,
            gamemodes,
            config: SessionConfig::default(),
        }
    }

    /// Replace the session configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns `true` on the authoritative host.
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}

impl<N, C> Clone for SessionContext<N, C> {
    fn clone(&self) -> Self {
        Self {
            role: self.role,
            network: Rc::clone(&self.network),
            content: Rc::clone(&self.content),
            gamemodes: Rc::clone(&self.gamemodes),
            config: self.config.clone(),
        }
    }
}
