//! Role-based provider selection.

use std::sync::Arc;

use kinetic_core::Role;

use crate::provider::ImageProvider;

/// Picks the backend for an element from its role.
///
/// Avatars go to the identity-preserving provider so the character's face
/// stays consistent across shots; every other role goes to the general
/// provider.
#[derive(Clone)]
pub struct ProviderRouter {
    general: Arc<dyn ImageProvider>,
    identity: Arc<dyn ImageProvider>,
}

impl ProviderRouter {
    pub fn new(general: Arc<dyn ImageProvider>, identity: Arc<dyn ImageProvider>) -> Self {
        Self { general, identity }
    }

    /// Provider responsible for `role`.
    pub fn route(&self, role: &Role) -> &dyn ImageProvider {
        match role {
            Role::Avatar => self.identity.as_ref(),
            Role::Prop | Role::Other(_) => self.general.as_ref(),
        }
    }

    pub fn general(&self) -> &dyn ImageProvider {
        self.general.as_ref()
    }

    pub fn identity(&self) -> &dyn ImageProvider {
        self.identity.as_ref()
    }
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("general", &self.general.name())
            .field("identity", &self.identity.name())
            .finish()
    }
}
