// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

/// Builds backend sessions for the dispatch pool.
///
/// Sessions are cheap handles (typically `Arc`-backed): the default session is
/// cloned into every default worker, an identity session is moved into the
/// single worker of that identity's lane and dropped when the lane ends.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Clone + Send + Sync + 'static;

    /// The shared session that is not scoped to any principal.
    fn default_session(&self) -> anyhow::Result<Self::Session>;

    /// A session that acts with the authority of `identity`. Fails if the
    /// identity cannot be resolved or is not authorized.
    fn session_for(&self, identity: &str) -> anyhow::Result<Self::Session>;
}
