//! Composition of several authorizers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use relaygate_core::{Message, Session};
use tracing::debug;

use super::Authorizer;
use crate::error::Result;

/// How member decisions combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    /// Every member must permit
    #[default]
    All,
    /// One permitting member is enough
    One,
}

/// Runs member authorizers in order and short-circuits
///
/// In `All` mode the first denial wins; in `One` mode the first permit
/// wins. A member error aborts evaluation and is returned. With no members,
/// or when no member permits in `One` mode, the default outcome applies.
pub struct MultiAuthorizer {
    mode: ConsentMode,
    members: Vec<(String, Arc<dyn Authorizer>)>,
    default_outcome: bool,
}

impl MultiAuthorizer {
    pub fn new(mode: ConsentMode) -> Self {
        Self {
            mode,
            members: Vec::new(),
            default_outcome: false,
        }
    }

    pub fn with_default(mut self, permit: bool) -> Self {
        self.default_outcome = permit;
        self
    }

    /// Append a named member
    pub fn push(mut self, name: impl Into<String>, authorizer: Arc<dyn Authorizer>) -> Self {
        self.members.push((name.into(), authorizer));
        self
    }

    pub fn mode(&self) -> ConsentMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Authorizer for MultiAuthorizer {
    async fn authorize(&self, session: &Session, message: &Message) -> Result<bool> {
        if self.members.is_empty() {
            return Ok(self.default_outcome);
        }

        for (name, authorizer) in &self.members {
            let permit = authorizer.authorize(session, message).await?;
            debug!(authorizer = %name, permit, "Member decision");
            match (self.mode, permit) {
                (ConsentMode::All, false) => return Ok(false),
                (ConsentMode::One, true) => return Ok(true),
                _ => {}
            }
        }

        Ok(match self.mode {
            ConsentMode::All => true,
            ConsentMode::One => self.default_outcome,
        })
    }
}
