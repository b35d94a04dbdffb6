//! Named actions dispatched through a table of function pointers.

use std::fmt;

use thiserror::Error;

/// Identifiers of the built-in picker and session actions.
pub const FILES: &str = "files";
pub const GREP: &str = "grep";
pub const BUFFERS: &str = "buffers";
pub const GREP_WORD: &str = "grep_word";
pub const RECENT: &str = "recent";
pub const GIT_FILES: &str = "git_files";
pub const RESUME: &str = "resume";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

pub struct Action<C> {
    pub id: &'static str,
    pub description: &'static str,
    run: fn(&mut C),
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Fixed set of actions keyed by identifier, in registration order.
pub struct ActionTable<C> {
    actions: Vec<Action<C>>,
}

impl<C> Default for ActionTable<C> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<C> ActionTable<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `run` under `id`, replacing an earlier registration.
    #[must_use]
    pub fn with(mut self, id: &'static str, description: &'static str, run: fn(&mut C)) -> Self {
        let action = Action {
            id,
            description,
            run,
        };
        match self.actions.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = action,
            None => self.actions.push(action),
        }
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Action<C>> {
        self.actions.iter().find(|action| action.id == id)
    }

    pub fn dispatch(&self, id: &str, context: &mut C) -> Result<(), UnknownAction> {
        let action = self
            .get(id)
            .ok_or_else(|| UnknownAction(id.to_string()))?;
        (action.run)(context);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action<C>> {
        self.actions.iter()
    }
}
