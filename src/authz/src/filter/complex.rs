//! Boolean combinators over publish filters

use relaygate_core::Session;

use super::PublishFilter;

/// How sub-filter decisions combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

/// `all` or `any` over a list of sub-filters
///
/// `all` over no sub-filters allows; `any` over none denies.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexFilter {
    mode: MatchMode,
    sub_filters: Vec<PublishFilter>,
}

impl ComplexFilter {
    pub fn new(mode: MatchMode, sub_filters: Vec<PublishFilter>) -> Self {
        Self { mode, sub_filters }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn sub_filters(&self) -> &[PublishFilter] {
        &self.sub_filters
    }

    pub fn allowed(&self, subscriber: &Session) -> bool {
        match self.mode {
            MatchMode::All => self.sub_filters.iter().all(|f| f.allowed(subscriber)),
            MatchMode::Any => self.sub_filters.iter().any(|f| f.allowed(subscriber)),
        }
    }
}

/// Inverts a sub-filter
#[derive(Debug, Clone, PartialEq)]
pub struct NegFilter {
    sub_filter: Box<PublishFilter>,
}

impl NegFilter {
    pub fn new(sub_filter: PublishFilter) -> Self {
        Self {
            sub_filter: Box::new(sub_filter),
        }
    }

    pub fn sub_filter(&self) -> &PublishFilter {
        &self.sub_filter
    }

    pub fn allowed(&self, subscriber: &Session) -> bool {
        !self.sub_filter.allowed(subscriber)
    }
}
