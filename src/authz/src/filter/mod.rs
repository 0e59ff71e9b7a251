//! Per-subscriber publish filters
//!
//! A filter is built once per PUBLISH from its options and then asked, for
//! each candidate subscriber, whether the event should be delivered. An
//! absent filter means unconditional delivery.

pub mod complex;
pub mod simple;

pub use complex::{ComplexFilter, MatchMode, NegFilter};
pub use simple::SimpleFilter;

use relaygate_core::{Dict, Message, Session, Value};
use tracing::debug;

/// Option key selecting a combinator
pub const FILTER_TYPE_KEY: &str = "filter_type";

/// Option key holding the nested spec of a `not` combinator
pub const FILTER_KEY: &str = "filter";

/// Option key holding the nested specs of `all` and `any`
pub const FILTERS_KEY: &str = "filters";

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum PublishFilter {
    Simple(SimpleFilter),
    Complex(ComplexFilter),
    Not(NegFilter),
}

impl PublishFilter {
    /// Build a filter tree from publish options
    ///
    /// Malformed nested specs are skipped rather than failing the publish.
    pub fn from_options(options: &Dict) -> Option<Self> {
        if options.is_empty() {
            return None;
        }

        // Combinators are only recognised alongside a `filters` list
        let kind = options.get(FILTER_TYPE_KEY).and_then(Value::as_str);
        let specs = options.get(FILTERS_KEY).and_then(Value::as_array);
        let (Some(kind), Some(specs)) = (kind, specs) else {
            return Self::simple(options);
        };

        match kind {
            "not" => {
                let sub_filter = match options.get(FILTER_KEY).and_then(Value::as_object) {
                    Some(spec) => Self::from_options(spec),
                    None => Self::simple(options),
                };
                sub_filter.map(|sub_filter| PublishFilter::Not(NegFilter::new(sub_filter)))
            }
            "all" | "any" => {
                let mode = if kind == "all" { MatchMode::All } else { MatchMode::Any };
                let sub_filters = specs
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(Self::from_options)
                    .collect();
                Some(PublishFilter::Complex(ComplexFilter::new(mode, sub_filters)))
            }
            _ => Self::simple(options),
        }
    }

    fn simple(options: &Dict) -> Option<Self> {
        SimpleFilter::from_options(options).map(PublishFilter::Simple)
    }

    /// Whether the event may be delivered to `subscriber`
    pub fn allowed(&self, subscriber: &Session) -> bool {
        match self {
            PublishFilter::Simple(filter) => filter.allowed(subscriber),
            PublishFilter::Complex(filter) => filter.allowed(subscriber),
            PublishFilter::Not(filter) => filter.allowed(subscriber),
        }
    }
}

impl From<SimpleFilter> for PublishFilter {
    fn from(filter: SimpleFilter) -> Self {
        PublishFilter::Simple(filter)
    }
}

/// Build the filter for a PUBLISH message, `None` for other kinds
pub fn build_publish_filter(message: &Message) -> Option<PublishFilter> {
    let filter = PublishFilter::from_options(message.publish_options()?);
    debug!(has_filter = filter.is_some(), "Built publish filter");
    filter
}
