use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

use crate::app::geocoding::GeocodingResolver;
use crate::domain::{LocationQuery, Precision, ResolvedLocation};
use crate::metrics;

/// Per-widget token source. Each resolution takes a token up front and only
/// the holder of the most recent token may apply its result.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    latest: AtomicU64,
    disposed: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceToken(u64);

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> SequenceToken {
        SequenceToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: SequenceToken) -> bool {
        !self.disposed.load(Ordering::SeqCst) && self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Marks every outstanding and future token stale
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Outcome of a guarded resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Still the newest request when it settled; `None` means there was
    /// nothing to resolve. Callers applying the result under their own lock
    /// re-check `token` there.
    Current {
        resolved: Option<ResolvedLocation>,
        token: SequenceToken,
    },
    /// A newer request was issued or the widget went away while this one ran
    Stale,
}

pub struct LocationResolutionEngine {
    geocoding: GeocodingResolver,
}

impl LocationResolutionEngine {
    pub fn new(geocoding: GeocodingResolver) -> Self {
        Self { geocoding }
    }

    /// Direct coordinates resolve without the mapping capability; addresses
    /// go through the geocoder; an empty query resolves to nothing.
    pub async fn resolve(&self, query: &LocationQuery) -> Option<ResolvedLocation> {
        match query {
            LocationQuery::Coordinate { .. } => Self::resolve_direct(query),
            LocationQuery::Address(address) => Some(self.geocoding.resolve(&address.parts).await),
            LocationQuery::Empty => {
                debug!("No coordinate or address to resolve");
                None
            }
        }
    }

    /// The synchronous part of [`resolve`](Self::resolve): only coordinate
    /// queries resolve here.
    pub fn resolve_direct(query: &LocationQuery) -> Option<ResolvedLocation> {
        match query {
            LocationQuery::Coordinate { coordinate, label } => Some(ResolvedLocation {
                coordinate: *coordinate,
                precision: Precision::Exact,
                label: label.clone(),
            }),
            _ => None,
        }
    }

    /// Resolves on behalf of one widget with last-write-wins semantics.
    pub async fn resolve_latest(&self, guard: &SequenceGuard, query: &LocationQuery) -> Resolution {
        let token = guard.issue();
        let resolved = self.resolve(query).await;

        if guard.is_current(token) {
            Resolution::Current { resolved, token }
        } else {
            debug!(?token, "Discarding stale resolution");
            metrics::map::resolution_discarded();
            Resolution::Stale
        }
    }
}
