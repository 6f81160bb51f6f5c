//! Immutable route context for a tracking session.
//!
//! A [`RouteContext`] is the ordered list of stops a traveler will pass plus
//! the travel time of every consecutive pair. It is produced once by the
//! route planner and never mutated; starting a different route means building
//! a new context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::identifiers::*;
use crate::models::types::{validate_stop, Edge, Result, Stop, TransitError, TravelTime};

/// Ordered stops of a planned journey with their derived edge table.
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone, Debug)]
pub struct RouteContext {
    id: RouteIdentifier,
    stops: Arc<[Stop]>,
    // edges[i] connects stops[i] -> stops[i + 1]
    edges: Arc<[Edge]>,

    // Lookup maps
    stop_index: Arc<HashMap<StopIdentifier, usize>>,
}

impl RouteContext {
    /// Build a route from ordered stops and one travel time per consecutive pair.
    pub fn new(id: impl Into<RouteIdentifier>, stops: Vec<Stop>, travel_times: Vec<TravelTime>) -> Result<Self> {
        let stop_index = index_stops(&stops)?;

        let expected = stops.len() - 1;
        if travel_times.len() != expected {
            return Err(TransitError::EdgeCountMismatch {
                expected,
                actual: travel_times.len(),
            });
        }

        let edges = stops
            .windows(2)
            .zip(travel_times)
            .map(|(pair, travel_time)| Edge::new(pair[0].id.clone(), pair[1].id.clone(), travel_time))
            .collect();

        Ok(Self {
            id: id.into(),
            stops: stops.into(),
            edges,
            stop_index: Arc::new(stop_index),
        })
    }

    /// Build a route from ordered stops and an unordered edge list.
    ///
    /// Every consecutive pair must be covered by exactly one edge. Edges that
    /// do not connect consecutive stops are ignored.
    pub fn from_edges(id: impl Into<RouteIdentifier>, stops: Vec<Stop>, edges: Vec<Edge>) -> Result<Self> {
        let mut by_pair: HashMap<(StopIdentifier, StopIdentifier), TravelTime> = HashMap::new();
        for edge in edges {
            let key = (edge.from.clone(), edge.to.clone());
            if by_pair.insert(key, edge.travel_time).is_some() {
                return Err(TransitError::DuplicateEdge {
                    from: edge.from,
                    to: edge.to,
                });
            }
        }

        let travel_times = stops
            .windows(2)
            .map(|pair| {
                by_pair
                    .get(&(pair[0].id.clone(), pair[1].id.clone()))
                    .copied()
                    .ok_or_else(|| TransitError::MissingEdge {
                        from: pair[0].id.clone(),
                        to: pair[1].id.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(id, stops, travel_times)
    }

    pub fn id(&self) -> &RouteIdentifier {
        &self.id
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always false for a constructed route; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stop(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.stops.len() - 1
    }

    pub fn is_last(&self, index: usize) -> bool {
        index == self.last_index()
    }

    pub fn index_of(&self, id: &StopIdentifier) -> Option<usize> {
        self.stop_index.get(id).copied()
    }

    /// Check that `index` addresses a stop of this route.
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index < self.stops.len() {
            Ok(())
        } else {
            Err(TransitError::IndexOutOfRange {
                index,
                len: self.stops.len(),
            })
        }
    }

    // ---- Edge lookups ----

    /// Edge leaving the stop at `index`, `None` for the last stop.
    pub fn edge_from(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    /// Edge between two stops by identity, only for stops adjacent in route order.
    pub fn edge_between(&self, from: &StopIdentifier, to: &StopIdentifier) -> Result<&Edge> {
        let from_index = self
            .index_of(from)
            .ok_or_else(|| TransitError::StopNotFound(from.clone()))?;
        self.index_of(to)
            .ok_or_else(|| TransitError::StopNotFound(to.clone()))?;

        self.edge_from(from_index)
            .filter(|edge| &edge.to == to)
            .ok_or_else(|| TransitError::MissingEdge {
                from: from.clone(),
                to: to.clone(),
            })
    }

    // ---- Journey times ----

    /// Scheduled time from `from_index` to `to_index` (zero when `to_index <= from_index`).
    pub fn travel_time_between(&self, from_index: usize, to_index: usize) -> Duration {
        let end = to_index.min(self.edges.len());
        if from_index >= end {
            return Duration::ZERO;
        }

        self.edges[from_index..end]
            .iter()
            .map(|edge| edge.travel_time.as_duration())
            .sum()
    }

    pub fn total_travel_time(&self) -> Duration {
        self.travel_time_between(0, self.last_index())
    }

    pub fn remaining_travel_time(&self, from_index: usize) -> Duration {
        self.travel_time_between(from_index, self.last_index())
    }
}

fn index_stops(stops: &[Stop]) -> Result<HashMap<StopIdentifier, usize>> {
    if stops.is_empty() {
        return Err(TransitError::EmptyRoute);
    }

    let mut seen = HashSet::with_capacity(stops.len());
    let mut index = HashMap::with_capacity(stops.len());
    for (i, stop) in stops.iter().enumerate() {
        validate_stop(stop)?;
        if !seen.insert(stop.id.clone()) {
            return Err(TransitError::DuplicateStop(stop.id.clone()));
        }
        index.insert(stop.id.clone(), i);
    }

    Ok(index)
}
