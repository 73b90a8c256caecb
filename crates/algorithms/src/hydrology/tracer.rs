//! Memoized downstream path tracing over a D8 direction grid
//!
//! Every D8 grid is an implicit forest: each cell has at most one downstream
//! neighbor. Walking from every cell to its outlet independently costs
//! O(N * path length). The [`TraceContext`] instead keeps a per-cell
//! [`VisitState`] for the whole pass:
//!
//! 1. [`TraceContext::trace`] walks downstream from an unresolved cell,
//!    marks every visited cell `InProgress` and pushes it on an explicit stack,
//!    until the walk reaches a sink, a caller-defined barrier, or a cell that an
//!    earlier trace already resolved.
//! 2. [`TraceContext::unwind`] pops the stack from the most downstream cell
//!    back to the start and lets the caller compute each cell's value from the
//!    value below it.
//!
//! A resolved cell short-circuits every later walk, so each cell is resolved
//! exactly once per pass and the whole sweep is linear in the cell count.
//! The walk is iterative: chains can be as long as the grid itself.

use hydrotrace_core::raster::{CellIndex, RasterMetadata};
use hydrotrace_core::{Error, Result};

use super::d8::{self, Downstream};

/// Per-cell visitation state during one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisitState<T> {
    Unresolved,
    /// On the stack of the running trace
    InProgress,
    Resolved(T),
}

/// One link of a traced path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydroCell {
    pub index: CellIndex,
    /// Physical length of the step to the downstream neighbor.
    /// 0 for an outlet, which has none.
    pub step_distance: f64,
}

/// How a trace ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Terminus<T> {
    /// The most downstream cell of the path has no downstream neighbor, or
    /// flows into a no-data cell. It is a new outlet.
    Outlet,
    /// The path flows into `index`, which the caller excluded from tracing.
    Barrier { index: CellIndex },
    /// The path merges into `index`, resolved by an earlier trace.
    Joined { index: CellIndex, value: T },
}

/// What lies below a cell being unwound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link<T> {
    /// The cell is the most downstream one of the path
    Terminal(Terminus<T>),
    /// Value just resolved for the cell immediately downstream
    Downstream(T),
}

/// Tracing state for one full-grid pass.
///
/// Owns the visit states and the path stack; borrows the direction codes.
/// A context is built per invocation and dropped with it.
pub struct TraceContext<'a, T> {
    codes: &'a [f32],
    n_cols: usize,
    n_rows: usize,
    step_lengths: [f64; 8],
    states: Vec<VisitState<T>>,
    path: Vec<HydroCell>,
    resolve_count: usize,
}

impl<'a, T: Copy> TraceContext<'a, T> {
    /// Context over row-major `codes` described by `metadata`.
    pub fn new(codes: &'a [f32], metadata: &RasterMetadata) -> Result<Self> {
        if codes.len() != metadata.len() {
            return Err(Error::InvalidDimensions {
                cols: metadata.n_cols,
                rows: metadata.n_rows,
                len: codes.len(),
            });
        }

        Ok(Self {
            codes,
            n_cols: metadata.n_cols,
            n_rows: metadata.n_rows,
            step_lengths: d8::step_lengths(metadata),
            states: vec![VisitState::Unresolved; codes.len()],
            path: Vec::new(),
            resolve_count: 0,
        })
    }

    pub fn state(&self, index: CellIndex) -> VisitState<T> {
        self.states[index]
    }

    pub fn is_unresolved(&self, index: CellIndex) -> bool {
        matches!(self.states[index], VisitState::Unresolved)
    }

    /// Value of a resolved cell
    pub fn resolved(&self, index: CellIndex) -> Option<T> {
        match self.states[index] {
            VisitState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Number of cells resolved by [`unwind`](Self::unwind) so far
    pub fn resolve_count(&self) -> usize {
        self.resolve_count
    }

    /// Resolve a cell without tracing it (no-data or excluded cells).
    ///
    /// Not counted as a resolve event. Already resolved cells keep their value.
    pub fn pre_resolve(&mut self, index: CellIndex, value: T) {
        if self.is_unresolved(index) {
            self.states[index] = VisitState::Resolved(value);
        }
    }

    /// Walk downstream from `start` and stack every newly visited cell.
    ///
    /// `barrier` marks cells that stop the walk without being visited. The
    /// stacked path is consumed by [`unwind`](Self::unwind), which must be
    /// called before the next trace.
    ///
    /// A start cell that is already resolved yields `Joined` on itself with an
    /// empty path. Reaching a cell already on the current path means the
    /// direction grid contains a cycle: the path is rolled back to
    /// `Unresolved` and [`Error::FlowCycle`] is returned.
    pub fn trace<B>(&mut self, start: CellIndex, barrier: B) -> Result<Terminus<T>>
    where
        B: Fn(CellIndex) -> bool,
    {
        debug_assert!(self.path.is_empty(), "previous trace was not unwound");

        match self.states[start] {
            VisitState::Resolved(value) => {
                return Ok(Terminus::Joined { index: start, value });
            }
            VisitState::InProgress => return Err(self.cycle_at(start)),
            VisitState::Unresolved => {}
        }
        if self.codes[start].is_nan() {
            return Err(Error::Algorithm(format!(
                "cannot trace from no-data cell {}",
                start
            )));
        }

        let mut current = start;
        loop {
            self.states[current] = VisitState::InProgress;

            let (next, direction) = match d8::decode(self.codes, self.n_cols, self.n_rows, current) {
                Downstream::Flows { index, direction } => (index, direction),
                // NoData cannot happen here: no-data neighbors end the walk below
                Downstream::Sink | Downstream::NoData => {
                    self.path.push(HydroCell {
                        index: current,
                        step_distance: 0.0,
                    });
                    return Ok(Terminus::Outlet);
                }
            };

            if barrier(next) {
                self.path.push(HydroCell {
                    index: current,
                    step_distance: self.step_lengths[direction.code() as usize - 1],
                });
                return Ok(Terminus::Barrier { index: next });
            }

            if self.codes[next].is_nan() {
                self.path.push(HydroCell {
                    index: current,
                    step_distance: 0.0,
                });
                return Ok(Terminus::Outlet);
            }

            self.path.push(HydroCell {
                index: current,
                step_distance: self.step_lengths[direction.code() as usize - 1],
            });

            match self.states[next] {
                VisitState::Resolved(value) => {
                    return Ok(Terminus::Joined { index: next, value });
                }
                VisitState::InProgress => {
                    let err = self.cycle_at(next);
                    self.rollback();
                    return Err(err);
                }
                VisitState::Unresolved => current = next,
            }
        }
    }

    /// Resolve the stacked path, most downstream cell first.
    ///
    /// `resolve` receives each cell and what lies below it and returns the
    /// cell's final value.
    pub fn unwind<F>(&mut self, terminus: Terminus<T>, mut resolve: F)
    where
        F: FnMut(&HydroCell, Link<T>) -> T,
    {
        let mut link = Link::Terminal(terminus);
        while let Some(cell) = self.path.pop() {
            debug_assert!(matches!(self.states[cell.index], VisitState::InProgress));
            let value = resolve(&cell, link);
            self.states[cell.index] = VisitState::Resolved(value);
            self.resolve_count += 1;
            link = Link::Downstream(value);
        }
    }

    /// [`trace`](Self::trace) then [`unwind`](Self::unwind)
    pub fn resolve_from<B, F>(&mut self, start: CellIndex, barrier: B, resolve: F) -> Result<Terminus<T>>
    where
        B: Fn(CellIndex) -> bool,
        F: FnMut(&HydroCell, Link<T>) -> T,
    {
        let terminus = self.trace(start, barrier)?;
        self.unwind(terminus, resolve);
        Ok(terminus)
    }

    fn rollback(&mut self) {
        for cell in self.path.drain(..) {
            self.states[cell.index] = VisitState::Unresolved;
        }
    }

    fn cycle_at(&self, index: CellIndex) -> Error {
        Error::FlowCycle {
            row: index / self.n_cols,
            col: index % self.n_cols,
        }
    }
}
