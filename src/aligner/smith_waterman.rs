// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Local alignment with affine gap costs against a directed acyclic graph of sequences.
//!
//! Every node keeps its own H (best), E (deletion) and F (insertion) matrices with one
//! column per node base and one row per query base (plus the empty prefix). The column
//! preceding the first base of a node is the cell-wise maximum of the last columns of
//! all its predecessors.

use anyhow::{anyhow, Result};

use crate::aligner::{push_op, AlignmentBackend, CigarOp, NodeCigar};
use crate::config::ScoringParams;
use crate::errors::Error;

const NEG: i32 = i32::MIN / 2;

#[derive(Debug, Default)]
struct DpNode {
    sequence: Vec<u8>,
    preds: Vec<usize>,
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

/// A matrix cell: node, column (node base) and row (number of query bases consumed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    node: usize,
    col: usize,
    row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Best,
    Deletion,
    Insertion,
}

#[derive(Debug)]
struct Segment {
    node: usize,
    offset: usize,
    // in reverse
    ops: Vec<CigarOp>,
}

/// Plain graph Smith-Waterman-Gotoh alignment backend.
#[derive(Debug, Default)]
pub struct SmithWaterman {
    nodes: Vec<DpNode>,
    query: Option<Vec<u8>>,
}

fn is_match(a: u8, b: u8) -> bool {
    let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
    a == b && a != b'N'
}

fn substitution(a: u8, b: u8, scoring: &ScoringParams) -> i32 {
    if is_match(a, b) {
        scoring.match_score()
    } else {
        -scoring.mismatch()
    }
}

impl SmithWaterman {
    pub fn new() -> Self {
        SmithWaterman::default()
    }

    fn rows(&self) -> usize {
        self.query.as_ref().map_or(1, |query| query.len() + 1)
    }

    fn check_handle(&self, handle: usize) -> Result<()> {
        if handle >= self.nodes.len() {
            return Err(Error::UnknownBackendNode {
                handle: handle.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn h(&self, cell: Cell) -> i32 {
        self.nodes[cell.node].h[cell.col * self.rows() + cell.row]
    }

    fn e(&self, cell: Cell) -> i32 {
        self.nodes[cell.node].e[cell.col * self.rows() + cell.row]
    }

    fn f(&self, cell: Cell) -> i32 {
        self.nodes[cell.node].f[cell.col * self.rows() + cell.row]
    }

    /// Columns directly preceding column `col` of `node`, in the given row.
    fn predecessors(&self, node: usize, col: usize, row: usize) -> Vec<Cell> {
        if col > 0 {
            vec![Cell {
                node,
                col: col - 1,
                row,
            }]
        } else {
            self.nodes[node]
                .preds
                .iter()
                .map(|pred| Cell {
                    node: *pred,
                    col: self.nodes[*pred].sequence.len() - 1,
                    row,
                })
                .collect()
        }
    }

    /// H and E of the virtual column before the first base of `node`.
    fn entry_column(&self, node: usize, rows: usize) -> (Vec<i32>, Vec<i32>) {
        let mut h = vec![0; rows];
        let mut e = vec![NEG; rows];
        let preds = &self.nodes[node].preds;
        if !preds.is_empty() {
            h.iter_mut().for_each(|v| *v = NEG);
            for pred in preds {
                let pred = &self.nodes[*pred];
                let last = (pred.sequence.len() - 1) * rows;
                for row in 0..rows {
                    h[row] = h[row].max(pred.h[last + row]);
                    e[row] = e[row].max(pred.e[last + row]);
                }
            }
        }
        (h, e)
    }

    fn best_cell(&self) -> Option<Cell> {
        let rows = self.rows();
        let mut best = None;
        let mut best_score = 0;
        for (node, dp) in self.nodes.iter().enumerate() {
            for col in 0..dp.sequence.len() {
                for row in 1..rows {
                    let score = dp.h[col * rows + row];
                    if score > best_score {
                        best_score = score;
                        best = Some(Cell { node, col, row });
                    }
                }
            }
        }
        best
    }
}

impl AlignmentBackend for SmithWaterman {
    type Handle = usize;

    fn build_node(&mut self, sequence: &[u8]) -> Result<usize> {
        if sequence.is_empty() {
            return Err(Error::EmptyBackendNode.into());
        }
        self.nodes.push(DpNode {
            sequence: sequence.to_vec(),
            ..Default::default()
        });
        self.query = None;
        Ok(self.nodes.len() - 1)
    }

    fn add_edge(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_handle(from)?;
        self.check_handle(to)?;
        if from >= to {
            return Err(Error::BackendEdgeOrder { from, to }.into());
        }
        let preds = &mut self.nodes[to].preds;
        if let Err(idx) = preds.binary_search(&from) {
            preds.insert(idx, from);
        }
        self.query = None;
        Ok(())
    }

    fn fill(&mut self, query: &[u8], scoring: &ScoringParams) -> Result<()> {
        let rows = query.len() + 1;
        let (gap_open, gap_extend) = (scoring.gap_open(), scoring.gap_extend());

        for node in 0..self.nodes.len() {
            let (mut prev_h, mut prev_e) = self.entry_column(node, rows);
            let dp = &mut self.nodes[node];
            let cells = dp.sequence.len() * rows;
            dp.h = vec![0; cells];
            dp.e = vec![NEG; cells];
            dp.f = vec![NEG; cells];

            for col in 0..dp.sequence.len() {
                let base = dp.sequence[col];
                let offset = col * rows;
                for row in 1..rows {
                    let idx = offset + row;
                    let e = (prev_h[row] - gap_open).max(prev_e[row] - gap_extend);
                    let f = (dp.h[idx - 1] - gap_open).max(dp.f[idx - 1] - gap_extend);
                    let diag = prev_h[row - 1] + substitution(base, query[row - 1], scoring);
                    dp.e[idx] = e;
                    dp.f[idx] = f;
                    dp.h[idx] = diag.max(e).max(f).max(0);
                }
                prev_h = dp.h[offset..offset + rows].to_vec();
                prev_e = dp.e[offset..offset + rows].to_vec();
            }
        }
        self.query = Some(query.to_vec());

        Ok(())
    }

    fn traceback(
        &mut self,
        query: &[u8],
        scoring: &ScoringParams,
    ) -> Result<Vec<NodeCigar<usize>>> {
        if self.query.as_deref() != Some(query) {
            return Err(Error::TracebackWithoutFill.into());
        }
        let end = match self.best_cell() {
            Some(cell) => cell,
            None => return Ok(Vec::new()),
        };
        let inconsistent = || anyhow!("inconsistent alignment matrices at {:?}", end);
        let (gap_open, gap_extend) = (scoring.gap_open(), scoring.gap_extend());

        let mut cell = end;
        let mut state = State::Best;
        let mut segments = vec![Segment {
            node: cell.node,
            offset: cell.col,
            ops: Vec::new(),
        }];
        let record = |segments: &mut Vec<Segment>, cell: Cell, op: CigarOp| {
            if let Some(segment) = segments.last_mut() {
                if segment.node != cell.node {
                    segments.push(Segment {
                        node: cell.node,
                        offset: cell.col,
                        ops: vec![op],
                    });
                    return;
                }
                if op.consumes_reference() {
                    segment.offset = cell.col;
                }
                segment.ops.push(op);
            }
        };

        let query_start = loop {
            match state {
                State::Best => {
                    let value = self.h(cell);
                    let base = self.nodes[cell.node].sequence[cell.col];
                    let read_base = query[cell.row - 1];
                    let diag_preds = self.predecessors(cell.node, cell.col, cell.row - 1);
                    let prev_best = diag_preds
                        .iter()
                        .map(|pred| self.h(*pred))
                        .max()
                        .unwrap_or(0);
                    if value == prev_best + substitution(base, read_base, scoring) {
                        let op = if is_match(base, read_base) {
                            CigarOp::Match
                        } else {
                            CigarOp::Mismatch
                        };
                        record(&mut segments, cell, op);
                        if prev_best == 0 {
                            break cell.row - 1;
                        }
                        cell = diag_preds
                            .into_iter()
                            .find(|pred| self.h(*pred) == prev_best)
                            .ok_or_else(inconsistent)?;
                    } else if value == self.e(cell) {
                        state = State::Deletion;
                    } else if value == self.f(cell) {
                        state = State::Insertion;
                    } else {
                        return Err(inconsistent());
                    }
                }
                State::Deletion => {
                    record(&mut segments, cell, CigarOp::Deletion);
                    let value = self.e(cell);
                    let (pred, next) = self
                        .predecessors(cell.node, cell.col, cell.row)
                        .into_iter()
                        .find_map(|pred| {
                            if self.h(pred) - gap_open == value {
                                Some((pred, State::Best))
                            } else if self.e(pred) - gap_extend == value {
                                Some((pred, State::Deletion))
                            } else {
                                None
                            }
                        })
                        .ok_or_else(inconsistent)?;
                    cell = pred;
                    state = next;
                }
                State::Insertion => {
                    record(&mut segments, cell, CigarOp::Insertion);
                    let value = self.f(cell);
                    let above = Cell {
                        row: cell.row - 1,
                        ..cell
                    };
                    state = if self.h(above) - gap_open == value {
                        State::Best
                    } else if self.f(above) - gap_extend == value {
                        State::Insertion
                    } else {
                        return Err(inconsistent());
                    };
                    cell = above;
                }
            }
        };

        let segment_count = segments.len();
        let cigars = segments
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, segment)| {
                let mut ops = Vec::new();
                if i == 0 {
                    push_op(&mut ops, CigarOp::SoftClip, query_start as u32);
                }
                for op in segment.ops.into_iter().rev() {
                    push_op(&mut ops, op, 1);
                }
                if i + 1 == segment_count {
                    push_op(&mut ops, CigarOp::SoftClip, (query.len() - end.row) as u32);
                }
                NodeCigar::new(segment.node, segment.offset, ops)
            })
            .collect();

        Ok(cigars)
    }
}
