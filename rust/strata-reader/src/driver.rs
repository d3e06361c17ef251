//! Runs a page source through a chain of operators.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use strata_block::page::Page;
use strata_common::{Result, error::Error};

use crate::operator::Operator;

/// A cooperative cancellation flag shared between a driver and whoever may
/// cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOutcome {
    Finished,
    Cancelled,
}

pub type PageSource = Box<dyn Iterator<Item = Result<Page>> + Send>;
pub type PageSink = Box<dyn FnMut(Page) -> Result<()> + Send>;

/// Moves pages from a source through the operators into a sink, one page at
/// a time. Cancellation is checked between steps, never inside an operator
/// call.
pub struct Driver {
    source: PageSource,
    source_done: bool,
    operators: Vec<Box<dyn Operator>>,
    finishing: Vec<bool>,
    sink: PageSink,
    cancellation: CancellationToken,
}

impl Driver {
    pub fn new(
        source: PageSource,
        operators: Vec<Box<dyn Operator>>,
        sink: PageSink,
        cancellation: CancellationToken,
    ) -> Driver {
        let finishing = vec![false; operators.len()];
        Driver {
            source,
            source_done: false,
            operators,
            finishing,
            sink,
            cancellation,
        }
    }

    pub fn operators(&self) -> &[Box<dyn Operator>] {
        &self.operators
    }

    /// Runs until the last operator finished or the token is cancelled.
    /// Operators are closed on every exit path.
    pub fn run(&mut self) -> Result<DriverOutcome> {
        let result = self.run_inner();
        for op in self.operators.iter_mut() {
            op.close();
        }
        if let Err(e) = &result {
            log::warn!("driver failed: {e}");
        }
        result
    }

    fn run_inner(&mut self) -> Result<DriverOutcome> {
        loop {
            if self.cancellation.is_cancelled() {
                log::debug!("driver cancelled");
                return Ok(DriverOutcome::Cancelled);
            }
            if self.is_finished() {
                return Ok(DriverOutcome::Finished);
            }
            if !self.step()? {
                return Err(Error::invalid_operation("driver made no progress"));
            }
        }
    }

    fn is_finished(&self) -> bool {
        match self.operators.last() {
            Some(op) => op.is_finished(),
            None => self.source_done,
        }
    }

    /// Moves at most one page across each edge. Returns `false` if nothing
    /// moved.
    fn step(&mut self) -> Result<bool> {
        let mut moved = false;
        if !self.source_done && self.operators.first().is_none_or(|op| op.needs_input()) {
            match self.source.next() {
                Some(page) => {
                    let page = page?;
                    match self.operators.first_mut() {
                        Some(op) => op.add_input(page)?,
                        None => (self.sink)(page)?,
                    }
                }
                None => {
                    self.source_done = true;
                    self.finish_operator(0);
                }
            }
            moved = true;
        }

        for i in 0..self.operators.len() {
            if i + 1 < self.operators.len() && !self.operators[i + 1].needs_input() {
                continue;
            }
            if let Some(page) = self.operators[i].get_output()? {
                match self.operators.get_mut(i + 1) {
                    Some(next) => next.add_input(page)?,
                    None => (self.sink)(page)?,
                }
                moved = true;
            } else if self.operators[i].is_finished()
                && self.finishing.get(i + 1).is_some_and(|finishing| !finishing)
            {
                self.finish_operator(i + 1);
                moved = true;
            }
        }
        Ok(moved)
    }

    fn finish_operator(&mut self, index: usize) {
        if let Some(op) = self.operators.get_mut(index) {
            if !self.finishing[index] {
                self.finishing[index] = true;
                op.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_block::block::Block;

    /// Appends a block holding the position index.
    struct Numbering {
        pending: Option<Page>,
        finished: bool,
    }

    impl Operator for Numbering {
        fn name(&self) -> &str {
            "Numbering"
        }

        fn needs_input(&self) -> bool {
            self.pending.is_none() && !self.finished
        }

        fn add_input(&mut self, page: Page) -> Result<()> {
            let n = page.position_count();
            self.pending = Some(page.append_blocks([Block::from_longs((0..n as i64).collect())]));
            Ok(())
        }

        fn get_output(&mut self) -> Result<Option<Page>> {
            Ok(self.pending.take())
        }

        fn finish(&mut self) {
            self.finished = true;
        }

        fn is_finished(&self) -> bool {
            self.finished && self.pending.is_none()
        }
    }

    fn pages(n: usize) -> PageSource {
        Box::new((0..n).map(|i| Ok(Page::new(vec![Block::from_ints(vec![i as i32; i + 1])]))))
    }

    fn collect_into(out: Arc<std::sync::Mutex<Vec<Page>>>) -> PageSink {
        Box::new(move |page| {
            out.lock().unwrap().push(page);
            Ok(())
        })
    }

    #[test]
    fn test_runs_pages_through_chain() {
        let out = Arc::new(std::sync::Mutex::new(Vec::new()));
        let operators: Vec<Box<dyn Operator>> = vec![
            Box::new(Numbering { pending: None, finished: false }),
            Box::new(Numbering { pending: None, finished: false }),
        ];
        let mut driver = Driver::new(pages(3), operators, collect_into(out.clone()), CancellationToken::new());
        assert_eq!(driver.run().unwrap(), DriverOutcome::Finished);
        let out = out.lock().unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].block_count(), 3);
        assert_eq!(out[2].block(2), &Block::from_longs(vec![0, 1, 2]));
    }

    #[test]
    fn test_cancelled_before_start() {
        let out = Arc::new(std::sync::Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        token.cancel();
        let operators: Vec<Box<dyn Operator>> =
            vec![Box::new(Numbering { pending: None, finished: false })];
        let mut driver = Driver::new(pages(3), operators, collect_into(out.clone()), token);
        assert_eq!(driver.run().unwrap(), DriverOutcome::Cancelled);
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    fn test_source_error_propagates() {
        let source: PageSource = Box::new(std::iter::once(Err(Error::invalid_format("segment"))));
        let operators: Vec<Box<dyn Operator>> =
            vec![Box::new(Numbering { pending: None, finished: false })];
        let mut driver = Driver::new(
            source,
            operators,
            Box::new(|_| Ok(())),
            CancellationToken::new(),
        );
        assert!(driver.run().is_err());
    }
}
