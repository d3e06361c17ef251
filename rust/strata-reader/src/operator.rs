//! The pull-based operator contract.

use strata_block::page::Page;
use strata_common::Result;

/// A stage of a single-threaded pipeline.
///
/// The driver pushes a page with [`add_input`](Operator::add_input) only
/// while [`needs_input`](Operator::needs_input) is true, pulls results with
/// [`get_output`](Operator::get_output), and calls
/// [`finish`](Operator::finish) once no more input will arrive.
pub trait Operator: Send {
    fn name(&self) -> &str;

    fn needs_input(&self) -> bool;

    fn add_input(&mut self, page: Page) -> Result<()>;

    fn get_output(&mut self) -> Result<Option<Page>>;

    fn finish(&mut self);

    /// Returns `true` once the operator got `finish` and has no more output.
    fn is_finished(&self) -> bool;

    /// A machine-readable status snapshot, if the operator keeps one.
    fn status(&self) -> Option<serde_json::Value> {
        None
    }

    /// Releases resources held across pages.
    fn close(&mut self) {}
}
