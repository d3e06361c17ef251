use std::sync::{Arc, Mutex};

use strata_block::page::Page;
use strata_common::{Result, error::Error};
use strata_testkit::pages::{doc_page, random_doc_pages};

use super::fixture::{check_page, corpus, operator};
use crate::{
    driver::{CancellationToken, Driver, DriverOutcome, PageSink, PageSource},
    operator::Operator,
};

fn collecting_sink() -> (PageSink, Arc<Mutex<Vec<Page>>>) {
    let pages = Arc::new(Mutex::new(Vec::new()));
    let sink_pages = pages.clone();
    let sink: PageSink = Box::new(move |page| {
        sink_pages.lock().unwrap().push(page);
        Ok(())
    });
    (sink, pages)
}

fn source(pages: Vec<Page>) -> PageSource {
    Box::new(pages.into_iter().map(Ok))
}

#[test]
fn test_driver_reads_corpus() {
    let corpus = corpus();
    let fields = ["key", "mv_kwd", "source_double", "mv_text", "_id"];
    let mut rng = fastrand::Rng::with_seed(3);
    let pages = random_doc_pages(&corpus, 64, &mut rng);
    let page_count = pages.len();

    let (sink, out) = collecting_sink();
    let mut driver = Driver::new(
        source(pages),
        vec![Box::new(operator(&corpus, &fields)) as Box<dyn Operator>],
        sink,
        CancellationToken::new(),
    );
    assert_eq!(driver.run().unwrap(), DriverOutcome::Finished);

    let out = out.lock().unwrap();
    assert_eq!(out.len(), page_count);
    for page in out.iter() {
        check_page(&corpus, page, &fields);
    }
    let status = driver.operators()[0].status().unwrap();
    assert_eq!(status["pages_processed"], serde_json::json!(page_count));
    assert!(status["readers_built"]["_id:row_stride:StoredFields.Id"].is_number());
}

#[test]
fn test_driver_cancellation() {
    let corpus = corpus();
    let token = CancellationToken::new();
    let cancel = token.clone();
    let (sink, out) = collecting_sink();
    // Cancels while the second page is pulled from the source.
    let pages = (0..10u32).map(move |doc| {
        if doc == 1 {
            cancel.cancel();
        }
        Ok::<_, Error>(doc_page(&[(0, 0, doc)]))
    });
    let mut driver = Driver::new(
        Box::new(pages),
        vec![Box::new(operator(&corpus, &["long"])) as Box<dyn Operator>],
        sink,
        token,
    );
    assert_eq!(driver.run().unwrap(), DriverOutcome::Cancelled);
    assert!(out.lock().unwrap().len() < 10);
}

#[test]
fn test_driver_propagates_read_errors() {
    let corpus = corpus();
    let (sink, out) = collecting_sink();
    let pages: Vec<Result<Page>> = vec![
        Ok(doc_page(&[(0, 0, 0)])),
        Ok(doc_page(&[(7, 0, 0)])),
        Err(Error::invalid_operation("unreachable")),
    ];
    let mut driver = Driver::new(
        Box::new(pages.into_iter()),
        vec![Box::new(operator(&corpus, &["long"])) as Box<dyn Operator>],
        sink,
        CancellationToken::new(),
    );
    let err = driver.run().unwrap_err();
    assert!(err.is_configuration_fault());
    assert!(out.lock().unwrap().len() <= 1);
}
