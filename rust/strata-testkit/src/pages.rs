//! Pages of document references over a [`Corpus`].

use strata_block::{block::Block, doc::DocVector, page::Page};

use crate::corpus::Corpus;

/// A single-block page referencing `refs` in the given order.
pub fn doc_page(refs: &[(u32, u32, u32)]) -> Page {
    let mut docs = DocVector::default();
    for &(shard, segment, doc) in refs {
        docs.push(shard, segment, doc);
    }
    Page::new(vec![Block::from_docs(docs)])
}

/// The corpus in natural order, cut into pages of `page_size` documents.
/// Pages cross segment and shard boundaries.
pub fn doc_pages(corpus: &Corpus, page_size: usize) -> Vec<Page> {
    corpus
        .doc_refs()
        .chunks(page_size.max(1))
        .map(doc_page)
        .collect()
}

/// The corpus in natural order, cut at random sizes in `1..=max_page_size`.
pub fn random_doc_pages(corpus: &Corpus, max_page_size: usize, rng: &mut fastrand::Rng) -> Vec<Page> {
    let refs = corpus.doc_refs();
    let mut pages = Vec::new();
    let mut start = 0;
    while start < refs.len() {
        let end = (start + rng.usize(1..=max_page_size.max(1))).min(refs.len());
        pages.push(doc_page(&refs[start..end]));
        start = end;
    }
    pages
}

/// The document references of the page's first block.
///
/// # Panics
///
/// Panics if the first block is not a doc block.
pub fn page_refs(page: &Page) -> Vec<(u32, u32, u32)> {
    let docs = page
        .block(0)
        .as_doc_vector()
        .expect("first block is not a doc block");
    (0..docs.len())
        .map(|i| (docs.shard(i), docs.segment(i), docs.doc(i)))
        .collect()
}

/// Concatenates the doc blocks of `pages` into one page.
pub fn merge_pages(pages: &[Page]) -> Page {
    let refs = pages.iter().flat_map(page_refs).collect::<Vec<_>>();
    doc_page(&refs)
}

/// A random permutation of the page's positions.
pub fn shuffle_page(page: &Page, rng: &mut fastrand::Rng) -> Page {
    let mut positions = (0..page.position_count()).collect::<Vec<_>>();
    rng.shuffle(&mut positions);
    page.filter(&positions)
}

/// A random subset of the corpus, each document kept with probability
/// `ratio`, in natural order.
pub fn random_subset(corpus: &Corpus, ratio: f64, rng: &mut fastrand::Rng) -> Page {
    let refs = corpus
        .doc_refs()
        .into_iter()
        .filter(|_| rng.f64() < ratio)
        .collect::<Vec<_>>();
    doc_page(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusConfig;

    fn corpus() -> Corpus {
        Corpus::build(&CorpusConfig {
            docs_per_index: 20,
            commit_every: 7,
        })
        .unwrap()
    }

    #[test]
    fn test_doc_pages_cover_corpus() {
        let corpus = corpus();
        let pages = doc_pages(&corpus, 9);
        assert_eq!(pages.len(), 5);
        let merged = merge_pages(&pages);
        assert_eq!(page_refs(&merged), corpus.doc_refs());

        let mut rng = fastrand::Rng::with_seed(7);
        let random = random_doc_pages(&corpus, 6, &mut rng);
        assert!(random.iter().all(|p| (1..=6).contains(&p.position_count())));
        assert_eq!(page_refs(&merge_pages(&random)), corpus.doc_refs());
    }

    #[test]
    fn test_shuffle_keeps_refs() {
        let corpus = corpus();
        let page = doc_page(&corpus.doc_refs());
        let mut rng = fastrand::Rng::with_seed(42);
        let shuffled = shuffle_page(&page, &mut rng);
        let mut refs = page_refs(&shuffled);
        refs.sort_unstable();
        assert_eq!(refs, corpus.doc_refs());
    }
}
