//! Segment orchestrator - walks one segment's result pages
//!
//! A segment is processed strictly sequentially:
//! - Each results page is fetched and its listing references parsed
//! - Every reference is claimed in the ledger; only new ids are fetched
//! - Detail pages are extracted into records and accumulated in a batch
//! - At the end the batch is staged, its ids committed, then published

use crate::crawler::listing::{ListingReference, ReferenceParser};
use crate::crawler::pacing::Pacing;
use crate::extract::{Extractor, ListingRecord};
use crate::fetcher::Fetcher;
use crate::ledger::ProcessedIdLedger;
use crate::output::{BatchSink, SegmentReport, SegmentStatus};
use crate::partition::SearchSegment;
use crate::state::{SegmentProgress, SegmentState};
use crate::HarvestError;
use std::sync::Arc;

/// Records gathered by a segment and the ids they were claimed under
#[derive(Debug, Default)]
struct Batch {
    records: Vec<ListingRecord>,
    ids: Vec<String>,
}

impl Batch {
    fn push(&mut self, id: String, record: ListingRecord) {
        self.ids.push(id);
        self.records.push(record);
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Drives a single segment from its first results page to a published batch
pub struct SegmentOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    ledger: Arc<ProcessedIdLedger>,
    sink: Arc<dyn BatchSink>,
    references: ReferenceParser,
    pacing: Pacing,
    max_pages: Option<u32>,
}

impl SegmentOrchestrator {
    /// Creates an orchestrator sharing the crawl-wide components
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher used for results and detail pages
    /// * `extractor` - Converts detail pages into records
    /// * `ledger` - Shared ledger of processed listing ids
    /// * `sink` - Destination of the segment batch
    /// * `pacing` - Pauses between items and pages
    /// * `max_pages` - Optional cap on result pages walked per segment
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<Extractor>,
        ledger: Arc<ProcessedIdLedger>,
        sink: Arc<dyn BatchSink>,
        pacing: Pacing,
        max_pages: Option<u32>,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            fetcher,
            extractor,
            ledger,
            sink,
            references: ReferenceParser::new()?,
            pacing,
            max_pages,
        })
    }

    /// Number of result pages this orchestrator walks for `segment`
    pub fn pages_to_scan(&self, segment: &SearchSegment) -> u32 {
        let reachable = segment.reachable_pages();
        match self.max_pages {
            Some(limit) => reachable.min(limit.max(1)),
            None => reachable,
        }
    }

    /// Processes `segment` to completion
    ///
    /// Results pages and detail pages that cannot be fetched are skipped
    /// and logged. Only a failure to persist the batch (or its ids) fails
    /// the segment.
    ///
    /// # Returns
    ///
    /// * `Ok(SegmentReport)` - The segment was walked; its status says
    ///   whether a batch was written
    /// * `Err(HarvestError)` - The batch could not be written or committed
    pub async fn run(&self, segment: &SearchSegment) -> Result<SegmentReport, HarvestError> {
        let mut progress = SegmentProgress::new(segment.index());
        let result = self.scan(segment, &mut progress).await;
        if result.is_err() {
            progress.fail();
        }
        result
    }

    async fn scan(
        &self,
        segment: &SearchSegment,
        progress: &mut SegmentProgress,
    ) -> Result<SegmentReport, HarvestError> {
        let index = segment.index();
        let last_page = self.pages_to_scan(segment);

        tracing::info!(
            "Segment {} ({}): scanning {} page(s)",
            index,
            segment.describe(),
            last_page
        );

        let mut report = SegmentReport {
            index,
            description: segment.describe(),
            pages_scanned: 0,
            references_seen: 0,
            duplicates_skipped: 0,
            items_failed: 0,
            status: SegmentStatus::NoData,
        };
        let mut batch = Batch::default();

        progress.advance(SegmentState::Scanning(1))?;

        for page in 1..=last_page {
            if page > 1 {
                progress.advance(SegmentState::Scanning(page))?;
            }

            let url = segment.page_url(page);
            match self.fetcher.fetch(url.as_str()).await {
                Ok(document) => {
                    report.pages_scanned += 1;
                    let references = self.references.parse(&document, index);
                    report.references_seen += references.len();

                    if references.is_empty() {
                        tracing::info!("Segment {}: page {} lists no offers", index, page);
                    }

                    for reference in references {
                        if !self.ledger.try_claim(&reference.item_id) {
                            tracing::debug!(
                                "Segment {}: listing {} already processed",
                                index,
                                reference.item_id
                            );
                            report.duplicates_skipped += 1;
                            continue;
                        }

                        progress.advance(SegmentState::FetchingItem(page))?;
                        self.pacing.before_item().await;

                        match self.fetch_record(&reference).await {
                            Some(record) => batch.push(reference.item_id, record),
                            None => report.items_failed += 1,
                        }

                        progress.advance(SegmentState::Scanning(page))?;
                    }

                    tracing::info!(
                        "Segment {}: page {}/{} done, {} new listing(s) so far",
                        index,
                        page,
                        last_page,
                        batch.records.len()
                    );
                }
                Err(e) => {
                    tracing::warn!("Segment {}: skipping results page {}: {}", index, page, e);
                }
            }

            if page < last_page {
                self.pacing.after_page().await;
            }
        }

        progress.advance(SegmentState::Flushing)?;
        report.status = self.flush(index, batch)?;
        progress.advance(SegmentState::Done)?;

        match &report.status {
            SegmentStatus::Completed { records, file } => tracing::info!(
                "Segment {}: wrote {} record(s) to {}",
                index,
                records,
                file.display()
            ),
            _ => tracing::info!("Segment {}: no data", index),
        }

        Ok(report)
    }

    /// Fetches and extracts one claimed listing
    ///
    /// On failure the claim is released so a later run can retry the id.
    async fn fetch_record(&self, reference: &ListingReference) -> Option<ListingRecord> {
        match self.fetcher.fetch(&reference.detail_url).await {
            Ok(document) => {
                let mut record = self.extractor.extract(&document);
                if record.advert.item_id.is_empty() {
                    record.advert.item_id = reference.item_id.clone();
                }
                tracing::debug!(
                    "Segment {}: extracted listing {} ({} field(s))",
                    reference.segment,
                    reference.item_id,
                    record.filled_fields()
                );
                Some(record)
            }
            Err(e) => {
                self.ledger.release(&reference.item_id);
                tracing::warn!(
                    "Segment {}: dropping listing {}: {}",
                    reference.segment,
                    reference.item_id,
                    e
                );
                None
            }
        }
    }

    /// Writes the batch as one unit and commits its ids
    ///
    /// The batch is staged first, the ids are committed, and only then is
    /// the file published. A failed commit discards the staged file.
    fn flush(&self, segment: usize, batch: Batch) -> Result<SegmentStatus, HarvestError> {
        if batch.is_empty() {
            return Ok(SegmentStatus::NoData);
        }

        let staged = self.sink.stage(segment, &batch.records)?;

        if let Err(source) = self.ledger.commit(&batch.ids) {
            self.sink.discard(staged);
            return Err(HarvestError::LedgerCommit { segment, source });
        }

        let file = self.sink.publish(staged)?;
        Ok(SegmentStatus::Completed {
            records: batch.records.len(),
            file,
        })
    }
}
