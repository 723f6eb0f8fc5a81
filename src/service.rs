//! The yearly analysis pipeline.
//!
//! Load → aggregate queries → per-correspondent post-processing → assemble.
//! The store is closed on every path, success or failure.

use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::correspondent::{profile_all, DEFAULT_TOP_K};
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::PeriodKind;
use crate::nlp::NlpProcessor;
use crate::queries::{
    latest_self_sent_year, AggregateQueries, DEFAULT_TOP_SENDERS_LIMIT, DEFAULT_UNBALANCED_MIN_SENT,
};
use crate::report::{assemble, ResultRecord};
use crate::store::MessageStore;
use crate::timestamp::TimeBasis;
use crate::validation::InputValidator;

/// Knobs for one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Target year; `None` picks the latest year with self-sent messages
    pub year: Option<i32>,
    /// Histogram bucketing
    pub period: PeriodKind,
    /// Timezone used to turn stored instants into calendar dates
    pub time_basis: TimeBasis,
    /// Words and emoji kept per top friend
    pub top_k: usize,
    /// Rows in the top senders list
    pub top_senders: usize,
    /// Self-sent messages a correspondent needs before it can be the unbalanced friend
    pub unbalanced_min_sent: u32,
    /// Words ignored on top of the English stop-word list
    pub extra_stop_words: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            year: None,
            period: PeriodKind::Month,
            time_basis: TimeBasis::Local,
            top_k: DEFAULT_TOP_K,
            top_senders: DEFAULT_TOP_SENDERS_LIMIT,
            unbalanced_min_sent: DEFAULT_UNBALANCED_MIN_SENT,
            extra_stop_words: Vec::new(),
        }
    }
}

impl From<&AppConfig> for AnalysisOptions {
    fn from(config: &AppConfig) -> Self {
        let analysis = &config.analysis;
        Self {
            year: analysis.year,
            period: analysis.period,
            time_basis: analysis.time_basis,
            top_k: analysis.top_k,
            top_senders: analysis.top_senders,
            unbalanced_min_sent: analysis.unbalanced_min_sent,
            extra_stop_words: analysis.extra_stop_words.clone(),
        }
    }
}

/// Runs the pipeline with fixed options
#[derive(Debug, Clone)]
pub struct WrappedService {
    options: AnalysisOptions,
    processor: NlpProcessor,
}

impl WrappedService {
    /// Validate `options` and build the tokenizer they describe.
    pub fn new(options: AnalysisOptions) -> Result<Self> {
        InputValidator::validate_limit("top_k", options.top_k, crate::config::MAX_TOP_K)?;
        InputValidator::validate_limit("top_senders", options.top_senders, crate::config::MAX_TOP_SENDERS)?;
        if let Some(year) = options.year {
            InputValidator::validate_year(year)?;
        }
        let processor = NlpProcessor::with_extra_stop_words(&options.extra_stop_words)?;
        Ok(Self { options, processor })
    }

    /// Options this service was built with
    #[must_use]
    pub const fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Year the analysis targets for this store.
    pub fn resolve_year(&self, store: &MessageStore) -> Result<i32> {
        if let Some(year) = self.options.year {
            return Ok(year);
        }
        let year = match latest_self_sent_year(store, self.options.time_basis)? {
            Some(year) => year,
            None => {
                let current = chrono::Local::now().year();
                warn!(year = current, "No self-sent messages; defaulting to the current year");
                current
            }
        };
        InputValidator::validate_year(year)?;
        Ok(year)
    }

    /// Run every query against an already loaded store.
    pub fn analyze_store(&self, store: &MessageStore) -> Result<ResultRecord> {
        store.check_schema()?;
        let year = self.resolve_year(store)?;
        info!(year, period = ?self.options.period, "Analyzing messages");

        let queries = AggregateQueries::new(store, year, self.options.time_basis);
        let summary = queries.summary()?;
        let top_senders = queries.top_senders(self.options.top_senders)?;
        let histogram = queries.period_histogram(self.options.period)?;
        let top_friends = queries.top_friends()?;

        let ids: Vec<String> = top_friends.iter().map(|friend| friend.id.clone()).collect();
        let rankings = profile_all(store, &self.processor, &ids, self.options.top_k)?;

        let unbalanced = queries.unbalanced_friend(self.options.unbalanced_min_sent)?;
        debug!(found = unbalanced.is_some(), "Unbalanced friend");

        Ok(assemble(
            year,
            summary,
            top_senders,
            histogram,
            top_friends,
            &rankings.words,
            &rankings.emojis,
            unbalanced,
        ))
    }

    /// Load a database image, analyze it, and close it.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<ResultRecord> {
        self.run_pipeline(|| MessageStore::load(bytes))
    }

    /// Execute a SQL dump, analyze the result, and close it.
    pub fn analyze_script(&self, script: &str) -> Result<ResultRecord> {
        self.run_pipeline(|| MessageStore::load_from_script(script))
    }

    fn run_pipeline(&self, load: impl FnOnce() -> Result<MessageStore>) -> Result<ResultRecord> {
        let timer = OperationTimer::new("pipeline");
        let result = load().and_then(|mut store| {
            let analysis = self.analyze_store(&store);
            let closed = store.close();
            let record = analysis?;
            closed?;
            Ok(record)
        });
        metrics::record_pipeline_run(result.is_ok());
        timer.finish(result.is_ok());
        result
    }

    /// [`WrappedService::analyze_bytes`] on the blocking thread pool.
    pub async fn analyze_bytes_async(self: Arc<Self>, bytes: Vec<u8>) -> Result<ResultRecord> {
        tokio::task::spawn_blocking(move || self.analyze_bytes(&bytes)).await?
    }

    /// [`WrappedService::analyze_script`] on the blocking thread pool.
    pub async fn analyze_script_async(self: Arc<Self>, script: String) -> Result<ResultRecord> {
        tokio::task::spawn_blocking(move || self.analyze_script(&script)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WrappedError;

    const SCRIPT: &str = "
        CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT);
        CREATE TABLE message (ROWID INTEGER PRIMARY KEY, handle_id INTEGER, text TEXT, date INTEGER, is_from_me INTEGER);
        INSERT INTO handle VALUES (1, '+15550001111');
        -- 2023-03-15 12:00:00 UTC
        INSERT INTO message VALUES (1, 1, 'pizza night 🍕', 700574400000000000, 1);
        INSERT INTO message VALUES (2, 1, 'pizza again', 700574400000000000, 0);
    ";

    fn utc_options() -> AnalysisOptions {
        AnalysisOptions {
            time_basis: TimeBasis::Utc,
            ..AnalysisOptions::default()
        }
    }

    #[test]
    fn test_latest_year_is_default() {
        let service = WrappedService::new(utc_options()).expect("service");
        let record = service.analyze_script(SCRIPT).expect("analysis");
        assert_eq!(record.year, 2023);
        assert_eq!(record.text_sent_summary.total_texts_sent, 1);
        assert_eq!(record.period_counts.get("March"), Some(1));
    }

    #[test]
    fn test_rejects_invalid_options() {
        let options = AnalysisOptions {
            top_k: 0,
            ..utc_options()
        };
        assert!(matches!(WrappedService::new(options), Err(WrappedError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_tables_fail_before_queries() {
        let service = WrappedService::new(utc_options()).expect("service");
        let result = service.analyze_script("CREATE TABLE other (x INTEGER);");
        assert!(matches!(result, Err(WrappedError::Query(_))));
    }
}
