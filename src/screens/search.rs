use tracing::{error, info};

use crate::i18n::Text;
use crate::models::Listing;
use crate::screens::{AppContext, Outcome};

pub struct SearchScreen {
    ctx: AppContext,
    term: String,
    results: Vec<Listing>,
    loading: bool,
}

impl SearchScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            term: String::new(),
            results: Vec::new(),
            loading: false,
        }
    }

    /// Shows every available listing until a term is submitted.
    pub async fn mount(&mut self) -> Outcome {
        self.submit("").await
    }

    pub async fn submit(&mut self, term: &str) -> Outcome {
        self.term = term.trim().to_string();
        self.loading = true;
        let listings = &self.ctx.backend.listings;
        let result = if self.term.is_empty() {
            listings.available(None).await
        } else {
            listings.search(&self.term).await
        };
        self.loading = false;

        match result {
            Ok(rows) => {
                info!(term = %self.term, count = rows.len(), "Search finished");
                self.results = rows;
            }
            Err(err) => {
                error!(term = %self.term, error = %err, "Error searching products");
                self.ctx.notifier.error(Text::SearchFailed, err.to_string());
            }
        }
        Outcome::Stay
    }

    pub fn results(&self) -> &[Listing] {
        &self.results
    }

    /// Localized "no results" line when the last search came back empty
    pub fn empty_message(&self) -> Option<&'static str> {
        (!self.loading && self.results.is_empty()).then(|| Text::NoResults.get(self.ctx.locale()))
    }
}
