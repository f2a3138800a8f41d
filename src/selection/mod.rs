pub mod budgeting;
pub mod diversity;
pub mod filters;
pub mod ranking;
pub mod semantic;
pub mod tokens;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, Cache, CacheKey};
use crate::compression::{compress, summarize};
use crate::config::SelectorConfig;
use crate::types::{
    Chunk, ChunkId, ScoredChunk, SelectionError, SelectionMethod, SelectionOptions,
    SelectionResult, SelectionStats,
};
pub use budgeting::{apply_budget, choose_strategy, BudgetResult, BudgetStrategy, StrategyPlan, StrategyTier};
pub use diversity::{select_mmr, MmrParams};
pub use filters::{default_max_candidates, pre_filter, PreFilterOutcome, PreFilterStats};
pub use ranking::{LexicalScorer, Scorer, ScoringError};
pub use semantic::{EmbeddingError, EmbeddingProvider, EmbeddingVector, SemanticScorer};
pub use tokens::{ApproxTokenCounter, TokenCounter};

/// Wires pre-filtering, ranking, budgeting, diversity selection and
/// compression into one call.
///
/// Pipeline: PreFilter -> (SemanticRank) -> Strategize -> MMRSelect ->
/// (EmergencyCompress) -> Done. Only the embedding call performs I/O.
pub struct ContextSelector<T = ApproxTokenCounter> {
    config: SelectorConfig,
    counter: T,
    lexical: LexicalScorer,
    semantic: Option<SemanticScorer>,
    selection_cache: Option<Arc<dyn Cache<SelectionResult>>>,
}

impl Default for ContextSelector<ApproxTokenCounter> {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

impl ContextSelector<ApproxTokenCounter> {
    pub fn new(config: SelectorConfig) -> Self {
        let counter = ApproxTokenCounter::new(config.tokens.chars_per_token);
        Self::with_token_counter(config, counter)
    }
}

impl<T> ContextSelector<T>
where
    T: TokenCounter,
{
    pub fn with_token_counter(config: SelectorConfig, counter: T) -> Self {
        let lexical = LexicalScorer::from_config(&config);
        Self {
            config,
            counter,
            lexical,
            semantic: None,
            selection_cache: None,
        }
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.semantic = Some(SemanticScorer::from_config(provider, &self.config.semantic));
        self
    }

    /// Replace the lexical score cache, e.g. with `NoopCache` in tests.
    pub fn with_score_cache(mut self, cache: Arc<dyn Cache<f32>>) -> Self {
        self.lexical = self.lexical.with_cache(cache);
        self
    }

    pub fn with_selection_cache(mut self, cache: Arc<dyn Cache<SelectionResult>>) -> Self {
        self.selection_cache = Some(cache);
        self
    }

    pub fn with_default_selection_cache(self) -> Self {
        let capacity = self.config.cache.selection_capacity;
        self.with_selection_cache(Arc::new(BoundedCache::new(capacity)))
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn token_counter(&self) -> &T {
        &self.counter
    }

    pub fn lexical_scorer(&self) -> &LexicalScorer {
        &self.lexical
    }

    /// Select the chunks to forward for `question`.
    ///
    /// Only contract violations in `options` are errors. Provider failures,
    /// empty candidate sets and budget overflow all resolve to a result.
    pub async fn select_context<S>(
        &self,
        question: &str,
        chunks: &[S],
        options: &SelectionOptions,
    ) -> Result<SelectionResult, SelectionError>
    where
        S: AsRef<str> + Sync,
    {
        options.validate()?;

        if chunks.is_empty() {
            debug!("no chunks supplied; returning empty selection");
            return Ok(SelectionResult::empty());
        }

        let cache_key = self.selection_cache.as_ref().and_then(|_| {
            let model = self
                .semantic
                .as_ref()
                .filter(|_| options.use_semantic_search)
                .map(|s| s.model_id());
            CacheKey::for_selection(question, chunks, options, model).ok()
        });
        if let (Some(cache), Some(key)) = (&self.selection_cache, &cache_key) {
            if let Some(hit) = cache.get(key) {
                debug!(key = key.as_str(), "selection cache hit");
                return Ok(hit);
            }
        }

        let chunks = Chunk::from_texts(chunks, &self.counter);
        let result = self.run_pipeline(question, chunks, options).await;

        // Degraded results are not worth remembering.
        if result.stats.method != SelectionMethod::LexicalFallback {
            if let (Some(cache), Some(key)) = (&self.selection_cache, cache_key) {
                cache.insert(key, result.clone());
            }
        }

        info!(
            strategy = %result.strategy_used,
            method = %result.stats.method,
            original = result.stats.original_count,
            filtered = result.stats.filtered_count,
            selected = result.stats.selected_count,
            tokens = result.stats.total_tokens,
            target = result.stats.target_tokens,
            "context selected"
        );
        Ok(result)
    }

    async fn run_pipeline(
        &self,
        question: &str,
        chunks: Vec<Chunk>,
        options: &SelectionOptions,
    ) -> SelectionResult {
        let original_count = chunks.len();
        let budget_cap = self.depth_budget(options);
        let lambda = options.diversity_weight.unwrap_or(self.config.diversity.lambda);
        let min_score = options
            .min_relevance_score
            .unwrap_or(self.config.prefilter.min_score);
        let max_candidates = default_max_candidates(&self.config.prefilter, original_count);

        // 1. PreFilter
        let outcome = pre_filter(
            &self.lexical,
            &self.counter,
            question,
            &chunks,
            max_candidates,
            min_score,
        );
        debug!(
            scored = outcome.stats.scored,
            below_min_score = outcome.stats.below_min_score,
            truncated = outcome.stats.truncated,
            kept = outcome.stats.kept,
            "pre-filter complete"
        );
        if outcome.candidates.is_empty() {
            return self.fallback_first_chunks(chunks, budget_cap);
        }
        let filtered_count = outcome.candidates.len();

        // 2. SemanticRank (optional)
        let (ranked, method) = self.rank_candidates(question, outcome.candidates, options).await;

        // 3. Strategize
        let plan = choose_strategy(&self.config.strategies, &ranked);
        let target = plan.max_tokens.min(budget_cap);
        debug!(
            strategy = %plan.strategy,
            total_tokens = plan.total_tokens,
            max_chunks = plan.max_chunks,
            target,
            "strategy chosen"
        );

        // 4. MMRSelect
        let pool = self.prepare_pool(ranked, &plan, target);
        let picks = select_mmr(
            &pool,
            MmrParams {
                token_budget: target,
                max_chunks: Some(plan.max_chunks),
                lambda,
                duplicate_threshold: self.config.diversity.duplicate_threshold,
            },
        );

        // 5. EmergencyCompress (optional)
        let relevance: HashMap<ChunkId, f32> =
            pool.iter().map(|c| (c.id(), c.relevance)).collect();
        let picked_tokens: usize = picks
            .iter()
            .map(|c| self.counter.count_tokens(&c.chunk.text))
            .sum();
        let mut emergency = false;
        let mut selected: Vec<Chunk> = picks.into_iter().map(|c| c.chunk).collect();
        if selected.is_empty() {
            if let Some(top) = pool.first() {
                warn!(
                    chunk = top.id().index(),
                    tokens = top.token_estimate,
                    target,
                    "no candidate fits the budget; compressing the top candidate"
                );
                selected.push(top.chunk.clone());
                emergency = true;
            }
        } else if picked_tokens > target {
            warn!(picked_tokens, target, "selection over budget after MMR");
            emergency = true;
        }
        if emergency {
            selected = compress(
                &selected,
                self.emergency_target(target),
                &self.config.compression,
                &self.counter,
            );
        }

        let budget = apply_budget(selected, self.slack_limit(target), &self.counter);
        emergency |= budget.truncated;

        let selected_relevance: Vec<f32> = budget
            .selected
            .iter()
            .map(|c| relevance.get(&c.id).copied().unwrap_or(0.0))
            .collect();
        let avg_relevance = mean(&selected_relevance);

        let mut label = format!(
            "{}_mmr_{}_{}",
            method.label_prefix(),
            options.context_depth,
            plan.strategy
        );
        if emergency {
            label.push_str("_emergency");
        }

        SelectionResult {
            stats: SelectionStats {
                original_count,
                filtered_count,
                selected_count: budget.selected.len(),
                total_tokens: budget.tokens_used,
                target_tokens: target,
                avg_relevance,
                method,
                emergency_compressed: emergency,
            },
            selected_chunks: budget.selected,
            strategy_used: label,
            strategy: Some(plan.strategy),
        }
    }

    // Semantic first when eligible, lexical as the fallback.
    async fn rank_candidates(
        &self,
        question: &str,
        candidates: Vec<ScoredChunk>,
        options: &SelectionOptions,
    ) -> (Vec<ScoredChunk>, SelectionMethod) {
        let mut scorers: Vec<&dyn Scorer> = Vec::with_capacity(2);
        if let Some(semantic) = self.semantic.as_ref() {
            if options.use_semantic_search && candidates.len() > 1 {
                scorers.push(semantic);
            }
        }
        scorers.push(&self.lexical);

        let mut degraded = false;
        for scorer in scorers {
            match scorer.rank(question, candidates.clone()).await {
                Ok(ranked) => {
                    let method = if degraded {
                        SelectionMethod::LexicalFallback
                    } else {
                        scorer.method()
                    };
                    debug!(method = %method, candidates = ranked.len(), "candidates ranked");
                    return (ranked, method);
                }
                Err(err) => {
                    warn!(
                        scorer = scorer.method().as_str(),
                        error = %err,
                        "ranking failed; falling back to the next scorer"
                    );
                    degraded = true;
                }
            }
        }

        let method = if degraded {
            SelectionMethod::LexicalFallback
        } else {
            SelectionMethod::Lexical
        };
        (candidates, method)
    }

    // For compressing tiers, shrink the best 2 × max_chunks candidates so each
    // gets roughly target / max_chunks tokens.
    fn prepare_pool(
        &self,
        ranked: Vec<ScoredChunk>,
        plan: &StrategyPlan,
        target: usize,
    ) -> Vec<ScoredChunk> {
        if !plan.strategy.compresses() || plan.max_chunks == 0 {
            return ranked;
        }

        let pool_size = plan.max_chunks.saturating_mul(2).min(ranked.len());
        let mut pool = ranked;
        pool.truncate(pool_size);

        let mut texts: Vec<Chunk> = pool.iter().map(|c| c.chunk.clone()).collect();
        if plan.strategy.summarizes() {
            texts = summarize(&texts, &self.config.compression);
        }
        let pool_target = target.saturating_mul(pool_size) / plan.max_chunks;
        let compressed = compress(&texts, pool_target, &self.config.compression, &self.counter);

        pool.into_iter()
            .zip(compressed)
            .map(|(scored, chunk)| ScoredChunk::new(chunk, scored.relevance, &self.counter))
            .collect()
    }

    fn fallback_first_chunks(&self, chunks: Vec<Chunk>, budget_cap: usize) -> SelectionResult {
        let original_count = chunks.len();
        let mut first: Vec<Chunk> = chunks
            .into_iter()
            .take(self.config.fallback_chunks.max(1))
            .collect();
        let first_tokens: usize = first
            .iter()
            .map(|c| self.counter.count_tokens(&c.text))
            .sum();

        let mut emergency = false;
        if first_tokens > budget_cap {
            first = compress(
                &first,
                self.emergency_target(budget_cap),
                &self.config.compression,
                &self.counter,
            );
            emergency = true;
        }
        let budget = apply_budget(first, self.slack_limit(budget_cap), &self.counter);
        emergency |= budget.truncated;

        debug!(
            selected = budget.selected.len(),
            tokens = budget.tokens_used,
            "no candidates passed the pre-filter; using leading chunks"
        );

        SelectionResult {
            stats: SelectionStats {
                original_count,
                filtered_count: 0,
                selected_count: budget.selected.len(),
                total_tokens: budget.tokens_used,
                target_tokens: budget_cap,
                avg_relevance: 0.0,
                method: SelectionMethod::FallbackFirstChunks,
                emergency_compressed: emergency,
            },
            selected_chunks: budget.selected,
            strategy_used: SelectionResult::FALLBACK_LABEL.to_string(),
            strategy: None,
        }
    }

    fn depth_budget(&self, options: &SelectionOptions) -> usize {
        let fraction = self.config.depth_fraction(options.context_depth) as f64;
        ((options.max_tokens as f64 * fraction).floor() as usize).max(1)
    }

    fn emergency_target(&self, target: usize) -> usize {
        (target as f64 * self.config.compression.emergency_ratio as f64).floor() as usize
    }

    fn slack_limit(&self, target: usize) -> usize {
        (target as f64 * (1.0 + self.config.compression.budget_slack as f64)).floor() as usize
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}
