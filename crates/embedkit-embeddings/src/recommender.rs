//! Model recommendation from device capabilities.
//!
//! Incompatible models score 0. Compatible models earn points for matching
//! the device tier plus capped bonuses for memory and CPU headroom.

use std::sync::Arc;

use embedkit_types::{DeviceCapabilities, ModelCategory, ModelDescriptor, ResourceRequirement};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::ModelCatalog;

/// Point values used by [`ModelRecommender::score`].
///
/// These are heuristics, not measurements. Recalibrate against benchmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Model tier equals device tier
    pub exact_tier: f64,
    /// Model one tier below the device
    pub one_tier_below: f64,
    /// Model two or more tiers below the device
    pub two_tiers_below: f64,
    /// Model above the device tier (still compatible)
    pub above_tier: f64,
    /// Points per GB of memory above the minimum
    pub memory_per_gb: f64,
    /// Cap on the memory bonus
    pub memory_cap: f64,
    /// Points per core above the minimum
    pub cpu_per_core: f64,
    /// Cap on the CPU bonus
    pub cpu_cap: f64,
    /// Bonus when accelerated graphics is present but not required
    pub spare_gpu: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_tier: 50.0,
            one_tier_below: 30.0,
            two_tiers_below: 20.0,
            above_tier: 10.0,
            memory_per_gb: 5.0,
            memory_cap: 25.0,
            cpu_per_core: 2.0,
            cpu_cap: 10.0,
            spare_gpu: 5.0,
        }
    }
}

/// Ranks catalog models for a device.
#[derive(Debug, Clone)]
pub struct ModelRecommender {
    catalog: Arc<ModelCatalog>,
    weights: ScoringWeights,
}

impl ModelRecommender {
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        Self {
            catalog,
            weights: ScoringWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Whether `model_id` can run on a device with `caps`.
    ///
    /// Unknown ids are incompatible. Known ids without requirements are
    /// compatible, with a warning.
    pub fn is_compatible(&self, model_id: &str, caps: &DeviceCapabilities) -> bool {
        let Some(entry) = self.catalog.entry(model_id) else {
            debug!(model = %model_id, "Not in catalog");
            return false;
        };
        match &entry.requirements {
            Some(req) => meets_requirements(req, caps),
            None => {
                warn!(model = %model_id, "No resource requirements declared; skipping compatibility check");
                true
            }
        }
    }

    /// Suitability score. 0 when incompatible.
    pub fn score(&self, model_id: &str, caps: &DeviceCapabilities) -> f64 {
        if !self.is_compatible(model_id, caps) {
            return 0.0;
        }
        let Some(req) = self.catalog.requirements(model_id) else {
            // Compatible by default, but nothing to rank on beyond a tier match.
            return self.weights.above_tier;
        };

        let w = &self.weights;
        let device_rank = caps.tier.rank();
        let model_rank = req.tier.rank();

        let tier_points = if model_rank == device_rank {
            w.exact_tier
        } else if model_rank > device_rank {
            w.above_tier
        } else if device_rank - model_rank == 1 {
            w.one_tier_below
        } else {
            w.two_tiers_below
        };

        let memory_headroom = (caps.memory_gb - req.min_memory_gb).max(0.0);
        let memory_bonus = (memory_headroom * w.memory_per_gb).min(w.memory_cap);

        let cpu_headroom = caps.cpu_cores.saturating_sub(req.min_cpu_cores) as f64;
        let cpu_bonus = (cpu_headroom * w.cpu_per_core).min(w.cpu_cap);

        let gpu_bonus = if caps.has_accelerated_graphics() && !req.requires_gpu {
            w.spare_gpu
        } else {
            0.0
        };

        tier_points + memory_bonus + cpu_bonus + gpu_bonus
    }

    /// Compatible models of `category` (all when `None`) with their scores,
    /// best first. Equal scores keep catalog order.
    pub fn rank(
        &self,
        category: Option<ModelCategory>,
        caps: &DeviceCapabilities,
    ) -> Vec<(ModelDescriptor, f64)> {
        let mut ranked: Vec<(ModelDescriptor, f64)> = self
            .catalog
            .entries()
            .iter()
            .filter(|e| category.is_none_or(|c| e.descriptor.category == c))
            .filter(|e| self.is_compatible(&e.descriptor.id, caps))
            .map(|e| (e.descriptor.clone(), self.score(&e.descriptor.id, caps)))
            .collect();
        // sort_by is stable, so ties stay in catalog order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Best compatible model. Ties go to the earliest catalog entry.
    pub fn recommend(
        &self,
        category: Option<ModelCategory>,
        caps: &DeviceCapabilities,
    ) -> Option<ModelDescriptor> {
        let best = self.rank(category, caps).into_iter().next();
        if let Some((desc, score)) = &best {
            debug!(model = %desc.id, score, "Recommended model");
        }
        best.map(|(desc, _)| desc)
    }
}

fn meets_requirements(req: &ResourceRequirement, caps: &DeviceCapabilities) -> bool {
    if caps.memory_gb < req.min_memory_gb {
        return false;
    }
    if caps.cpu_cores < req.min_cpu_cores {
        return false;
    }
    if req.requires_gpu && !caps.has_accelerated_graphics() {
        return false;
    }
    if let Some(level) = req.min_graphics {
        if caps.graphics < level {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use embedkit_types::{GraphicsLevel, PlatformClass, SignalSource, Tier};

    fn caps(memory_gb: f64, cpu_cores: usize, graphics: GraphicsLevel, tier: Tier) -> DeviceCapabilities {
        DeviceCapabilities {
            memory_gb,
            memory_source: SignalSource::Measured,
            cpu_cores,
            cpu_source: SignalSource::Measured,
            graphics,
            platform: PlatformClass::Desktop,
            portable_runtime: true,
            tier,
        }
    }

    fn req(min_memory_gb: f64, min_cpu_cores: usize, tier: Tier) -> ResourceRequirement {
        ResourceRequirement {
            min_memory_gb,
            recommended_memory_gb: min_memory_gb * 2.0,
            min_cpu_cores,
            requires_gpu: false,
            min_graphics: None,
            estimated_size_mb: 100,
            tier,
        }
    }

    fn model(id: &str, dim: usize) -> ModelDescriptor {
        ModelDescriptor::embedding(id, id, format!("org/{id}"), dim)
    }

    #[test]
    fn test_incompatible_when_memory_short_for_every_builtin() {
        let recommender = ModelRecommender::new(ModelCatalog::builtin());
        let catalog = ModelCatalog::builtin();
        for entry in catalog.entries() {
            let req = entry.requirements.as_ref().unwrap();
            for cores in [1, 4, 8, 64] {
                for graphics in [GraphicsLevel::None, GraphicsLevel::Accelerated] {
                    for shortfall in [0.01, 0.5, req.min_memory_gb] {
                        let c = caps(req.min_memory_gb - shortfall, cores, graphics, Tier::High);
                        assert!(
                            !recommender.is_compatible(&entry.descriptor.id, &c),
                            "{} should not fit in {} GB",
                            entry.descriptor.id,
                            c.memory_gb
                        );
                        assert_eq!(recommender.score(&entry.descriptor.id, &c), 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_cpu_and_gpu_requirements() {
        let recommender = ModelRecommender::new(ModelCatalog::builtin());
        let weak_cpu = caps(64.0, 2, GraphicsLevel::Accelerated, Tier::High);
        assert!(!recommender.is_compatible("bge-base-en-v1.5", &weak_cpu));

        let no_gpu = caps(64.0, 16, GraphicsLevel::Basic, Tier::High);
        assert!(!recommender.is_compatible("mistral-7b-q4", &no_gpu));

        let gpu = caps(64.0, 16, GraphicsLevel::Accelerated, Tier::High);
        assert!(recommender.is_compatible("mistral-7b-q4", &gpu));
    }

    #[test]
    fn test_minimum_graphics_level() {
        let mut r = req(1.0, 1, Tier::Low);
        r.min_graphics = Some(GraphicsLevel::Basic);
        let catalog = Arc::new(ModelCatalog::new(vec![CatalogEntry::new(model("g", 4), r)]));
        let recommender = ModelRecommender::new(catalog);

        assert!(!recommender.is_compatible("g", &caps(8.0, 8, GraphicsLevel::None, Tier::Medium)));
        assert!(recommender.is_compatible("g", &caps(8.0, 8, GraphicsLevel::Basic, Tier::Medium)));
    }

    #[test]
    fn test_missing_requirements_are_compatible() {
        let catalog = Arc::new(ModelCatalog::new(vec![CatalogEntry::unconstrained(model(
            "free", 4,
        ))]));
        let recommender = ModelRecommender::new(catalog);
        let c = caps(0.5, 1, GraphicsLevel::None, Tier::Low);
        assert!(recommender.is_compatible("free", &c));
        assert!(recommender.score("free", &c) > 0.0);
        assert!(!recommender.is_compatible("unknown", &c));
    }

    #[test]
    fn test_score_components() {
        let catalog = Arc::new(ModelCatalog::new(vec![
            CatalogEntry::new(model("low", 4), req(1.0, 1, Tier::Low)),
            CatalogEntry::new(model("medium", 4), req(1.0, 1, Tier::Medium)),
        ]));
        let recommender = ModelRecommender::new(catalog);

        // Exact match: 50 + min(1*5, 25) + min(1*2, 10) = 57
        let c = caps(2.0, 2, GraphicsLevel::None, Tier::Medium);
        assert_eq!(recommender.score("medium", &c), 57.0);
        // One tier below: 30 + 5 + 2
        assert_eq!(recommender.score("low", &c), 37.0);

        // Caps apply, plus the spare GPU bonus
        let big = caps(100.0, 100, GraphicsLevel::Accelerated, Tier::Medium);
        assert_eq!(recommender.score("medium", &big), 50.0 + 25.0 + 10.0 + 5.0);
    }

    #[test]
    fn test_lower_tier_scores_less_than_exact() {
        let catalog = Arc::new(ModelCatalog::new(vec![
            CatalogEntry::new(model("low", 4), req(1.0, 1, Tier::Low)),
            CatalogEntry::new(model("high", 4), req(1.0, 1, Tier::High)),
        ]));
        let recommender = ModelRecommender::new(catalog);
        let c = caps(32.0, 16, GraphicsLevel::None, Tier::High);
        assert!(recommender.score("high", &c) > recommender.score("low", &c));
        assert_eq!(
            recommender.recommend(None, &c).map(|d| d.id),
            Some("high".to_string())
        );
    }

    #[test]
    fn test_ties_go_to_catalog_order() {
        let catalog = Arc::new(ModelCatalog::new(vec![
            CatalogEntry::new(model("first", 4), req(1.0, 1, Tier::Low)),
            CatalogEntry::new(model("second", 4), req(1.0, 1, Tier::Low)),
        ]));
        let recommender = ModelRecommender::new(catalog);
        let c = caps(4.0, 4, GraphicsLevel::None, Tier::Low);
        assert_eq!(
            recommender.recommend(None, &c).map(|d| d.id),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_recommend_scenario() {
        let catalog = Arc::new(ModelCatalog::new(vec![CatalogEntry::new(
            model("M", 4),
            req(1.0, 1, Tier::Low),
        )]));
        let recommender = ModelRecommender::new(catalog);
        let c = caps(8.0, 8, GraphicsLevel::None, Tier::Medium);
        assert!(recommender.is_compatible("M", &c));
        let rec = recommender.recommend(Some(ModelCategory::Embedding), &c).unwrap();
        assert_eq!(rec.id, "M");
        assert_eq!(rec.dimension, 4);
    }

    #[test]
    fn test_recommend_filters_category() {
        let recommender = ModelRecommender::new(ModelCatalog::builtin());
        let c = caps(64.0, 16, GraphicsLevel::Accelerated, Tier::High);
        let rec = recommender.recommend(Some(ModelCategory::Embedding), &c).unwrap();
        assert_eq!(rec.category, ModelCategory::Embedding);
        assert_eq!(rec.id, "bge-large-en-v1.5");

        let tiny = caps(0.5, 1, GraphicsLevel::None, Tier::Low);
        assert!(recommender.recommend(None, &tiny).is_none());
    }
}
