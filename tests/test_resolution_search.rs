use demres::core::median_uncertainty;
use demres::synthetic::{gaussian_hill_dem, Bounds};
use demres::{
    DemError, DemResult, GriddedSurface, Quantity, ResolutionSearch, ScalarMinimizer, Spacing, SurfaceSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Cell-centred Gaussian hill with a uniform vertical error
struct HillSource {
    sigma: f64,
    requests: AtomicUsize,
}

impl HillSource {
    fn new(sigma: f64) -> Self {
        Self {
            sigma,
            requests: AtomicUsize::new(0),
        }
    }
}

impl SurfaceSource for HillSource {
    fn surface_at(&self, spacing: Spacing) -> DemResult<GriddedSurface> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        gaussian_hill_dem(spacing.get(), Bounds::default())?.into_surface(self.sigma)
    }
}

/// Golden-section search, enough to drive the objective in tests
struct GoldenSection {
    iterations: usize,
}

impl ScalarMinimizer for GoldenSection {
    fn minimize(&self, objective: &mut dyn FnMut(f64) -> f64, bounds: (f64, f64)) -> DemResult<f64> {
        let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
        let (mut a, mut b) = bounds;
        let mut c = b - ratio * (b - a);
        let mut d = a + ratio * (b - a);
        let (mut fc, mut fd) = (objective(c), objective(d));

        for _ in 0..self.iterations {
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - ratio * (b - a);
                fc = objective(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + ratio * (b - a);
                fd = objective(d);
            }
        }
        Ok(0.5 * (a + b))
    }
}

#[test]
fn test_best_by_quality_over_candidate_grids() {
    init_logging();

    let source = HillSource::new(0.01);
    let widths = [0.5, 0.25, 0.2, 0.1];
    let candidates: Vec<GriddedSurface> = widths
        .iter()
        .map(|&w| source.surface_at(Spacing::new(w).expect("spacing")).expect("Failed to grid hill"))
        .collect();

    let outcome = ResolutionSearch::default()
        .best_by_quality(&candidates)
        .expect("Failed to rank candidates");

    assert_eq!(outcome.scores.len(), widths.len());
    for (score, &w) in outcome.scores.iter().zip(widths.iter()) {
        assert_eq!(score.spacing, w);
        assert!(score.mean_quality_slope > 0.0 && score.mean_quality_slope <= 1.0);
        assert!(score.mean_quality_aspect > 0.0 && score.mean_quality_aspect <= 1.0);
    }

    let best_slope = outcome.best_slope.expect("slope optimum").get();
    let best_aspect = outcome.best_aspect.expect("aspect optimum").get();
    assert!(widths.contains(&best_slope));
    assert!(widths.contains(&best_aspect));

    let top = outcome
        .scores
        .iter()
        .map(|s| s.mean_quality_slope)
        .fold(f64::NEG_INFINITY, f64::max);
    let chosen = outcome
        .scores
        .iter()
        .find(|s| s.spacing == best_slope)
        .expect("chosen candidate");
    assert_eq!(chosen.mean_quality_slope, top);
}

#[test]
fn test_optimal_spacing_with_external_minimizer() {
    init_logging();

    let source = HillSource::new(0.01);
    let search = ResolutionSearch::default();
    let minimizer = GoldenSection { iterations: 12 };
    let bounds = (0.05, 0.5);

    let slope = search
        .optimal_spacing(&source, &minimizer, bounds, Quantity::Slope)
        .expect("slope spacing");
    let aspect = search
        .optimal_spacing(&source, &minimizer, bounds, Quantity::Aspect)
        .expect("aspect spacing");

    println!("optimal spacing: slope {}, aspect {}", slope, aspect);
    for s in [slope, aspect] {
        assert!(s.get() >= bounds.0 && s.get() <= bounds.1);
    }
    assert_eq!(source.requests.load(Ordering::Relaxed), 2 * (12 + 2));

    let combined = ResolutionSearch::combined_spacing(slope, aspect);
    assert_eq!(combined.get(), slope.get().max(aspect.get()));

    let at_optimum = median_uncertainty(&source.surface_at(slope).expect("grid"), Quantity::Slope)
        .expect("median");
    assert!(at_optimum.is_finite() && at_optimum > 0.0);
}

#[test]
fn test_failing_source_is_avoided() {
    init_logging();

    // Refuses anything finer than 0.2
    struct Coarse(HillSource);
    impl SurfaceSource for Coarse {
        fn surface_at(&self, spacing: Spacing) -> DemResult<GriddedSurface> {
            if spacing.get() < 0.2 {
                return Err(DemError::InvalidInput("too fine".to_string()));
            }
            self.0.surface_at(spacing)
        }
    }

    let best = ResolutionSearch::default()
        .optimal_spacing(
            &Coarse(HillSource::new(0.01)),
            &GoldenSection { iterations: 10 },
            (0.05, 0.5),
            Quantity::Slope,
        )
        .expect("spacing");
    assert!(best.get() >= 0.19, "search wandered into rejected spacings: {}", best);
}

#[test]
fn test_empty_candidates() {
    let result = ResolutionSearch::default().best_by_quality(&[]);
    assert!(matches!(result, Err(DemError::InvalidInput(_))));
}
