//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, mutation and rendering of circle
//! genomes.

use rand::prelude::*;

use crate::compute::Canvas;
use crate::schema::{Gene, GeneSpace, Genome, MutationConfig, RenderStyle};

use super::comparator::Comparator;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Uniform index in `0..n`.
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Bernoulli trial; zero probability never draws from the stream.
    #[inline]
    fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.rng.gen_bool(p)
    }

    /// Generate a random gene anywhere on the canvas.
    pub fn random_gene(&mut self, space: &GeneSpace) -> Gene {
        let mut gene = Gene {
            x: 0,
            y: 0,
            radius: 0,
            color: [0, 0, 0, 255],
        };
        self.randomize(&mut gene, space);
        gene
    }

    /// Generate a genome of `genes` random circles.
    pub fn random_genome(&mut self, space: &GeneSpace, genes: usize) -> Genome {
        Genome::new((0..genes).map(|_| self.random_gene(space)).collect())
    }

    /// Re-draw every parameter of a gene.
    pub fn randomize(&mut self, gene: &mut Gene, space: &GeneSpace) {
        gene.x = self.rng.gen_range(0..space.width as i32);
        gene.y = self.rng.gen_range(0..space.height as i32);
        gene.radius = self
            .rng
            .gen_range(space.radius_range.0..=space.radius_range.1);
        gene.color[0] = self.rng.r#gen();
        gene.color[1] = self.rng.r#gen();
        gene.color[2] = self.rng.r#gen();
        gene.color[3] = if space.allow_alpha {
            self.rng.r#gen()
        } else {
            255
        };
    }

    /// Apply every gene-level operator, each gated by its own probability.
    ///
    /// Returns true iff the gene ended up different from before the call.
    pub fn mutate_gene(
        &mut self,
        gene: &mut Gene,
        space: &GeneSpace,
        rates: &MutationConfig,
    ) -> bool {
        let before = *gene;

        if self.chance(rates.full_reroll_p) {
            self.randomize(gene, space);
        }

        if self.chance(rates.move_p) {
            match self.rng.gen_range(0..3) {
                0 => {
                    gene.x = self.rng.gen_range(0..space.width as i32);
                    gene.y = self.rng.gen_range(0..space.height as i32);
                }
                1 => self.jitter_position(gene, space, rates.medium_move),
                _ => self.jitter_position(gene, space, rates.small_move),
            }
        }

        if self.chance(rates.resize_p) {
            let delta = self
                .rng
                .gen_range(-rates.resize_delta..=rates.resize_delta);
            gene.radius = gene.radius.saturating_add(delta);
        }

        for channel in 0..space.color_channels() {
            if self.chance(rates.color_set_p) {
                gene.color[channel] = self.rng.r#gen();
            }
            if self.chance(rates.color_jitter_p) {
                let delta = self
                    .rng
                    .gen_range(-rates.color_delta..=rates.color_delta);
                gene.color[channel] = (gene.color[channel] as i32 + delta).rem_euclid(256) as u8;
            }
        }

        *gene != before
    }

    /// Shift a gene by up to `fraction` of the canvas on each axis.
    fn jitter_position(&mut self, gene: &mut Gene, space: &GeneSpace, fraction: f32) {
        let dx = ((space.width as f32 * fraction).round() as i32).max(1);
        let dy = ((space.height as f32 * fraction).round() as i32).max(1);
        gene.x = gene.x.saturating_add(self.rng.gen_range(-dx..=dx));
        gene.y = gene.y.saturating_add(self.rng.gen_range(-dy..=dy));
    }

    /// Uniform crossover: every locus independently copies the gene of
    /// `parent_a` or `parent_b` with equal probability. The child is left
    /// stale; no score is inherited.
    pub fn crossover_into(&mut self, child: &mut Genome, parent_a: &Genome, parent_b: &Genome) {
        assert_eq!(parent_a.len(), parent_b.len(), "parents differ in gene count");
        assert_eq!(child.len(), parent_a.len(), "child differs in gene count");

        let genes = child.genes_mut();
        for (i, slot) in genes.iter_mut().enumerate() {
            *slot = if self.rng.gen_bool(0.5) {
                parent_a.genes()[i]
            } else {
                parent_b.genes()[i]
            };
        }
    }

    /// Allocating form of [`GenomeRng::crossover_into`].
    pub fn crossover(&mut self, parent_a: &Genome, parent_b: &Genome) -> Genome {
        let mut child = parent_a.clone();
        self.crossover_into(&mut child, parent_a, parent_b);
        child
    }

    /// Mutate every gene, then maybe swap it with a random slot (itself
    /// included). Marks the genome stale if anything changed.
    pub fn mutate_genome(
        &mut self,
        genome: &mut Genome,
        space: &GeneSpace,
        rates: &MutationConfig,
    ) -> bool {
        let mut changed = false;
        let n = genome.len();
        let genes = genome.genes_raw_mut();

        for i in 0..n {
            changed |= self.mutate_gene(&mut genes[i], space, rates);
            if self.chance(rates.swap_p) {
                let j = self.rng.gen_range(0..n);
                genes.swap(i, j);
                changed = true;
            }
        }

        if changed {
            genome.mark_stale();
        }
        changed
    }
}

impl Gene {
    /// Paint this circle; invisible genes are skipped.
    #[inline]
    pub fn draw(&self, canvas: &mut Canvas, style: RenderStyle) {
        canvas.fill_circle(self.x, self.y, self.radius, self.color, style.compositing);
    }
}

impl Genome {
    /// Paint the background and then every gene in order.
    pub fn draw(&self, canvas: &mut Canvas, style: RenderStyle) {
        canvas.fill(style.background.rgba());
        for gene in self.genes() {
            gene.draw(canvas, style);
        }
    }

    /// Render into a fresh canvas of the given size.
    pub fn render(&self, (width, height): (u32, u32), style: RenderStyle) -> Canvas {
        let mut canvas = Canvas::new(width, height);
        self.draw(&mut canvas, style);
        canvas
    }

    /// Re-score against the comparator unless the cached score is current.
    ///
    /// `scratch` must match the target size. Returns true if a new score was
    /// computed.
    pub fn evaluate(
        &mut self,
        comparator: &Comparator,
        scratch: &mut Canvas,
        style: RenderStyle,
    ) -> bool {
        if !self.is_stale() && !comparator.just_changed() {
            return false;
        }
        self.draw(scratch, style);
        self.set_score(comparator.diff(scratch));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Background, Compositing, EvolutionConfig, MetricKind};
    use proptest::prelude::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn space() -> GeneSpace {
        GeneSpace::new(&EvolutionConfig::default(), (64, 48))
    }

    fn style() -> RenderStyle {
        RenderStyle {
            background: Background::White,
            compositing: Compositing::Blend,
        }
    }

    fn full_canvas_circle(color: [u8; 4]) -> Gene {
        Gene {
            x: 4,
            y: 4,
            radius: 100,
            color,
        }
    }

    #[test]
    fn test_random_gene_within_bounds() {
        let mut rng = GenomeRng::new(42);
        let space = space();
        for _ in 0..500 {
            let gene = rng.random_gene(&space);
            assert!((0..64).contains(&gene.x));
            assert!((0..48).contains(&gene.y));
            assert!((10..=50).contains(&gene.radius));
            assert_eq!(gene.color[3], 255);
        }
    }

    #[test]
    fn test_random_alpha_when_allowed() {
        let mut rng = GenomeRng::new(42);
        let space = GeneSpace {
            allow_alpha: true,
            ..space()
        };
        let translucent = (0..200)
            .map(|_| rng.random_gene(&space))
            .filter(|g| g.color[3] != 255)
            .count();
        assert!(translucent > 0);
    }

    #[test]
    fn test_disabled_mutation_changes_nothing() {
        let mut rng = GenomeRng::new(42);
        let space = space();
        let rates = MutationConfig::disabled();
        let mut genome = rng.random_genome(&space, 16);
        genome.set_score(5.0);
        let before = genome.genes().to_vec();

        assert!(!rng.mutate_genome(&mut genome, &space, &rates));
        assert_eq!(genome.genes(), &before[..]);
        assert!(!genome.is_stale());
    }

    #[test]
    fn test_certain_mutation_reports_change() {
        let mut rng = GenomeRng::new(42);
        let space = space();
        let rates = MutationConfig {
            move_p: 1.0,
            resize_p: 1.0,
            color_jitter_p: 1.0,
            ..MutationConfig::disabled()
        };
        let mut changes = 0;
        for _ in 0..50 {
            let mut gene = rng.random_gene(&space);
            let before = gene;
            let changed = rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!(changed, gene != before);
            if changed {
                changes += 1;
            }
        }
        assert!(changes > 40);
    }

    /// A gene far off the canvas, so whole-canvas relocations are
    /// distinguishable from local jitter.
    fn off_canvas_gene() -> Gene {
        Gene {
            x: -1000,
            y: -1000,
            radius: 20,
            color: [100, 150, 200, 255],
        }
    }

    /// Move an off-canvas gene `trials` times and return (relocations,
    /// largest jitter on x, largest jitter on y).
    fn move_outcomes(medium: f32, small: f32, trials: usize) -> (usize, i32, i32) {
        let mut rng = GenomeRng::new(17);
        let space = space();
        let rates = MutationConfig {
            move_p: 1.0,
            medium_move: medium,
            small_move: small,
            ..MutationConfig::disabled()
        };
        let start = off_canvas_gene();
        let (mut relocations, mut max_dx, mut max_dy) = (0, 0, 0);
        for _ in 0..trials {
            let mut gene = start;
            rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!(gene.radius, start.radius);
            assert_eq!(gene.color, start.color);
            if (0..64).contains(&gene.x) && (0..48).contains(&gene.y) {
                relocations += 1;
            } else {
                max_dx = max_dx.max((gene.x - start.x).abs());
                max_dy = max_dy.max((gene.y - start.y).abs());
            }
        }
        (relocations, max_dx, max_dy)
    }

    #[test]
    fn test_move_relocates_within_canvas() {
        let (relocations, _, _) = move_outcomes(0.08, 0.01, 3000);
        // One of three scales is a whole-canvas relocation.
        assert!((800..1200).contains(&relocations), "{relocations} relocations");
    }

    #[test]
    fn test_medium_move_bounded() {
        // 64x48 canvas: round(0.08 * 64) = 5, round(0.08 * 48) = 4.
        let (_, max_dx, max_dy) = move_outcomes(0.08, 0.08, 3000);
        assert_eq!(max_dx, 5);
        assert_eq!(max_dy, 4);
    }

    #[test]
    fn test_small_move_at_least_one_pixel() {
        // round(0.01 * 64) = 1 and round(0.01 * 48) = 0, raised to 1.
        let (_, max_dx, max_dy) = move_outcomes(0.01, 0.01, 3000);
        assert_eq!(max_dx, 1);
        assert_eq!(max_dy, 1);
    }

    #[test]
    fn test_full_reroll_lands_in_range() {
        let mut rng = GenomeRng::new(5);
        let space = space();
        let rates = MutationConfig {
            full_reroll_p: 1.0,
            ..MutationConfig::disabled()
        };
        for _ in 0..500 {
            let mut gene = Gene {
                radius: -40,
                color: [0, 0, 0, 255],
                ..off_canvas_gene()
            };
            assert!(rng.mutate_gene(&mut gene, &space, &rates));
            assert!((0..64).contains(&gene.x));
            assert!((0..48).contains(&gene.y));
            assert!((10..=50).contains(&gene.radius));
            assert_eq!(gene.color[3], 255);
        }
    }

    #[test]
    fn test_resize_bounded_by_delta() {
        let mut rng = GenomeRng::new(9);
        let space = space();
        let rates = MutationConfig {
            resize_p: 1.0,
            resize_delta: 3,
            ..MutationConfig::disabled()
        };
        let start = off_canvas_gene();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            let mut gene = start;
            rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!((gene.x, gene.y, gene.color), (start.x, start.y, start.color));
            seen.insert(gene.radius - start.radius);
        }
        let mut deltas: Vec<i32> = seen.into_iter().collect();
        deltas.sort();
        assert_eq!(deltas, (-3..=3).collect::<Vec<_>>());
    }

    #[test]
    fn test_color_set_alone_touches_only_color() {
        let mut rng = GenomeRng::new(21);
        let space = space();
        let rates = MutationConfig {
            color_set_p: 1.0,
            ..MutationConfig::disabled()
        };
        let start = off_canvas_gene();
        let mut differs = [0usize; 3];
        for _ in 0..300 {
            let mut gene = start;
            rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!((gene.x, gene.y, gene.radius), (start.x, start.y, start.radius));
            assert_eq!(gene.color[3], 255);
            for c in 0..3 {
                if gene.color[c] != start.color[c] {
                    differs[c] += 1;
                }
            }
        }
        // A fresh byte matches the old one about 1 time in 256.
        for count in differs {
            assert!(count > 280, "{count} of 300 channels changed");
        }
    }

    #[test]
    fn test_color_jitter_wraps_within_delta() {
        let mut rng = GenomeRng::new(23);
        let space = space();
        let rates = MutationConfig {
            color_jitter_p: 1.0,
            color_delta: 20,
            ..MutationConfig::disabled()
        };
        let start = Gene {
            color: [250, 5, 128, 255],
            ..off_canvas_gene()
        };
        let mut wrapped = false;
        for _ in 0..500 {
            let mut gene = start;
            rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!(gene.color[3], 255);
            for c in 0..3 {
                let step = (gene.color[c] as i32 - start.color[c] as i32).rem_euclid(256);
                assert!(step <= 20 || step >= 236, "channel {c} moved by {step}");
                wrapped |= c == 0 && gene.color[0] < 20;
            }
        }
        assert!(wrapped);
    }

    #[test]
    fn test_extreme_positions_do_not_overflow() {
        let mut rng = GenomeRng::new(1);
        let space = space();
        let rates = MutationConfig {
            move_p: 1.0,
            resize_p: 1.0,
            resize_delta: crate::schema::MAX_RESIZE_DELTA,
            ..MutationConfig::disabled()
        };
        for _ in 0..200 {
            let mut gene = Gene {
                x: i32::MAX,
                y: i32::MIN,
                radius: i32::MAX,
                color: RED,
            };
            rng.mutate_gene(&mut gene, &space, &rates);
        }
    }

    #[test]
    fn test_opaque_alpha_never_mutated() {
        let mut rng = GenomeRng::new(7);
        let space = space();
        let rates = MutationConfig {
            color_set_p: 1.0,
            color_jitter_p: 1.0,
            ..MutationConfig::disabled()
        };
        let mut gene = rng.random_gene(&space);
        for _ in 0..100 {
            rng.mutate_gene(&mut gene, &space, &rates);
            assert_eq!(gene.color[3], 255);
        }
    }

    #[test]
    fn test_radius_may_go_negative() {
        let mut rng = GenomeRng::new(3);
        let space = space();
        let rates = MutationConfig {
            resize_p: 1.0,
            resize_delta: 3,
            ..MutationConfig::disabled()
        };
        let mut gene = Gene {
            x: 10,
            y: 10,
            radius: 0,
            color: RED,
        };
        let mut went_negative = false;
        for _ in 0..200 {
            rng.mutate_gene(&mut gene, &space, &rates);
            went_negative |= gene.radius < 0;
        }
        assert!(went_negative);
    }

    #[test]
    fn test_swap_preserves_gene_multiset() {
        let mut rng = GenomeRng::new(11);
        let space = space();
        let rates = MutationConfig {
            swap_p: 1.0,
            ..MutationConfig::disabled()
        };
        let mut genome = rng.random_genome(&space, 12);
        let mut before: Vec<_> = genome.genes().to_vec();

        assert!(rng.mutate_genome(&mut genome, &space, &rates));
        assert!(genome.is_stale());

        let mut after: Vec<_> = genome.genes().to_vec();
        let key = |g: &Gene| (g.x, g.y, g.radius, g.color);
        before.sort_by_key(key);
        after.sort_by_key(key);
        assert_eq!(before, after);
    }

    #[test]
    fn test_crossover_locus_frequency() {
        let mut rng = GenomeRng::new(42);
        let space = space();
        let a = rng.random_genome(&space, 8);
        let b = rng.random_genome(&space, 8);

        let trials = 4000;
        let mut from_a = [0usize; 8];
        for _ in 0..trials {
            let child = rng.crossover(&a, &b);
            assert!(child.is_stale());
            for i in 0..8 {
                if child.genes()[i] == a.genes()[i] {
                    from_a[i] += 1;
                }
            }
        }
        for count in from_a {
            let freq = count as f64 / trials as f64;
            assert!((freq - 0.5).abs() < 0.05, "locus frequency {freq}");
        }
    }

    proptest! {
        #[test]
        fn prop_crossover_copies_parent_loci(seed in any::<u64>(), genes in 1usize..40) {
            let mut rng = GenomeRng::new(seed);
            let space = space();
            let a = rng.random_genome(&space, genes);
            let b = rng.random_genome(&space, genes);
            let child = rng.crossover(&a, &b);

            prop_assert_eq!(child.len(), genes);
            for i in 0..genes {
                let g = child.genes()[i];
                prop_assert!(g == a.genes()[i] || g == b.genes()[i]);
            }
        }
    }

    #[test]
    fn test_later_gene_occludes_earlier() {
        let genome = Genome::new(vec![full_canvas_circle(RED), full_canvas_circle(BLUE)]);
        let canvas = genome.render((8, 8), style());
        assert_eq!(canvas, Canvas::filled(8, 8, BLUE));

        let swapped = Genome::new(vec![full_canvas_circle(BLUE), full_canvas_circle(RED)]);
        let canvas = swapped.render((8, 8), style());
        assert_eq!(canvas, Canvas::filled(8, 8, RED));
    }

    #[test]
    fn test_invisible_genome_scores_background() {
        let target = Canvas::filled(8, 8, [10, 200, 30, 255]);
        let comparator = Comparator::new(target, MetricKind::SumSquaredError);

        let mut genome = Genome::new(vec![
            Gene {
                radius: -1,
                ..full_canvas_circle(RED)
            },
            Gene {
                radius: -5,
                ..full_canvas_circle(BLUE)
            },
        ]);
        let mut scratch = Canvas::new(8, 8);
        assert!(genome.evaluate(&comparator, &mut scratch, style()));

        let background = Canvas::filled(8, 8, Background::White.rgba());
        assert_eq!(genome.score(), comparator.diff(&background));
        assert_eq!(scratch, background);
    }

    #[test]
    fn test_fresh_score_is_cached() {
        let target = Canvas::filled(8, 8, [0, 0, 0, 255]);
        let comparator = Comparator::new(target, MetricKind::SumSquaredError);
        let mut genome = Genome::new(vec![full_canvas_circle(RED)]);
        let mut scratch = Canvas::new(8, 8);

        assert!(genome.evaluate(&comparator, &mut scratch, style()));
        assert!(!genome.is_stale());
        let score = genome.score();

        // Scratch contents are irrelevant when nothing is stale.
        scratch.fill([1, 2, 3, 4]);
        assert!(!genome.evaluate(&comparator, &mut scratch, style()));
        assert_eq!(genome.score(), score);
        assert_eq!(scratch, Canvas::filled(8, 8, [1, 2, 3, 4]));
    }

    #[test]
    fn test_stale_or_changed_target_forces_rescore() {
        let mut comparator =
            Comparator::new(Canvas::filled(8, 8, [0, 0, 0, 255]), MetricKind::SumSquaredError);
        let mut genome = Genome::new(vec![full_canvas_circle(RED)]);
        let mut scratch = Canvas::new(8, 8);
        genome.evaluate(&comparator, &mut scratch, style());
        let first = genome.score();

        genome.mark_stale();
        assert!(genome.evaluate(&comparator, &mut scratch, style()));
        assert_eq!(genome.score(), first);
        assert!(!genome.is_stale());

        comparator.set_target(Canvas::filled(8, 8, RED));
        assert!(genome.evaluate(&comparator, &mut scratch, style()));
        assert_eq!(genome.score(), 0.0);
    }
}
