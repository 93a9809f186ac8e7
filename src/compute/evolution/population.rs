//! Fixed-size breeding pool of genomes.

use rayon::prelude::*;

use crate::compute::Canvas;
use crate::schema::{EvolutionConfig, GeneSpace, Genome, MutationConfig, RenderStyle};

use super::comparator::Comparator;
use super::genome::GenomeRng;

/// Arena of genome slots. Slots are overwritten in place and never resized.
///
/// After every [`Population::step`], `members[..elite]` holds the best
/// genomes of the generation in ascending score order.
pub struct Population {
    members: Vec<Genome>,
    elite: usize,
    space: GeneSpace,
    rates: MutationConfig,
    style: RenderStyle,
}

impl Population {
    /// Fill the arena with random genomes sized for `canvas_size`.
    pub fn new(config: &EvolutionConfig, canvas_size: (u32, u32), rng: &mut GenomeRng) -> Self {
        let space = GeneSpace::new(config, canvas_size);
        let members = (0..config.population.size)
            .map(|_| rng.random_genome(&space, config.genes))
            .collect();

        Self::from_members(
            members,
            config.population.elite,
            space,
            config.mutation.clone(),
            config.render_style(),
        )
    }

    /// Build from explicit members.
    pub fn from_members(
        members: Vec<Genome>,
        elite: usize,
        space: GeneSpace,
        rates: MutationConfig,
        style: RenderStyle,
    ) -> Self {
        assert!(
            elite > 0 && elite < members.len(),
            "elite count {elite} must be in 1..{}",
            members.len()
        );
        Self {
            members,
            elite,
            space,
            rates,
            style,
        }
    }

    #[inline]
    pub fn members(&self) -> &[Genome] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current parents, best first.
    #[inline]
    pub fn elite(&self) -> &[Genome] {
        &self.members[..self.elite]
    }

    #[inline]
    pub fn space(&self) -> &GeneSpace {
        &self.space
    }

    #[inline]
    pub fn style(&self) -> RenderStyle {
        self.style
    }

    /// Lowest-score genome after a step.
    #[inline]
    pub fn best(&self) -> &Genome {
        &self.members[0]
    }

    /// Score every stale member (or every member after a target change).
    ///
    /// Members are independent; each rayon worker paints into its own
    /// scratch canvas. Returns the number of genomes re-scored.
    pub fn evaluate_all(&mut self, comparator: &Comparator) -> usize {
        let (width, height) = comparator.size();
        let style = self.style;

        self.members
            .par_iter_mut()
            .map_init(
                || Canvas::new(width, height),
                |scratch, genome| genome.evaluate(comparator, scratch, style) as usize,
            )
            .sum()
    }

    /// Sort ascending by score and retire adjacent equal-score duplicates.
    ///
    /// Only the first genome of each run of equal scores survives; the others
    /// are marked dead and sink to the tail. Capacity is unchanged. Returns
    /// the number of retired slots.
    pub fn rank_and_prune(&mut self) -> usize {
        self.members.sort_by(|a, b| a.cmp_score(b));

        let mut pruned = 0;
        let mut kept = 0;
        for i in 1..self.members.len() {
            if self.members[i].same_score(&self.members[kept]) {
                self.members[i].mark_dead();
                pruned += 1;
            } else {
                kept = i;
            }
        }

        if pruned > 0 {
            self.members.sort_by(|a, b| a.cmp_score(b));
        }
        pruned
    }

    /// Refill every non-elite slot with a mutated crossover of two parents
    /// drawn uniformly from the elite (a parent may pair with itself).
    ///
    /// Parent indices and child seeds come from `rng` in slot order, so the
    /// outcome does not depend on how rayon schedules the children.
    pub fn reproduce(&mut self, rng: &mut GenomeRng) {
        let elite = self.elite;
        let plan: Vec<(usize, usize, u64)> = (elite..self.members.len())
            .map(|_| (rng.index(elite), rng.index(elite), rng.next_seed()))
            .collect();

        let space = &self.space;
        let rates = &self.rates;
        let (parents, children) = self.members.split_at_mut(elite);
        let parents = &*parents;

        children
            .par_iter_mut()
            .zip(plan.par_iter())
            .for_each(|(child, &(a, b, seed))| {
                let mut child_rng = GenomeRng::new(seed);
                child_rng.crossover_into(child, &parents[a], &parents[b]);
                child_rng.mutate_genome(child, space, rates);
            });
    }

    /// One generation: evaluate, rank and prune, reproduce. Returns the
    /// number of genomes evaluated.
    pub fn step(&mut self, comparator: &mut Comparator, rng: &mut GenomeRng) -> usize {
        let evaluated = self.evaluate_all(comparator);
        comparator.finish_pass();
        self.rank_and_prune();
        self.reproduce(rng);
        evaluated
    }
}
