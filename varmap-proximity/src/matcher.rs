use std::ops::Range;

use num_traits::{PrimInt, Unsigned};

use varmap_core::models::Protein;

use crate::impact::PtmImpact;
use crate::window::Window;

///
/// Bisection over the sorted site positions of one protein.
///
/// Sites whose windows cover a position always form a contiguous run of the
/// sorted list (`pos - right <= site <= pos + left` is an interval of site
/// positions), so one bisection hit plus an outward walk finds all of them
/// in `O(log n + k)`.
///
/// The matcher borrows the positions and never re-sorts them; unsorted input
/// gives unspecified answers.
///
/// # Examples
///
/// ```
/// use varmap_proximity::{ProximityMatcher, Window};
///
/// let sites: Vec<u32> = vec![20, 24, 28];
/// let matcher = ProximityMatcher::new(&sites);
///
/// assert_eq!(matcher.count_within(24, Window::symmetric(7)), 3);
/// assert_eq!(matcher.count_within(1000, Window::symmetric(7)), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ProximityMatcher<'a, I>
where
    I: PrimInt + Unsigned + Send + Sync,
{
    sites: &'a [I],
}

impl<'a> ProximityMatcher<'a, u32> {
    pub fn for_protein(protein: &'a Protein) -> Self {
        ProximityMatcher::new(&protein.sites)
    }
}

impl<'a, I> ProximityMatcher<'a, I>
where
    I: PrimInt + Unsigned + Send + Sync,
{
    pub fn new(sites: &'a [I]) -> Self {
        debug_assert!(
            sites.windows(2).all(|w| w[0] < w[1]),
            "site positions must be sorted strictly ascending"
        );
        ProximityMatcher { sites }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Index of any one site whose window covers `pos`.
    fn find_pivot(&self, pos: I, window: Window<I>) -> Option<usize> {
        let mut a = 0;
        let mut b = self.sites.len();

        while a < b {
            let pivot = a + (b - a) / 2;
            let site = self.sites[pivot];

            if window.covers(site, pos) {
                return Some(pivot);
            }
            if pos > site {
                a = pivot + 1;
            } else {
                b = pivot;
            }
        }
        None
    }

    ///
    /// Find the run of sites whose windows cover `pos`.
    ///
    /// # Returns
    /// The index range of the run in the site list, `None` if no window covers `pos`.
    pub fn locate(&self, pos: I, window: Window<I>) -> Option<Range<usize>> {
        let pivot = self.find_pivot(pos, window)?;

        let mut start = pivot;
        while start > 0 && window.covers(self.sites[start - 1], pos) {
            start -= 1;
        }

        let mut end = pivot + 1;
        while end < self.sites.len() && window.covers(self.sites[end], pos) {
            end += 1;
        }

        Some(start..end)
    }

    pub fn any_within(&self, pos: I, window: Window<I>) -> bool {
        self.find_pivot(pos, window).is_some()
    }

    pub fn count_within(&self, pos: I, window: Window<I>) -> usize {
        self.locate(pos, window).map_or(0, |run| run.len())
    }

    /// Positions of the sites whose windows cover `pos`.
    pub fn sites_within(&self, pos: I, window: Window<I>) -> &'a [I] {
        match self.locate(pos, window) {
            Some(run) => &self.sites[run],
            None => &[],
        }
    }

    ///
    /// Sites in `[left, right]`, inclusive.
    ///
    pub fn sites_in_range(&self, left: I, right: I) -> &'a [I] {
        if left > right {
            return &[];
        }
        let start = self.sites.partition_point(|site| *site < left);
        let end = self.sites.partition_point(|site| *site <= right);
        &self.sites[start..end]
    }

    ///
    /// Classify a change at `pos` by the first category of
    /// [PtmImpact::PRECEDENCE] that applies.
    ///
    /// # Arguments
    /// - pos: 1-based amino-acid position of the change
    /// - network_rewiring: whether the change is annotated as rewiring the
    ///   kinase network (the annotation lives outside of this crate)
    pub fn classify(&self, pos: I, network_rewiring: bool) -> PtmImpact {
        PtmImpact::PRECEDENCE
            .into_iter()
            .find(|impact| match impact {
                PtmImpact::NetworkRewiring => network_rewiring,
                PtmImpact::None => true,
                positional => positional
                    .window()
                    .is_some_and(|window| self.any_within(pos, window)),
            })
            .unwrap_or(PtmImpact::None)
    }
}
