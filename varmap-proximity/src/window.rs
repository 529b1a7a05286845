use num_traits::{PrimInt, Unsigned};

///
/// Span around a site, `[site - left, site + right]`, inclusive at both ends.
///
/// A position is covered by a site's window when
/// `site - left <= pos <= site + right`. The comparisons are done without
/// subtraction so small positions never underflow.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<I>
where
    I: PrimInt + Unsigned + Send + Sync,
{
    pub left: I,
    pub right: I,
}

impl<I> Window<I>
where
    I: PrimInt + Unsigned + Send + Sync,
{
    pub fn new(left: I, right: I) -> Self {
        Window { left, right }
    }

    pub fn symmetric(flank: I) -> Self {
        Window::new(flank, flank)
    }

    /// Does the window around `site` contain `pos`?
    #[inline]
    pub fn covers(&self, site: I, pos: I) -> bool {
        let reaches_left = pos.checked_add(&self.left).is_none_or(|hi| site <= hi);
        let reaches_right = site.checked_add(&self.right).is_none_or(|hi| pos <= hi);
        reaches_left && reaches_right
    }
}
