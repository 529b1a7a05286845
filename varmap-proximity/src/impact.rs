use std::fmt::{self, Display};
use std::str::FromStr;

use num_traits::{PrimInt, Unsigned};

use crate::window::Window;

pub const DIRECT_FLANK: u8 = 0;
pub const PROXIMAL_FLANK: u8 = 3;
pub const DISTAL_FLANK: u8 = 7;

///
/// How strongly a change may affect the closest PTM site.
///
/// Categories are checked in [PtmImpact::PRECEDENCE] order and the first one
/// that applies is reported.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PtmImpact {
    /// Annotated as rewiring the kinase-substrate network.
    NetworkRewiring,
    /// On a site.
    Direct,
    /// Within 3 residues of a site.
    Proximal,
    /// Within 7 residues of a site.
    Distal,
    None,
}

impl PtmImpact {
    pub const PRECEDENCE: [PtmImpact; 5] = [
        PtmImpact::NetworkRewiring,
        PtmImpact::Direct,
        PtmImpact::Proximal,
        PtmImpact::Distal,
        PtmImpact::None,
    ];

    /// Flank on each side of a site for the position-based categories.
    pub fn flank(&self) -> Option<u8> {
        match self {
            PtmImpact::Direct => Some(DIRECT_FLANK),
            PtmImpact::Proximal => Some(PROXIMAL_FLANK),
            PtmImpact::Distal => Some(DISTAL_FLANK),
            PtmImpact::NetworkRewiring | PtmImpact::None => None,
        }
    }

    pub fn window<I>(&self) -> Option<Window<I>>
    where
        I: PrimInt + Unsigned + Send + Sync,
    {
        let flank: I = num_traits::cast(self.flank()?)?;
        Some(Window::symmetric(flank))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PtmImpact::NetworkRewiring => "network-rewiring",
            PtmImpact::Direct => "direct",
            PtmImpact::Proximal => "proximal",
            PtmImpact::Distal => "distal",
            PtmImpact::None => "none",
        }
    }

    /// Is this change PTM-related at all?
    pub fn is_ptm_related(&self) -> bool {
        *self != PtmImpact::None
    }
}

impl Display for PtmImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PtmImpact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PtmImpact::PRECEDENCE
            .into_iter()
            .find(|impact| impact.as_str() == s)
            .ok_or_else(|| format!("Unknown PTM impact: '{}'", s))
    }
}
