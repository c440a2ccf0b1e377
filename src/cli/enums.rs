//! CLI enum types.

use clap::ValueEnum;

use crate::assets::KindFilter;

/// File kind filter for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Kind {
    Image,
    Audio,
    #[default]
    All,
}

impl From<Kind> for KindFilter {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Image => KindFilter::Image,
            Kind::Audio => KindFilter::Audio,
            Kind::All => KindFilter::All,
        }
    }
}
