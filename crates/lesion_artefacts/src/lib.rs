#![forbid(unsafe_code)]
//! lesion_artefacts: Synthetic imaging artefacts composited onto dermoscopic images.
//!
//! Modules:
//! - density: beta placement densities, lesion-mask attenuation, and the per-instance cache
//! - sampling: position sampling from discrete densities
//! - embed: clipped, saturating compositing of signed patches
//! - augment: random selection, flips, rescaling, and rotation of patches
//! - artefact: the artefact types, their placement policies, and `apply`
//! - catalog: one instance per catalog entry and random selection among them
//!
//! For a walkthrough, see the README and the demo binaries.
pub mod artefact;
pub mod augment;
pub mod catalog;
pub mod density;
pub mod embed;
pub mod error;
pub mod patch;
pub mod raster;
pub mod sampling;

/// Convenient re-exports for common types. Import with `use lesion_artefacts::prelude::*;`.
pub mod prelude {
    pub use crate::artefact::{
        Artefact, ArtefactClass, ArtefactFamily, ArtefactKind, CollisionRule, DensitySource,
        Exhaustion, Placement, PlacementOutcome, PlacementPolicy, PlacementReport,
    };
    pub use crate::augment::{random_variants, AugmentPolicy, TransformPolicy};
    pub use crate::catalog::{ArtefactRepository, CatalogEntry};
    pub use crate::density::mask::{center_of_mass, circular_mask, lesion_weights, Normalization};
    pub use crate::density::{Density, DensityCache, DensityParams, Region};
    pub use crate::embed::{embed, Overlap};
    pub use crate::error::{Error, Result};
    pub use crate::patch::ArtefactPatch;
    pub use crate::raster::{Channel, Raster};
    pub use crate::sampling::{Position, PositionSampler, WeightedPositionSampler};
}
