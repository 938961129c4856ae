//! The closed set of artefact types and their per-type policies.
use crate::augment::{AugmentPolicy, TransformPolicy};
use crate::error::{Error, Result};

/// Concrete artefact type. Selected from catalog tags via [`ArtefactKind::from_tags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtefactKind {
    Bubble,
    MarkingCircle,
    MarkingSpot,
    RulerHorizontal,
    RulerVertical,
}

/// Top-level grouping used when callers ask for "any marking" or "any ruler".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtefactFamily {
    Bubble,
    Marking,
    Ruler,
}

impl ArtefactFamily {
    pub const ALL: [ArtefactFamily; 3] = [
        ArtefactFamily::Bubble,
        ArtefactFamily::Marking,
        ArtefactFamily::Ruler,
    ];
}

/// Selection filter: a whole family or one concrete kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtefactClass {
    Family(ArtefactFamily),
    Kind(ArtefactKind),
}

impl ArtefactClass {
    pub fn matches(&self, kind: ArtefactKind) -> bool {
        match self {
            ArtefactClass::Family(family) => kind.family() == *family,
            ArtefactClass::Kind(k) => *k == kind,
        }
    }
}

impl From<ArtefactFamily> for ArtefactClass {
    fn from(value: ArtefactFamily) -> Self {
        ArtefactClass::Family(value)
    }
}

impl From<ArtefactKind> for ArtefactClass {
    fn from(value: ArtefactKind) -> Self {
        ArtefactClass::Kind(value)
    }
}

/// Where candidate positions come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DensitySource {
    /// No sampling: one patch at the lesion centroid, or the canvas center.
    Centered,
    /// Beta density, attenuated around the lesion when a mask is given.
    LesionAttenuated,
    /// Beta density restricted to the lower-middle band, attenuated around the lesion.
    LowerMiddleBand,
    /// Beta density attenuated around the lesion, or around a synthetic
    /// central ellipse when no lesion is marked.
    Peripheral,
}

/// When a sampled position is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollisionRule {
    /// Every sample is accepted.
    None,
    /// Reject footprints overlapping earlier placements of the same call.
    SelfOverlap,
    /// Reject patches whose nonzero pixels touch the (possibly synthetic) lesion.
    LesionIntersection,
}

/// What happens when every attempt was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exhaustion {
    /// Drop the patch.
    Skip,
    /// Place it at the last sampled position anyway.
    Force,
}

/// Placement behaviour of one artefact type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementPolicy {
    pub density: DensitySource,
    pub collision: CollisionRule,
    /// Maximum candidate positions per patch; at least 1.
    pub max_attempts: usize,
    pub exhaustion: Exhaustion,
}

impl PlacementPolicy {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be >= 1".into()));
        }
        Ok(())
    }
}

impl ArtefactKind {
    pub const ALL: [ArtefactKind; 5] = [
        ArtefactKind::Bubble,
        ArtefactKind::MarkingCircle,
        ArtefactKind::MarkingSpot,
        ArtefactKind::RulerHorizontal,
        ArtefactKind::RulerVertical,
    ];

    /// Resolve catalog `(category, subcategory)` tags. Bubbles ignore the subcategory.
    pub fn from_tags(category: &str, subcategory: Option<&str>) -> Result<Self> {
        match (category, subcategory) {
            ("bubble", _) => Ok(ArtefactKind::Bubble),
            ("marking", Some("circle")) => Ok(ArtefactKind::MarkingCircle),
            ("marking", Some("spot")) => Ok(ArtefactKind::MarkingSpot),
            ("ruler", Some("horizontal")) => Ok(ArtefactKind::RulerHorizontal),
            ("ruler", Some("vertical")) => Ok(ArtefactKind::RulerVertical),
            _ => Err(Error::UnknownArtefactType {
                category: category.to_owned(),
                subcategory: subcategory.map(str::to_owned),
            }),
        }
    }

    /// `(category, subcategory)` tags this kind is built from.
    pub fn tags(self) -> (&'static str, Option<&'static str>) {
        match self {
            ArtefactKind::Bubble => ("bubble", None),
            ArtefactKind::MarkingCircle => ("marking", Some("circle")),
            ArtefactKind::MarkingSpot => ("marking", Some("spot")),
            ArtefactKind::RulerHorizontal => ("ruler", Some("horizontal")),
            ArtefactKind::RulerVertical => ("ruler", Some("vertical")),
        }
    }

    pub fn family(self) -> ArtefactFamily {
        match self {
            ArtefactKind::Bubble => ArtefactFamily::Bubble,
            ArtefactKind::MarkingCircle | ArtefactKind::MarkingSpot => ArtefactFamily::Marking,
            ArtefactKind::RulerHorizontal | ArtefactKind::RulerVertical => ArtefactFamily::Ruler,
        }
    }

    pub fn default_augment(self) -> AugmentPolicy {
        match self {
            ArtefactKind::Bubble => AugmentPolicy::new(0.8, 0.1),
            ArtefactKind::MarkingSpot => AugmentPolicy::new(0.8, 0.3),
            ArtefactKind::MarkingCircle
            | ArtefactKind::RulerHorizontal
            | ArtefactKind::RulerVertical => AugmentPolicy::disabled(),
        }
    }

    pub fn default_transform(self) -> TransformPolicy {
        let base = TransformPolicy::default();
        match self {
            ArtefactKind::Bubble | ArtefactKind::MarkingSpot => base,
            ArtefactKind::MarkingCircle => TransformPolicy {
                resize_prob: 0.8,
                resize_range: (0.8, 1.4),
                rotate_prob: 0.9,
                ..base
            },
            ArtefactKind::RulerHorizontal => TransformPolicy {
                flip_prob: 0.0,
                rotate_prob: 1.0,
                rotate_range: (-20.0, 20.0),
                ..base
            },
            ArtefactKind::RulerVertical => TransformPolicy {
                rotate_prob: 1.0,
                ..base
            },
        }
    }

    pub fn default_placement(self) -> PlacementPolicy {
        match self {
            ArtefactKind::Bubble | ArtefactKind::MarkingSpot => PlacementPolicy {
                density: DensitySource::LesionAttenuated,
                collision: CollisionRule::SelfOverlap,
                max_attempts: 10,
                exhaustion: Exhaustion::Skip,
            },
            ArtefactKind::MarkingCircle => PlacementPolicy {
                density: DensitySource::Centered,
                collision: CollisionRule::None,
                max_attempts: 1,
                exhaustion: Exhaustion::Force,
            },
            ArtefactKind::RulerHorizontal => PlacementPolicy {
                density: DensitySource::LowerMiddleBand,
                collision: CollisionRule::None,
                max_attempts: 1,
                exhaustion: Exhaustion::Force,
            },
            ArtefactKind::RulerVertical => PlacementPolicy {
                density: DensitySource::Peripheral,
                collision: CollisionRule::LesionIntersection,
                max_attempts: 25,
                exhaustion: Exhaustion::Force,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_resolve_to_kinds() {
        for kind in ArtefactKind::ALL {
            let (category, subcategory) = kind.tags();
            assert_eq!(ArtefactKind::from_tags(category, subcategory).unwrap(), kind);
        }
        assert_eq!(
            ArtefactKind::from_tags("bubble", Some("large")).unwrap(),
            ArtefactKind::Bubble
        );
    }

    #[test]
    fn unknown_tags_are_rejected() {
        for (category, subcategory) in [
            ("marking", None),
            ("marking", Some("horizontal")),
            ("ruler", Some("circle")),
            ("hair", None),
        ] {
            assert!(matches!(
                ArtefactKind::from_tags(category, subcategory),
                Err(Error::UnknownArtefactType { .. })
            ));
        }
    }

    #[test]
    fn classes_match_families_and_kinds() {
        let markings = ArtefactClass::from(ArtefactFamily::Marking);
        assert!(markings.matches(ArtefactKind::MarkingCircle));
        assert!(markings.matches(ArtefactKind::MarkingSpot));
        assert!(!markings.matches(ArtefactKind::Bubble));

        let vertical = ArtefactClass::from(ArtefactKind::RulerVertical);
        assert!(vertical.matches(ArtefactKind::RulerVertical));
        assert!(!vertical.matches(ArtefactKind::RulerHorizontal));
    }

    #[test]
    fn defaults_are_valid() {
        for kind in ArtefactKind::ALL {
            kind.default_augment().validate().unwrap();
            kind.default_transform().validate().unwrap();
            kind.default_placement().validate().unwrap();
        }
    }

    #[test]
    fn rulers_always_rotate_and_never_resample_the_set() {
        for kind in [ArtefactKind::RulerHorizontal, ArtefactKind::RulerVertical] {
            assert_eq!(kind.default_transform().rotate_prob, 1.0);
            assert_eq!(kind.default_augment(), AugmentPolicy::disabled());
        }
        assert_eq!(ArtefactKind::RulerHorizontal.default_transform().flip_prob, 0.0);
    }
}
