//! Artefact repository: one [`Artefact`] per catalog entry and random selection
//! among them.
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::artefact::{Artefact, ArtefactClass, ArtefactFamily};
use crate::error::{Error, Result};
use crate::patch::ArtefactPatch;
use crate::sampling::choose_index;

/// Tagged group of patches as supplied by a catalog collaborator.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub category: String,
    pub subcategory: Option<String>,
    pub patches: Vec<ArtefactPatch>,
}

impl CatalogEntry {
    pub fn new(
        category: impl Into<String>,
        subcategory: Option<&str>,
        patches: Vec<ArtefactPatch>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.map(str::to_owned),
            patches,
        }
    }
}

/// Owns the artefact instances built from a catalog.
pub struct ArtefactRepository {
    artefacts: Vec<Artefact>,
    rng: StdRng,
}

impl ArtefactRepository {
    /// Build one instance per entry.
    ///
    /// With a seed, entry `i` is seeded with `seed + i` and the selection
    /// generator with `seed`, so whole sessions replay exactly.
    pub fn new(entries: Vec<CatalogEntry>, seed: Option<u64>) -> Result<Self> {
        let artefacts = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let entry_seed = seed.map(|s| s.wrapping_add(i as u64));
                Artefact::from_tags(
                    &entry.category,
                    entry.subcategory.as_deref(),
                    entry.patches,
                    entry_seed,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_artefacts(artefacts, seed))
    }

    /// Wrap instances that were configured by the caller.
    pub fn from_artefacts(artefacts: Vec<Artefact>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        debug!("Artefact repository with {} instances.", artefacts.len());
        Self { artefacts, rng }
    }

    pub fn len(&self) -> usize {
        self.artefacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artefacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artefact> {
        self.artefacts.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Artefact> {
        self.artefacts.get_mut(index)
    }

    /// Pick an instance uniformly among those matching any of `classes`.
    ///
    /// With no classes a family is drawn uniformly first, so that families
    /// with many catalog entries are not favoured.
    pub fn random_instance(&mut self, classes: &[ArtefactClass]) -> Result<&mut Artefact> {
        let classes: Vec<ArtefactClass> = if classes.is_empty() {
            let families = ArtefactFamily::ALL;
            let pick = choose_index(&mut self.rng, families.len()).ok_or(Error::NoMatchingArtefact)?;
            vec![ArtefactClass::Family(families[pick])]
        } else {
            classes.to_vec()
        };

        let candidates: Vec<usize> = self
            .artefacts
            .iter()
            .enumerate()
            .filter(|(_, a)| classes.iter().any(|c| c.matches(a.kind())))
            .map(|(i, _)| i)
            .collect();

        let pick = choose_index(&mut self.rng, candidates.len()).ok_or(Error::NoMatchingArtefact)?;
        debug!(
            "Selected {:?} out of {} candidates.",
            self.artefacts[candidates[pick]].kind(),
            candidates.len()
        );
        Ok(&mut self.artefacts[candidates[pick]])
    }
}
