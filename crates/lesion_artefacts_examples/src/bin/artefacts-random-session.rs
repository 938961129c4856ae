use lesion_artefacts::prelude::*;
use lesion_artefacts_examples::{demo_catalog, init_tracing, save_png, synthetic_scene};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Stack a few randomly chosen artefacts on one image, the way a training
/// pipeline would, then repeat with a ruler-only filter.
fn main() -> anyhow::Result<()> {
    init_tracing();
    let (image, mask) = synthetic_scene(512, 384);
    let mut repository = ArtefactRepository::new(demo_catalog()?, Some(7))?;
    let mut rng = StdRng::seed_from_u64(7);

    let mut out = image.clone();
    let layers = rng.random_range(2..=4);
    for _ in 0..layers {
        let artefact = repository.random_instance(&[])?;
        info!("Applying {:?}.", artefact.kind());
        out = artefact.apply(&out, Some(&mask))?;
    }
    save_png(&out, "artefacts-session.png")?;

    let rulers = [ArtefactClass::from(ArtefactFamily::Ruler)];
    let mut out = image;
    for _ in 0..3 {
        // no mask: vertical rulers fall back to a synthetic central lesion
        out = repository.random_instance(&rulers)?.apply(&out, None)?;
    }
    save_png(&out, "artefacts-rulers.png")?;
    Ok(())
}
