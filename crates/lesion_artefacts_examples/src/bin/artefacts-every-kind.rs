use lesion_artefacts::prelude::*;
use lesion_artefacts_examples::{init_tracing, save_png, synthetic_patches, synthetic_scene};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (image, mask) = synthetic_scene(480, 360);
    save_png(&image, "artefacts-input.png")?;

    for kind in ArtefactKind::ALL {
        let mut artefact = Artefact::new(kind, synthetic_patches(kind)?, Some(42))?;
        let (out, report) = artefact.apply_with_report(&image, Some(&mask))?;
        info!(
            "{:?}: {} placed, {} skipped, {} forced.",
            kind,
            report.placed(),
            report.count(PlacementOutcome::Skipped),
            report.count(PlacementOutcome::Forced),
        );
        save_png(&out, format!("artefacts-{kind:?}.png").to_lowercase())?;
    }
    Ok(())
}
