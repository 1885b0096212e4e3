use anyhow::{bail, Context, Result};
use aquaface_core::evaluation::{LabeledOutcome, MethodComparison};
use aquaface_core::{
    assess_pair, decode_side, EmbeddingOutcome, FaceEmbedding, ImageSide, QualityScore,
    QualityScorer, QualityTier, VerificationReport, VerifySettings,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One side of a pair as stored on disk.
pub struct PairInput<'a> {
    pub image: &'a Path,
    pub embedding: &'a Path,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    threshold: f32,
    quality_weighting: bool,
    #[serde(flatten)]
    report: &'a VerificationReport,
    quality_tier: QualityTier,
    recommendation: &'static str,
}

pub fn verify(
    scorer: &QualityScorer,
    a: PairInput<'_>,
    b: PairInput<'_>,
    settings: VerifySettings,
    json: bool,
) -> Result<()> {
    let report = verify_pair(scorer, &a, &b, settings)?;
    let tier = QualityTier::for_pair(&report.quality_a, &report.quality_b);

    tracing::info!(
        verdict = report.result.verdict,
        baseline = report.result.baseline_similarity,
        adjusted = report.result.adjusted_similarity,
        "pair verified"
    );

    if json {
        let output = VerifyOutput {
            threshold: settings.threshold,
            quality_weighting: settings.use_quality_weighting,
            report: &report,
            quality_tier: tier,
            recommendation: tier.recommendation(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let r = &report.result;
    let verdict = if r.verdict { "SAME PERSON" } else { "DIFFERENT PERSON" };
    println!("Result:     {verdict}");
    println!("Confidence: {:.2}% (relative to threshold, not a probability)", r.confidence);
    println!("Baseline similarity: {:.4}", r.baseline_similarity);
    println!(
        "Adjusted similarity: {:.4} (quality weighting {})",
        r.adjusted_similarity,
        if settings.use_quality_weighting { "on" } else { "off" }
    );
    println!("Threshold:           {:.4}", settings.threshold);
    print_quality("Image A", &report.quality_a);
    print_quality("Image B", &report.quality_b);
    println!("{}", tier.recommendation());
    Ok(())
}

pub fn quality(scorer: &QualityScorer, image: &Path, json: bool) -> Result<()> {
    let bytes = read(image)?;
    let score = scorer
        .score(&bytes)
        .with_context(|| format!("scoring {}", image.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        print_quality(&image.display().to_string(), &score);
        println!(
            "{}",
            QualityTier::from_overall(score.overall).recommendation()
        );
    }
    Ok(())
}

pub fn evaluate(
    scorer: &QualityScorer,
    manifest: &Path,
    threshold: f32,
    json: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let base = manifest.parent().unwrap_or_else(|| Path::new("."));
    let entries = parse_manifest(&text, base)?;

    let settings = VerifySettings {
        threshold,
        use_quality_weighting: true,
    };

    let mut outcomes = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for (i, entry) in entries.iter().enumerate() {
        let a = PairInput {
            image: &entry.image_a,
            embedding: &entry.embedding_a,
        };
        let b = PairInput {
            image: &entry.image_b,
            embedding: &entry.embedding_b,
        };
        match verify_pair(scorer, &a, &b, settings) {
            Ok(report) => outcomes.push(LabeledOutcome::new(&report.result, entry.same)),
            Err(e) if is_missing_face(&e) => {
                tracing::warn!(pair = i, error = %e, "skipping pair without a face");
                skipped += 1;
            }
            Err(e) => return Err(e.context(format!("pair {i}"))),
        }
    }

    let comparison = MethodComparison::compute(&outcomes, threshold)?;
    tracing::info!(
        pairs = comparison.pairs,
        skipped,
        baseline_auc = comparison.baseline.auc,
        adjusted_auc = comparison.adjusted.auc,
        "evaluation finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        println!("Pairs evaluated: {} ({skipped} skipped, no face)", comparison.pairs);
        println!("Threshold:       {:.4}", comparison.threshold);
        println!(
            "Baseline:        AUC {:.4}, accuracy {:.2}%",
            comparison.baseline.auc,
            comparison.baseline_accuracy * 100.0
        );
        println!(
            "Quality-weighted: AUC {:.4}, accuracy {:.2}%",
            comparison.adjusted.auc,
            comparison.adjusted_accuracy * 100.0
        );
    }
    Ok(())
}

fn verify_pair(
    scorer: &QualityScorer,
    a: &PairInput<'_>,
    b: &PairInput<'_>,
    settings: VerifySettings,
) -> Result<VerificationReport> {
    let image_a = decode_side(&read(a.image)?, ImageSide::A)?;
    let image_b = decode_side(&read(b.image)?, ImageSide::B)?;
    let outcome_a = load_embedding(a.embedding)?;
    let outcome_b = load_embedding(b.embedding)?;
    Ok(assess_pair(
        scorer, &image_a, outcome_a, &image_b, outcome_b, settings,
    )?)
}

fn is_missing_face(err: &anyhow::Error) -> bool {
    err.downcast_ref::<aquaface_core::PipelineError>()
        .is_some_and(|e| e.is_missing_face())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn load_embedding(path: &Path) -> Result<EmbeddingOutcome> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading embedding {}", path.display()))?;
    parse_embedding(&text).with_context(|| format!("parsing embedding {}", path.display()))
}

/// An embedding file holds a `FaceEmbedding` object, or `null` when the
/// model found no face.
pub fn parse_embedding(text: &str) -> Result<EmbeddingOutcome> {
    let parsed: Option<FaceEmbedding> = serde_json::from_str(text)?;
    Ok(parsed.into())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    pub embedding_a: PathBuf,
    pub embedding_b: PathBuf,
    /// Ground truth: both images show the same person.
    pub same: bool,
}

/// Parse an evaluation manifest, resolving relative paths against `base`.
pub fn parse_manifest(text: &str, base: &Path) -> Result<Vec<ManifestEntry>> {
    let mut entries: Vec<ManifestEntry> =
        serde_json::from_str(text).context("parsing evaluation manifest")?;
    if entries.is_empty() {
        bail!("evaluation manifest lists no pairs");
    }
    for entry in &mut entries {
        for path in [
            &mut entry.image_a,
            &mut entry.image_b,
            &mut entry.embedding_a,
            &mut entry.embedding_b,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
    Ok(entries)
}

fn print_quality(label: &str, q: &QualityScore) {
    println!(
        "{label}: overall {:.2} | sharpness {:.3} | brightness {:.3} | exposure {:.3} | contrast {:.3}",
        q.overall, q.sharpness, q.brightness, q.exposure, q.contrast
    );
}
